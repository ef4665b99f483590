use std::{
    env,
    fmt::{Display, Formatter, Result},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Local,
    Dev,
    Staging,
    Prod,
}

impl Display for Environment {
    fn fmt(&self, f: &mut Formatter) -> Result {
        let printable = match *self {
            Environment::Local => "local",
            Environment::Dev => "development",
            Environment::Staging => "staging",
            Environment::Prod => "prod",
        };
        write!(f, "{}", printable)
    }
}

impl Environment {
    pub fn from_rust_env() -> Environment {
        Environment::parse(&env::var("RUST_ENV").unwrap_or_default())
    }

    pub fn parse(value: &str) -> Environment {
        match value {
            "production" | "prod" | "PRODUCTION" | "PROD" => Environment::Prod,
            "staging" | "stg" | "STAGING" | "STG" => Environment::Staging,
            "develop" | "DEVELOP" | "dev" | "DEV" => Environment::Dev,
            _ => Environment::Local,
        }
    }

    pub fn is_local(&self) -> bool {
        self == &Environment::Local
    }

    pub fn is_dev(&self) -> bool {
        self == &Environment::Dev
    }

    pub fn is_stg(&self) -> bool {
        self == &Environment::Staging
    }

    pub fn is_prod(&self) -> bool {
        self == &Environment::Prod
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_known_environments() {
        assert_eq!(Environment::parse("prod"), Environment::Prod);
        assert_eq!(Environment::parse("PRODUCTION"), Environment::Prod);
        assert_eq!(Environment::parse("stg"), Environment::Staging);
        assert_eq!(Environment::parse("dev"), Environment::Dev);
    }

    #[test]
    fn should_fallback_to_local() {
        assert_eq!(Environment::parse(""), Environment::Local);
        assert_eq!(Environment::parse("qa"), Environment::Local);
        assert!(Environment::parse("whatever").is_local());
    }

    #[test]
    fn should_display_environment() {
        assert_eq!(Environment::Dev.to_string(), "development");
        assert_eq!(Environment::Prod.to_string(), "prod");
    }
}
