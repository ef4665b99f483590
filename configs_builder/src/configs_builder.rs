use crate::{
    env_keys::{
        APP_NAME_ENV_KEY, DEV_ENV_FILE_NAME, ENABLE_EXTERNAL_CRATES_LOGGING_ENV_KEY,
        LOCAL_ENV_FILE_NAME, LOG_LEVEL_ENV_KEY, PROD_FILE_NAME,
        RABBITMQ_SIM_STRICT_REDECLARATION_ENV_KEY, RABBITMQ_SIM_UNIQUE_ANONYMOUS_QUEUES_ENV_KEY,
        STAGING_FILE_NAME,
    },
    errors::ConfigsError,
};
use configs::{AppConfigs, Configs, DynamicConfigs, Environment};
use dotenvy::from_filename;
use logging::errors::LoggingError;
use std::{env, str::FromStr};
use tracing::{error, warn};

/// Loads the `.env.<environment>` file picked by `RUST_ENV`, then reads the
/// process environment into a `Configs<T>` and installs the logger.
#[derive(Default)]
pub struct ConfigsBuilder {
    rabbitmq_sim: bool,
}

impl ConfigsBuilder {
    pub fn new() -> ConfigsBuilder {
        ConfigsBuilder::default()
    }

    pub fn rabbitmq_sim(mut self) -> Self {
        self.rabbitmq_sim = true;
        self
    }

    pub fn build<T>(&self) -> Result<Configs<T>, ConfigsError>
    where
        T: DynamicConfigs,
    {
        let env = Environment::from_rust_env();
        self.load_env_file(self.env_file_name(&env))?;

        let mut cfg = Configs::<T>::default();
        self.fill_app(&mut cfg, env);

        if let Err(LoggingError::AlreadyInitialized) = logging::setup(&cfg.app) {
            warn!("logger already installed, keeping the current one");
        }

        for (key, value) in env::vars() {
            self.fill_rabbitmq_sim(&mut cfg, &key, &value);
        }

        cfg.dynamic.load();

        Ok(cfg)
    }
}

impl ConfigsBuilder {
    /// A missing env file is fine, the process environment is used as is.
    fn load_env_file(&self, file_name: &str) -> Result<(), ConfigsError> {
        match from_filename(file_name) {
            Err(err) if !err.not_found() => {
                error!(file = file_name, error = err.to_string(), "failure to load env file");
                Err(ConfigsError::EnvFileError(err.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn env_file_name(&self, env: &Environment) -> &'static str {
        match env {
            Environment::Prod => PROD_FILE_NAME,
            Environment::Staging => STAGING_FILE_NAME,
            Environment::Dev => DEV_ENV_FILE_NAME,
            Environment::Local => LOCAL_ENV_FILE_NAME,
        }
    }

    fn fill_app<T>(&self, cfg: &mut Configs<T>, env: Environment)
    where
        T: DynamicConfigs,
    {
        let defaults = AppConfigs::default();

        let name = self.fmt_name(&env, env::var(APP_NAME_ENV_KEY).unwrap_or(defaults.name));
        let log_level = env::var(LOG_LEVEL_ENV_KEY).unwrap_or(defaults.log_level);
        let enable_external_creates_logging = self.parse_or(
            ENABLE_EXTERNAL_CRATES_LOGGING_ENV_KEY,
            env::var(ENABLE_EXTERNAL_CRATES_LOGGING_ENV_KEY).unwrap_or_default(),
            defaults.enable_external_creates_logging,
        );

        cfg.app = AppConfigs {
            name,
            env,
            log_level,
            enable_external_creates_logging,
        };
    }

    fn fill_rabbitmq_sim<T>(&self, cfg: &mut Configs<T>, key: &str, value: &str) -> bool
    where
        T: DynamicConfigs,
    {
        match key {
            RABBITMQ_SIM_STRICT_REDECLARATION_ENV_KEY if self.rabbitmq_sim => {
                cfg.rabbitmq.strict_redeclaration = self.parse_or(key, value, false);
                true
            }
            RABBITMQ_SIM_UNIQUE_ANONYMOUS_QUEUES_ENV_KEY if self.rabbitmq_sim => {
                cfg.rabbitmq.unique_anonymous_queues = self.parse_or(key, value, false);
                true
            }
            _ => false,
        }
    }

    fn parse_or<T>(&self, key: &str, value: impl AsRef<str>, default: T) -> T
    where
        T: FromStr,
    {
        let value = value.as_ref();
        if value.is_empty() {
            return default;
        }

        value.parse().unwrap_or_else(|_| {
            error!(key = key, value = value, "parse went wrong");
            default
        })
    }

    fn fmt_name(&self, env: &Environment, name: String) -> String {
        let env_str = env.to_string();
        if name.starts_with(&env_str) {
            return name;
        }

        format!("{}-{}", env_str, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use configs::Empty;

    #[test]
    fn should_pick_the_env_file() {
        let builder = ConfigsBuilder::new();

        assert_eq!(builder.env_file_name(&Environment::Local), ".env.local");
        assert_eq!(builder.env_file_name(&Environment::Dev), ".env.develop");
        assert_eq!(builder.env_file_name(&Environment::Staging), ".env.staging");
        assert_eq!(builder.env_file_name(&Environment::Prod), ".env.prod");
    }

    #[test]
    fn should_prefix_the_app_name_with_the_environment() {
        let builder = ConfigsBuilder::new();

        assert_eq!(
            builder.fmt_name(&Environment::Local, "orders".to_owned()),
            "local-orders"
        );
        assert_eq!(
            builder.fmt_name(&Environment::Prod, "prod-orders".to_owned()),
            "prod-orders"
        );
    }

    #[test]
    fn should_fill_simulation_configs_when_enabled() {
        let builder = ConfigsBuilder::new().rabbitmq_sim();
        let mut cfg = Configs::<Empty>::default();

        assert!(builder.fill_rabbitmq_sim(
            &mut cfg,
            RABBITMQ_SIM_STRICT_REDECLARATION_ENV_KEY,
            "true"
        ));
        assert!(builder.fill_rabbitmq_sim(
            &mut cfg,
            RABBITMQ_SIM_UNIQUE_ANONYMOUS_QUEUES_ENV_KEY,
            "true"
        ));
        assert!(!builder.fill_rabbitmq_sim(&mut cfg, "OTHER_KEY", "true"));

        assert!(cfg.rabbitmq.strict_redeclaration);
        assert!(cfg.rabbitmq.unique_anonymous_queues);
    }

    #[test]
    fn should_ignore_simulation_keys_when_disabled() {
        let builder = ConfigsBuilder::new();
        let mut cfg = Configs::<Empty>::default();

        assert!(!builder.fill_rabbitmq_sim(
            &mut cfg,
            RABBITMQ_SIM_STRICT_REDECLARATION_ENV_KEY,
            "true"
        ));
        assert!(!cfg.rabbitmq.strict_redeclaration);
    }

    #[test]
    fn should_fallback_on_unparsable_values() {
        let builder = ConfigsBuilder::new().rabbitmq_sim();
        let mut cfg = Configs::<Empty>::default();

        builder.fill_rabbitmq_sim(&mut cfg, RABBITMQ_SIM_STRICT_REDECLARATION_ENV_KEY, "yes");
        assert!(!cfg.rabbitmq.strict_redeclaration);

        assert_eq!(builder.parse_or("KEY", "", 7), 7);
        assert_eq!(builder.parse_or("KEY", "3", 7), 3);
    }

    #[test]
    fn should_tolerate_a_missing_env_file() {
        let builder = ConfigsBuilder::new();
        let path = env::temp_dir().join("configs-builder-missing.env");

        assert!(builder.load_env_file(path.to_str().unwrap()).is_ok());
    }

    #[test]
    fn should_fail_on_a_malformed_env_file() {
        let builder = ConfigsBuilder::new();
        let path = env::temp_dir().join("configs-builder-malformed.env");
        std::fs::write(&path, "NOT AN ASSIGNMENT\n").unwrap();

        let res = builder.load_env_file(path.to_str().unwrap());
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(res, Err(ConfigsError::EnvFileError(_))));
    }

    #[derive(Default)]
    struct Loaded {
        loaded: bool,
    }

    impl DynamicConfigs for Loaded {
        fn load(&mut self) {
            self.loaded = true;
        }
    }

    #[test]
    fn should_build_and_load_dynamic_configs() {
        let cfg = ConfigsBuilder::new().rabbitmq_sim().build::<Loaded>();

        assert!(cfg.is_ok());
        assert!(cfg.unwrap().dynamic.loaded);
    }
}
