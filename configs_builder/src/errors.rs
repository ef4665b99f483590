use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigsError {
    #[error("failure to load env file `{0}`")]
    EnvFileError(String),
}
