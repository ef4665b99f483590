use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LoggingError {
    #[error("a global tracing subscriber was already installed")]
    AlreadyInitialized,
}
