use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MessagingError {
    #[error("failure to publish message `{0}`")]
    PublisherError(String),
}
