use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq, Clone)]
pub enum AmqpError {
    #[error("unknown exchange type `{0}`")]
    UnknownExchangeKind(String),

    #[error("invalid x-match binding argument `{0}`, expected `all` or `any`")]
    InvalidXMatch(String),

    #[error("precondition failed, inequivalent redeclaration of `{0}`")]
    PreconditionFailed(String),

    #[error("no exchange `{0}` declared in this channel")]
    ExchangeNotFound(String),

    #[error("access refused, cannot publish to internal exchange `{0}`")]
    AccessRefused(String),

    #[error("channel `{0}` is closed")]
    ChannelClosed(u16),
}
