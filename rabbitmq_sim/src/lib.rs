//! In-process simulation of a RabbitMQ channel: exchanges, queues and
//! bindings, routing messages exactly the way the broker decides which
//! queues receive them, without a broker connection.

mod otel;
mod routing;

pub mod binding;
pub mod channel;
pub mod errors;
pub mod exchange;
pub mod publisher;
pub mod queue;

pub use binding::{Binding, Target, XMatch};
pub use channel::{Channel, ChannelStatus};
pub use errors::AmqpError;
pub use exchange::{Exchange, ExchangeDefinition, ExchangeKind, DEFAULT_EXCHANGE};
pub use publisher::RabbitMQSimPublisher;
pub use queue::{Message, Queue, QueueBinding, QueueDefinition};
