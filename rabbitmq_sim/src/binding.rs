use crate::{
    errors::AmqpError,
    exchange::{Exchange, ExchangeKind},
    queue::Queue,
    routing::{self, TopicPattern},
};
use lapin::types::{AMQPValue, FieldTable};
use std::fmt::{Display, Formatter, Result as FmtResult};

pub const AMQP_HEADERS_X_MATCH: &str = "x-match";

/// The destination of a binding.
///
/// Targets refer to queues and exchanges by name and never own them: the
/// channel decides how long the entity lives, so a target can outlive the
/// entity it names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Queue(String),
    Exchange(String),
}

impl Target {
    pub fn queue(name: impl Into<String>) -> Target {
        Target::Queue(name.into())
    }

    pub fn exchange(name: impl Into<String>) -> Target {
        Target::Exchange(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Target::Queue(name) | Target::Exchange(name) => name,
        }
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Target::Queue(name) => write!(f, "queue:{}", name),
            Target::Exchange(name) => write!(f, "exchange:{}", name),
        }
    }
}

impl From<&Queue> for Target {
    fn from(queue: &Queue) -> Self {
        Target::queue(queue.name())
    }
}

impl From<&Exchange> for Target {
    fn from(exchange: &Exchange) -> Self {
        Target::exchange(exchange.name())
    }
}

/// How many of the headers of a headers binding must match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum XMatch {
    #[default]
    All,
    Any,
}

impl XMatch {
    fn from_arguments(arguments: &FieldTable) -> Result<XMatch, AmqpError> {
        let Some(value) = arguments.inner().get(AMQP_HEADERS_X_MATCH) else {
            return Ok(XMatch::default());
        };

        let mode = match value {
            AMQPValue::LongString(v) => String::from_utf8_lossy(v.as_bytes()).into_owned(),
            AMQPValue::ShortString(v) => v.as_str().to_owned(),
            other => return Err(AmqpError::InvalidXMatch(format!("{:?}", other))),
        };

        match mode.as_str() {
            "all" => Ok(XMatch::All),
            "any" => Ok(XMatch::Any),
            _ => Err(AmqpError::InvalidXMatch(mode)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Exact,
    Always,
    Topic(TopicPattern),
    Headers(XMatch),
}

/// A routing rule owned by a single exchange.
#[derive(Debug, Clone)]
pub struct Binding {
    routing_key: String,
    target: Target,
    kind: ExchangeKind,
    arguments: FieldTable,
    predicate: Predicate,
}

impl Binding {
    pub(crate) fn new(
        kind: ExchangeKind,
        routing_key: &str,
        target: Target,
        arguments: FieldTable,
    ) -> Result<Binding, AmqpError> {
        let predicate = match kind {
            ExchangeKind::Direct => Predicate::Exact,
            ExchangeKind::Fanout => Predicate::Always,
            ExchangeKind::Topic => Predicate::Topic(TopicPattern::parse(routing_key)),
            ExchangeKind::Headers => Predicate::Headers(XMatch::from_arguments(&arguments)?),
        };

        Ok(Binding {
            routing_key: routing_key.to_owned(),
            target,
            kind,
            arguments,
            predicate,
        })
    }

    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn kind(&self) -> ExchangeKind {
        self.kind
    }

    pub fn arguments(&self) -> &FieldTable {
        &self.arguments
    }

    /// `None` unless the binding belongs to a headers exchange.
    pub fn x_match(&self) -> Option<XMatch> {
        match self.predicate {
            Predicate::Headers(x_match) => Some(x_match),
            _ => None,
        }
    }

    pub(crate) fn matches(&self, routing_key: &str, headers: &FieldTable) -> bool {
        match &self.predicate {
            Predicate::Exact => self.routing_key == routing_key,
            Predicate::Always => true,
            Predicate::Topic(pattern) => pattern.matches(routing_key),
            Predicate::Headers(x_match) => {
                routing::headers_match(*x_match, &self.arguments, headers)
            }
        }
    }
}
