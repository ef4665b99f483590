use crate::{
    binding::{Binding, Target},
    errors::AmqpError,
};
use lapin::types::{AMQPValue, FieldTable, ShortString};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};
use tracing::debug;

/// Name of the exchange every channel starts with.
pub const DEFAULT_EXCHANGE: &str = "";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ExchangeKind {
    #[default]
    Direct,
    Fanout,
    Topic,
    Headers,
}

impl FromStr for ExchangeKind {
    type Err = AmqpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(ExchangeKind::Direct),
            "fanout" => Ok(ExchangeKind::Fanout),
            "topic" => Ok(ExchangeKind::Topic),
            "headers" => Ok(ExchangeKind::Headers),
            _ => Err(AmqpError::UnknownExchangeKind(s.to_owned())),
        }
    }
}

impl TryFrom<&str> for ExchangeKind {
    type Error = AmqpError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Display for ExchangeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let printable = match self {
            ExchangeKind::Direct => "direct",
            ExchangeKind::Fanout => "fanout",
            ExchangeKind::Topic => "topic",
            ExchangeKind::Headers => "headers",
        };
        write!(f, "{}", printable)
    }
}

#[derive(Debug, Clone)]
pub struct ExchangeDefinition {
    pub(crate) name: String,
    pub(crate) kind: ExchangeKind,
    pub(crate) delete: bool,
    pub(crate) durable: bool,
    pub(crate) internal: bool,
    pub(crate) params: FieldTable,
}

impl ExchangeDefinition {
    pub fn new(name: impl Into<String>) -> ExchangeDefinition {
        ExchangeDefinition {
            name: name.into(),
            kind: ExchangeKind::Direct,
            delete: false,
            durable: false,
            internal: false,
            params: FieldTable::default(),
        }
    }

    pub fn kind(mut self, kind: ExchangeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn direct(mut self) -> Self {
        self.kind = ExchangeKind::Direct;
        self
    }

    pub fn fanout(mut self) -> Self {
        self.kind = ExchangeKind::Fanout;
        self
    }

    pub fn topic(mut self) -> Self {
        self.kind = ExchangeKind::Topic;
        self
    }

    pub fn headers(mut self) -> Self {
        self.kind = ExchangeKind::Headers;
        self
    }

    pub fn params(mut self, params: FieldTable) -> Self {
        self.params = params;
        self
    }

    pub fn param(mut self, key: &str, value: AMQPValue) -> Self {
        self.params.insert(ShortString::from(key), value);
        self
    }

    pub fn delete(mut self) -> Self {
        self.delete = true;
        self
    }

    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }

    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }
}

/// A named routing node.
///
/// The exchange owns its bindings in insertion order; `route` walks them in
/// that order, so results are deterministic and a target bound twice is
/// returned twice.
#[derive(Debug, Clone)]
pub struct Exchange {
    name: String,
    kind: ExchangeKind,
    durable: bool,
    auto_delete: bool,
    internal: bool,
    arguments: FieldTable,
    bindings: Vec<Binding>,
}

impl Exchange {
    pub fn new(def: &ExchangeDefinition) -> Exchange {
        Exchange {
            name: def.name.clone(),
            kind: def.kind,
            durable: def.durable,
            auto_delete: def.delete,
            internal: def.internal,
            arguments: def.params.clone(),
            bindings: vec![],
        }
    }

    /// The nameless direct exchange every queue is reachable through.
    pub fn default_exchange() -> Exchange {
        Exchange::new(&ExchangeDefinition::new(DEFAULT_EXCHANGE).direct().durable())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ExchangeKind {
        self.kind
    }

    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_EXCHANGE
    }

    pub fn is_durable(&self) -> bool {
        self.durable
    }

    pub fn is_auto_delete(&self) -> bool {
        self.auto_delete
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }

    pub fn arguments(&self) -> &FieldTable {
        &self.arguments
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Appends a binding. Nothing is deduplicated.
    pub fn add_binding(
        &mut self,
        routing_key: &str,
        target: Target,
        arguments: FieldTable,
    ) -> Result<(), AmqpError> {
        let binding = Binding::new(self.kind, routing_key, target, arguments)?;

        debug!(
            exchange = self.name,
            routing_key,
            target = binding.target().to_string(),
            "binding added"
        );
        self.bindings.push(binding);

        Ok(())
    }

    /// Removes the first binding with `routing_key`, restricted to `target`
    /// when one is given. Returns `None` when nothing matched.
    pub fn remove_binding(
        &mut self,
        routing_key: &str,
        target: Option<&Target>,
    ) -> Option<Binding> {
        let position = self.bindings.iter().position(|binding| {
            binding.routing_key() == routing_key && target.map_or(true, |t| binding.target() == t)
        })?;

        let removed = self.bindings.remove(position);
        debug!(
            exchange = self.name,
            routing_key,
            target = removed.target().to_string(),
            "binding removed"
        );

        Some(removed)
    }

    /// Targets a message published with `routing_key` and `headers` reaches.
    pub fn route(&self, routing_key: &str, headers: &FieldTable) -> Vec<Target> {
        self.bindings
            .iter()
            .filter(|binding| binding.matches(routing_key, headers))
            .map(|binding| binding.target().clone())
            .collect()
    }

    pub fn has_binding(&self, routing_key: &str) -> bool {
        self.bindings
            .iter()
            .any(|binding| binding.routing_key() == routing_key)
    }

    pub fn is_bound(&self, target: &Target, routing_key: &str) -> bool {
        self.bindings
            .iter()
            .any(|binding| binding.routing_key() == routing_key && binding.target() == target)
    }

    pub(crate) fn is_equivalent(&self, def: &ExchangeDefinition) -> bool {
        self.kind == def.kind
            && self.durable == def.durable
            && self.auto_delete == def.delete
            && self.internal == def.internal
    }
}
