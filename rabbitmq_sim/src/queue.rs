use crate::otel::RabbitMQTracePropagator;
use lapin::types::{AMQPValue, FieldTable, LongInt, ShortString};
use opentelemetry::{global, Context};
use std::collections::{BTreeMap, VecDeque};

pub const AMQP_HEADERS_MESSAGE_TTL: &str = "x-message-ttl";

#[derive(Debug, Clone, Default)]
pub struct QueueDefinition {
    pub(crate) name: String,
    pub(crate) durable: bool,
    pub(crate) delete: bool,
    pub(crate) exclusive: bool,
    pub(crate) params: FieldTable,
}

impl QueueDefinition {
    pub fn new(name: impl Into<String>) -> QueueDefinition {
        QueueDefinition {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }

    pub fn delete(mut self) -> Self {
        self.delete = true;
        self
    }

    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Stored as `x-message-ttl`; expiry is not simulated.
    pub fn ttl(self, ttl: i32) -> Self {
        self.param(AMQP_HEADERS_MESSAGE_TTL, AMQPValue::LongInt(LongInt::from(ttl)))
    }

    pub fn params(mut self, params: FieldTable) -> Self {
        self.params = params;
        self
    }

    pub fn param(mut self, key: &str, value: AMQPValue) -> Self {
        self.params.insert(ShortString::from(key), value);
        self
    }
}

/// Which exchange binds a queue, and under which key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueBinding {
    pub exchange: String,
    pub routing_key: String,
}

/// A message sitting in a simulated queue.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    pub message_id: String,
    pub exchange: String,
    pub routing_key: String,
    pub msg_type: String,
    pub payload: Box<[u8]>,
    pub headers: FieldTable,
}

impl Message {
    /// The trace context the publisher injected into the headers, if the
    /// global propagator understands it.
    pub fn context(&self) -> Context {
        let mut headers: BTreeMap<ShortString, AMQPValue> = self.headers.inner().clone();

        global::get_text_map_propagator(|propagator| {
            propagator.extract(&RabbitMQTracePropagator::new(&mut headers))
        })
    }
}

#[derive(Debug, Clone)]
pub struct Queue {
    name: String,
    durable: bool,
    auto_delete: bool,
    exclusive: bool,
    arguments: FieldTable,
    bindings: Vec<QueueBinding>,
    messages: VecDeque<Message>,
}

impl Queue {
    pub(crate) fn new(name: String, def: &QueueDefinition) -> Queue {
        Queue {
            name,
            durable: def.durable,
            auto_delete: def.delete,
            exclusive: def.exclusive,
            arguments: def.params.clone(),
            bindings: vec![],
            messages: VecDeque::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_durable(&self) -> bool {
        self.durable
    }

    pub fn is_auto_delete(&self) -> bool {
        self.auto_delete
    }

    pub fn is_exclusive(&self) -> bool {
        self.exclusive
    }

    pub fn arguments(&self) -> &FieldTable {
        &self.arguments
    }

    pub fn bindings(&self) -> &[QueueBinding] {
        &self.bindings
    }

    pub fn is_bound_to(&self, exchange: &str, routing_key: &str) -> bool {
        self.bindings
            .iter()
            .any(|b| b.exchange == exchange && b.routing_key == routing_key)
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter()
    }

    pub fn pop(&mut self) -> Option<Message> {
        self.messages.pop_front()
    }

    /// Drops every message, returning how many were dropped.
    pub fn purge(&mut self) -> usize {
        let purged = self.messages.len();
        self.messages.clear();
        purged
    }

    pub(crate) fn enqueue(&mut self, message: Message) {
        self.messages.push_back(message);
    }

    pub(crate) fn record_binding(&mut self, exchange: &str, routing_key: &str) {
        self.bindings.push(QueueBinding {
            exchange: exchange.to_owned(),
            routing_key: routing_key.to_owned(),
        });
    }

    pub(crate) fn forget_binding(&mut self, exchange: &str, routing_key: &str) {
        if let Some(position) = self
            .bindings
            .iter()
            .position(|b| b.exchange == exchange && b.routing_key == routing_key)
        {
            self.bindings.remove(position);
        }
    }

    pub(crate) fn is_equivalent(&self, def: &QueueDefinition) -> bool {
        self.durable == def.durable
            && self.auto_delete == def.delete
            && self.exclusive == def.exclusive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str) -> Message {
        Message {
            message_id: id.to_owned(),
            routing_key: "orders".to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn should_build_definition() {
        let def = QueueDefinition::new("orders")
            .durable()
            .delete()
            .exclusive()
            .ttl(18000);

        let queue = Queue::new("orders".to_owned(), &def);

        assert_eq!(queue.name(), "orders");
        assert!(queue.is_durable());
        assert!(queue.is_auto_delete());
        assert!(queue.is_exclusive());
        assert_eq!(
            queue.arguments().inner().get(AMQP_HEADERS_MESSAGE_TTL),
            Some(&AMQPValue::LongInt(18000))
        );
        assert!(queue.is_equivalent(&def));
        assert!(!queue.is_equivalent(&QueueDefinition::new("orders")));
    }

    #[test]
    fn messages_are_consumed_in_order() {
        let mut queue = Queue::new("orders".to_owned(), &QueueDefinition::default());
        queue.enqueue(message("1"));
        queue.enqueue(message("2"));

        assert_eq!(queue.message_count(), 2);
        assert_eq!(queue.pop().map(|m| m.message_id), Some("1".to_owned()));
        assert_eq!(queue.pop().map(|m| m.message_id), Some("2".to_owned()));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn purge_drops_every_message() {
        let mut queue = Queue::new("orders".to_owned(), &QueueDefinition::default());
        queue.enqueue(message("1"));
        queue.enqueue(message("2"));

        assert_eq!(queue.purge(), 2);
        assert_eq!(queue.message_count(), 0);
        assert_eq!(queue.purge(), 0);
    }

    #[test]
    fn should_track_bindings() {
        let mut queue = Queue::new("orders".to_owned(), &QueueDefinition::default());
        queue.record_binding("events", "orders.created");
        queue.record_binding("events", "orders.created");

        queue.forget_binding("events", "orders.created");
        assert!(queue.is_bound_to("events", "orders.created"));

        queue.forget_binding("events", "orders.created");
        assert!(!queue.is_bound_to("events", "orders.created"));

        queue.forget_binding("events", "orders.created");
        assert!(queue.bindings().is_empty());
    }

    #[test]
    fn context_without_trace_headers_is_empty() {
        use opentelemetry::trace::TraceContextExt;

        let msg = message("1");
        assert!(!msg.context().span().span_context().is_valid());
    }
}
