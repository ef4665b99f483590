use crate::{
    binding::Target,
    errors::AmqpError,
    exchange::{Exchange, ExchangeDefinition, DEFAULT_EXCHANGE},
    queue::{Message, Queue, QueueDefinition},
};
use configs::RabbitMQSimConfigs;
use lapin::types::FieldTable;
use std::{
    collections::{hash_map::Entry, HashMap},
    fmt::{Display, Formatter, Result as FmtResult},
};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Prefix of the names generated for anonymous queues.
pub const ANONYMOUS_QUEUE_PREFIX: &str = "amq.gen-";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChannelStatus {
    #[default]
    Opening,
    Open,
    Closed,
}

/// Name-scoped registry of exchanges and queues.
///
/// Declarations are idempotent: declaring a name twice hands back the entity
/// registered the first time, with its bindings and messages intact. Binding
/// against an exchange nobody declared quietly declares a direct exchange.
///
/// # Example:
///
/// ```rust
/// use configs::RabbitMQSimConfigs;
/// use lapin::types::FieldTable;
/// use rabbitmq_sim::{Channel, ExchangeDefinition, QueueDefinition, Target};
///
/// let mut channel = Channel::new(1, "orders-service", RabbitMQSimConfigs::default());
///
/// channel.declare_exchange(&ExchangeDefinition::new("orders").topic())?;
/// channel.declare_queue(&QueueDefinition::new("billing"))?;
/// channel.bind(Target::queue("billing"), "orders.*.paid", "orders")?;
///
/// let exchange = channel.exchange("orders").unwrap();
/// let targets = exchange.route("orders.eu.paid", &FieldTable::default());
/// assert_eq!(targets, vec![Target::queue("billing")]);
/// # Ok::<(), rabbitmq_sim::AmqpError>(())
/// ```
#[derive(Debug)]
pub struct Channel {
    id: u16,
    connection: String,
    configs: RabbitMQSimConfigs,
    status: ChannelStatus,
    default_exchange: Exchange,
    exchanges: HashMap<String, Exchange>,
    queues: HashMap<String, Queue>,
}

impl Channel {
    pub fn new(id: u16, connection: impl Into<String>, configs: RabbitMQSimConfigs) -> Channel {
        Channel {
            id,
            connection: connection.into(),
            configs,
            status: ChannelStatus::default(),
            default_exchange: Exchange::default_exchange(),
            exchanges: HashMap::default(),
            queues: HashMap::default(),
        }
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn status(&self) -> ChannelStatus {
        self.status
    }

    pub fn configs(&self) -> &RabbitMQSimConfigs {
        &self.configs
    }

    pub fn open(&mut self) {
        if self.status == ChannelStatus::Closed {
            warn!(channel = self.id, "ignoring open, the channel is already closed");
            return;
        }

        self.status = ChannelStatus::Open;
        debug!(channel = self.id, "channel opened");
    }

    pub fn close(&mut self) {
        self.status = ChannelStatus::Closed;
        debug!(channel = self.id, "channel closed");
    }

    pub fn is_open(&self) -> bool {
        self.status == ChannelStatus::Open
    }
}

impl Channel {
    /// Returns the exchange registered under the definition's name, creating
    /// it first when the name is free.
    pub fn declare_exchange(
        &mut self,
        def: &ExchangeDefinition,
    ) -> Result<&mut Exchange, AmqpError> {
        let strict = self.configs.strict_redeclaration;

        if def.name == DEFAULT_EXCHANGE {
            return redeclare_exchange(&mut self.default_exchange, def, strict);
        }

        match self.exchanges.entry(def.name.clone()) {
            Entry::Occupied(entry) => redeclare_exchange(entry.into_mut(), def, strict),
            Entry::Vacant(entry) => {
                debug!(exchange = def.name, kind = %def.kind, "exchange declared");
                Ok(entry.insert(Exchange::new(def)))
            }
        }
    }

    pub fn direct(&mut self, name: &str) -> Result<&mut Exchange, AmqpError> {
        self.declare_exchange(&ExchangeDefinition::new(name).direct())
    }

    pub fn fanout(&mut self, name: &str) -> Result<&mut Exchange, AmqpError> {
        self.declare_exchange(&ExchangeDefinition::new(name).fanout())
    }

    pub fn topic(&mut self, name: &str) -> Result<&mut Exchange, AmqpError> {
        self.declare_exchange(&ExchangeDefinition::new(name).topic())
    }

    pub fn headers(&mut self, name: &str) -> Result<&mut Exchange, AmqpError> {
        self.declare_exchange(&ExchangeDefinition::new(name).headers())
    }

    pub fn default_exchange(&self) -> &Exchange {
        &self.default_exchange
    }

    /// Returns the queue registered under the definition's name, creating it
    /// first when the name is free. A new queue is bound to the default
    /// exchange under its own name.
    pub fn declare_queue(&mut self, def: &QueueDefinition) -> Result<&mut Queue, AmqpError> {
        let strict = self.configs.strict_redeclaration;
        let name = self.queue_name(&def.name);

        match self.queues.entry(name) {
            Entry::Occupied(entry) => redeclare_queue(entry.into_mut(), def, strict),
            Entry::Vacant(entry) => {
                let name = entry.key().clone();
                let mut queue = Queue::new(name.clone(), def);

                let target = Target::queue(name.as_str());
                if !self.default_exchange.is_bound(&target, &name) {
                    self.default_exchange
                        .add_binding(&name, target.clone(), FieldTable::default())?;
                }

                // bindings made before this declaration already point at the name
                let exchanges =
                    std::iter::once(&self.default_exchange).chain(self.exchanges.values());
                for exchange in exchanges {
                    for binding in exchange.bindings().iter().filter(|b| b.target() == &target) {
                        queue.record_binding(exchange.name(), binding.routing_key());
                    }
                }

                debug!(queue = name, exclusive = def.exclusive, "queue declared");
                Ok(entry.insert(queue))
            }
        }
    }

    /// An exclusive queue with an empty, or generated, name.
    pub fn temporary_queue(&mut self, def: QueueDefinition) -> Result<&mut Queue, AmqpError> {
        let def = QueueDefinition {
            name: String::new(),
            ..def
        }
        .exclusive();

        self.declare_queue(&def)
    }

    pub fn queue_exists(&self, name: &str) -> bool {
        self.queues.contains_key(name)
    }

    pub fn exchange_exists(&self, name: &str) -> bool {
        name == DEFAULT_EXCHANGE || self.exchanges.contains_key(name)
    }

    pub fn queue(&self, name: &str) -> Option<&Queue> {
        self.queues.get(name)
    }

    pub fn queue_mut(&mut self, name: &str) -> Option<&mut Queue> {
        self.queues.get_mut(name)
    }

    pub fn exchange(&self, name: &str) -> Option<&Exchange> {
        if name == DEFAULT_EXCHANGE {
            return Some(&self.default_exchange);
        }
        self.exchanges.get(name)
    }

    pub fn exchange_mut(&mut self, name: &str) -> Option<&mut Exchange> {
        if name == DEFAULT_EXCHANGE {
            return Some(&mut self.default_exchange);
        }
        self.exchanges.get_mut(name)
    }

    pub fn queues(&self) -> impl Iterator<Item = &Queue> {
        self.queues.values()
    }

    /// Every exchange, the default one first.
    pub fn exchanges(&self) -> impl Iterator<Item = &Exchange> {
        std::iter::once(&self.default_exchange).chain(self.exchanges.values())
    }

    /// Removes the queue. Bindings pointing at it are left in place.
    pub fn deregister_queue(&mut self, name: &str) -> Option<Queue> {
        let removed = self.queues.remove(name);
        if removed.is_some() {
            debug!(queue = name, "queue deregistered");
        }
        removed
    }

    /// Removes the exchange and the bindings it owns, which queues stop
    /// reporting. Bindings on other exchanges pointing at it are left in place.
    pub fn deregister_exchange(&mut self, name: &str) -> Option<Exchange> {
        if name == DEFAULT_EXCHANGE {
            warn!("the default exchange cannot be deregistered");
            return None;
        }

        let removed = self.exchanges.remove(name)?;

        for binding in removed.bindings() {
            if let Target::Queue(queue) = binding.target() {
                if let Some(queue) = self.queues.get_mut(queue) {
                    queue.forget_binding(name, binding.routing_key());
                }
            }
        }

        debug!(exchange = name, "exchange deregistered");
        Some(removed)
    }
}

impl Channel {
    pub fn bind(
        &mut self,
        target: Target,
        routing_key: &str,
        exchange: &str,
    ) -> Result<(), AmqpError> {
        self.bind_with_arguments(target, routing_key, exchange, FieldTable::default())
    }

    /// Binds `target` to `exchange`, declaring the exchange when it is
    /// unknown. `arguments` carry the `x-match` mode and the required
    /// headers of a headers binding.
    pub fn bind_with_arguments(
        &mut self,
        target: Target,
        routing_key: &str,
        exchange: &str,
        arguments: FieldTable,
    ) -> Result<(), AmqpError> {
        self.resolve_exchange(exchange)
            .add_binding(routing_key, target.clone(), arguments)?;

        if let Target::Queue(queue) = &target {
            if let Some(queue) = self.queues.get_mut(queue) {
                queue.record_binding(exchange, routing_key);
            }
        }

        Ok(())
    }

    /// Removes the first binding under `routing_key`. Unknown bindings are
    /// ignored.
    pub fn unbind(&mut self, routing_key: &str, exchange: &str) {
        self.remove_binding(routing_key, exchange, None)
    }

    pub fn unbind_target(&mut self, target: &Target, routing_key: &str, exchange: &str) {
        self.remove_binding(routing_key, exchange, Some(target))
    }

    pub fn has_binding(&self, routing_key: &str, exchange: &str) -> bool {
        self.exchange(exchange)
            .is_some_and(|e| e.has_binding(routing_key))
    }

    pub fn is_bound(&self, target: &Target, routing_key: &str, exchange: &str) -> bool {
        self.exchange(exchange)
            .is_some_and(|e| e.is_bound(target, routing_key))
    }

    fn remove_binding(&mut self, routing_key: &str, exchange: &str, target: Option<&Target>) {
        let Some(removed) = self
            .resolve_exchange(exchange)
            .remove_binding(routing_key, target)
        else {
            debug!(exchange, routing_key, "nothing to unbind");
            return;
        };

        if let Target::Queue(queue) = removed.target() {
            if let Some(queue) = self.queues.get_mut(queue) {
                queue.forget_binding(exchange, routing_key);
            }
        }
    }

    fn resolve_exchange(&mut self, name: &str) -> &mut Exchange {
        if name == DEFAULT_EXCHANGE {
            return &mut self.default_exchange;
        }

        self.exchanges.entry(name.to_owned()).or_insert_with(|| {
            warn!(
                exchange = name,
                "exchange was never declared, declaring it with default options"
            );
            Exchange::new(&ExchangeDefinition::new(name))
        })
    }

    fn queue_name(&self, requested: &str) -> String {
        if requested.is_empty() && self.configs.unique_anonymous_queues {
            return format!("{}{}", ANONYMOUS_QUEUE_PREFIX, Uuid::new_v4());
        }
        requested.to_owned()
    }
}

impl Channel {
    /// Routes `message` from `message.exchange` and enqueues a copy on every
    /// queue reached, following exchange-to-exchange bindings. Returns the
    /// number of copies enqueued.
    pub fn publish(&mut self, message: Message) -> Result<usize, AmqpError> {
        if self.status == ChannelStatus::Closed {
            error!(channel = self.id, "failure to publish on a closed channel");
            return Err(AmqpError::ChannelClosed(self.id));
        }

        let Some(exchange) = self.exchange(&message.exchange) else {
            error!(exchange = message.exchange, "failure to publish, unknown exchange");
            return Err(AmqpError::ExchangeNotFound(message.exchange));
        };

        if exchange.is_internal() {
            error!(exchange = message.exchange, "failure to publish, internal exchange");
            return Err(AmqpError::AccessRefused(message.exchange));
        }

        let mut queues = vec![];
        self.collect_queues(
            exchange,
            &message.routing_key,
            &message.headers,
            &mut vec![],
            &mut queues,
        );

        let mut delivered = 0;
        for name in queues {
            match self.queues.get_mut(&name) {
                Some(queue) => {
                    queue.enqueue(message.clone());
                    delivered += 1;
                }
                None => warn!(queue = name, "bound queue no longer exists, copy dropped"),
            }
        }

        if delivered == 0 {
            debug!(
                exchange = message.exchange,
                routing_key = message.routing_key,
                "message unroutable"
            );
        }

        Ok(delivered)
    }

    // An exchange already on `path` is skipped so binding cycles terminate.
    fn collect_queues(
        &self,
        exchange: &Exchange,
        routing_key: &str,
        headers: &FieldTable,
        path: &mut Vec<String>,
        queues: &mut Vec<String>,
    ) {
        path.push(exchange.name().to_owned());

        for target in exchange.route(routing_key, headers) {
            match target {
                Target::Queue(name) => queues.push(name),
                Target::Exchange(name) => {
                    if path.contains(&name) {
                        debug!(exchange = name, "exchange already on the routing path");
                        continue;
                    }

                    match self.exchange(&name) {
                        Some(next) => self.collect_queues(next, routing_key, headers, path, queues),
                        None => warn!(exchange = name, "bound exchange no longer exists"),
                    }
                }
            }
        }

        path.pop();
    }
}

impl Display for Channel {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "Channel(id: {}, connection: {}, status: {:?})",
            self.id, self.connection, self.status
        )
    }
}

fn redeclare_exchange<'a>(
    exchange: &'a mut Exchange,
    def: &ExchangeDefinition,
    strict: bool,
) -> Result<&'a mut Exchange, AmqpError> {
    if exchange.is_equivalent(def) {
        return Ok(exchange);
    }

    if strict {
        error!(exchange = def.name, "inequivalent exchange redeclaration");
        return Err(AmqpError::PreconditionFailed(def.name.clone()));
    }

    warn!(
        exchange = def.name,
        "exchange redeclared with different options, keeping the first declaration"
    );
    Ok(exchange)
}

fn redeclare_queue<'a>(
    queue: &'a mut Queue,
    def: &QueueDefinition,
    strict: bool,
) -> Result<&'a mut Queue, AmqpError> {
    if queue.is_equivalent(def) {
        return Ok(queue);
    }

    if strict {
        error!(queue = queue.name(), "inequivalent queue redeclaration");
        return Err(AmqpError::PreconditionFailed(queue.name().to_owned()));
    }

    warn!(
        queue = queue.name(),
        "queue redeclared with different options, keeping the first declaration"
    );
    Ok(queue)
}
