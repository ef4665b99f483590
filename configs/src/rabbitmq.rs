/// Behaviour switches for the in-process RabbitMQ simulation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RabbitMQSimConfigs {
    /// Fail redeclarations whose options differ from the existing entity,
    /// instead of silently keeping the first declaration.
    ///
    ///Default: false
    pub strict_redeclaration: bool,
    /// Give every queue declared with an empty name a fresh `amq.gen-*` name,
    /// instead of reusing the single `""` queue.
    ///
    ///Default: false
    pub unique_anonymous_queues: bool,
}

impl RabbitMQSimConfigs {
    pub fn strict(mut self) -> Self {
        self.strict_redeclaration = true;
        self
    }

    pub fn unique_anonymous_queues(mut self) -> Self {
        self.unique_anonymous_queues = true;
        self
    }
}
