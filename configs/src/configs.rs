use crate::{AppConfigs, RabbitMQSimConfigs};

#[derive(Debug, Clone, Default)]
pub struct Configs<T: DynamicConfigs> {
    pub app: AppConfigs,
    pub rabbitmq: RabbitMQSimConfigs,

    pub dynamic: T,
}

pub trait DynamicConfigs: Default {
    fn load(&mut self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Empty;
impl DynamicConfigs for Empty {
    fn load(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_lenient_simulation() {
        let cfg = Configs::<Empty>::default();

        assert!(!cfg.rabbitmq.strict_redeclaration);
        assert!(!cfg.rabbitmq.unique_anonymous_queues);
        assert_eq!(cfg.app.log_level, "debug");
    }

    #[test]
    fn should_enable_simulation_switches() {
        let cfg = RabbitMQSimConfigs::default()
            .strict()
            .unique_anonymous_queues();

        assert!(cfg.strict_redeclaration);
        assert!(cfg.unique_anonymous_queues);
    }
}
