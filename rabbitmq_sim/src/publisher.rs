use crate::{channel::Channel, otel::RabbitMQTracePropagator, queue::Message};
use async_trait::async_trait;
use lapin::types::{
    AMQPValue, FieldTable, LongInt, LongLongInt, LongString, LongUInt, ShortString,
};
use messaging::{
    errors::MessagingError,
    publisher::{HeaderValues, PublishMessage, Publisher},
};
use opentelemetry::{global, trace::TraceContextExt, Context};
use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};
use tokio::sync::Mutex;
use tracing::{debug, error};
use uuid::Uuid;

/// `Publisher` that delivers into a simulated channel instead of a broker.
///
/// The channel sits behind one mutex, so every publish sees and mutates the
/// topology atomically.
pub struct RabbitMQSimPublisher {
    channel: Arc<Mutex<Channel>>,
}

impl RabbitMQSimPublisher {
    pub fn new(channel: Arc<Mutex<Channel>>) -> Arc<RabbitMQSimPublisher> {
        Arc::new(RabbitMQSimPublisher { channel })
    }
}

#[async_trait]
impl Publisher for RabbitMQSimPublisher {
    async fn publish(&self, ctx: &Context, infos: &PublishMessage) -> Result<(), MessagingError> {
        let mut btree = BTreeMap::<ShortString, AMQPValue>::default();

        global::get_text_map_propagator(|propagator| {
            propagator.inject_context(ctx, &mut RabbitMQTracePropagator::new(&mut btree))
        });

        if let Some(headers) = &infos.headers {
            self.btree_map(headers, &mut btree);
        }

        let message = Message {
            message_id: Uuid::new_v4().to_string(),
            exchange: infos.to.clone(),
            routing_key: infos.key.clone(),
            msg_type: infos.msg_type.clone(),
            payload: infos.data.clone(),
            headers: FieldTable::from(btree),
        };

        let trace_id = ctx.span().span_context().trace_id().to_string();

        match self.channel.lock().await.publish(message) {
            Ok(delivered) => {
                debug!(
                    trace.id = trace_id,
                    exchange = infos.to,
                    routing_key = infos.key,
                    delivered,
                    "message published"
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    trace.id = trace_id,
                    error = err.to_string(),
                    "error publishing message"
                );
                Err(MessagingError::PublisherError(err.to_string()))
            }
        }
    }
}

impl RabbitMQSimPublisher {
    fn btree_map(
        &self,
        hash_map: &HashMap<String, HeaderValues>,
        btree: &mut BTreeMap<ShortString, AMQPValue>,
    ) {
        for (key, value) in hash_map {
            let amqp_value = match value {
                HeaderValues::ShortString(v) => {
                    AMQPValue::ShortString(ShortString::from(v.clone()))
                }
                HeaderValues::LongString(v) => AMQPValue::LongString(LongString::from(v.clone())),
                HeaderValues::Int(v) => AMQPValue::ShortShortInt(*v),
                HeaderValues::LongInt(v) => AMQPValue::LongInt(LongInt::from(*v)),
                HeaderValues::LongLongInt(v) => AMQPValue::LongLongInt(LongLongInt::from(*v)),
                HeaderValues::Uint(v) => AMQPValue::ShortShortUInt(*v),
                HeaderValues::LongUint(v) => AMQPValue::LongUInt(LongUInt::from(*v)),
                HeaderValues::LongLongUint(v) => match LongLongInt::try_from(*v) {
                    Ok(v) => AMQPValue::LongLongInt(v),
                    Err(_) => AMQPValue::LongString(LongString::from(v.to_string())),
                },
            };

            btree.insert(ShortString::from(key.clone()), amqp_value);
        }
    }
}
