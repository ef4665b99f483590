use crate::errors::MessagingError;
use async_trait::async_trait;
use opentelemetry::Context;
use std::collections::HashMap;

#[cfg(any(test, feature = "mocks"))]
use mockall::*;

#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValues {
    ShortString(String),
    LongString(String),
    Int(i8),
    LongInt(i32),
    LongLongInt(i64),
    Uint(u8),
    LongUint(u32),
    LongLongUint(u64),
}

impl From<&str> for HeaderValues {
    fn from(value: &str) -> Self {
        HeaderValues::LongString(value.to_owned())
    }
}

impl From<String> for HeaderValues {
    fn from(value: String) -> Self {
        HeaderValues::LongString(value)
    }
}

impl From<i32> for HeaderValues {
    fn from(value: i32) -> Self {
        HeaderValues::LongInt(value)
    }
}

impl From<i64> for HeaderValues {
    fn from(value: i64) -> Self {
        HeaderValues::LongLongInt(value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PublishMessage {
    /// Destination: the exchange name, `""` for the default exchange.
    pub to: String,
    pub from: String,
    /// Routing key.
    pub key: String,
    pub msg_type: String,
    pub data: Box<[u8]>,
    pub headers: Option<HashMap<String, HeaderValues>>,
}

impl PublishMessage {
    pub fn new<T>(to: T, key: T, msg_type: T, data: &[u8]) -> Self
    where
        T: Into<String>,
    {
        PublishMessage {
            to: to.into(),
            key: key.into(),
            msg_type: msg_type.into(),
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.from = from.into();
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<HeaderValues>) -> Self {
        self.headers
            .get_or_insert_with(HashMap::default)
            .insert(key.into(), value.into());
        self
    }
}

#[cfg_attr(any(test, feature = "mocks"), automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, ctx: &Context, infos: &PublishMessage) -> Result<(), MessagingError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_collect_headers() {
        let msg = PublishMessage::new("exchange", "key", "type", b"{}")
            .from("service")
            .header("format", "pdf")
            .header("version", 2);

        let headers = msg.headers.unwrap();
        assert_eq!(
            headers.get("format"),
            Some(&HeaderValues::LongString("pdf".to_owned()))
        );
        assert_eq!(headers.get("version"), Some(&HeaderValues::LongInt(2)));
        assert_eq!(msg.from, "service");
    }

    #[test]
    fn should_not_allocate_headers_when_none_given() {
        let msg = PublishMessage::new("", "queue", "type", b"");

        assert!(msg.headers.is_none());
        assert!(msg.to.is_empty());
    }

    #[tokio::test]
    async fn mock_publisher_can_stand_in_for_a_broker() {
        let mut publisher = MockPublisher::new();
        publisher
            .expect_publish()
            .withf(|_, msg| msg.key == "orders.created")
            .times(1)
            .returning(|_, _| Ok(()));

        let msg = PublishMessage::new("orders", "orders.created", "OrderCreated", b"{}");
        let res = publisher.publish(&Context::new(), &msg).await;

        assert!(res.is_ok());
    }
}
