pub mod errors;
pub mod publisher;

#[cfg(any(test, feature = "mocks"))]
pub use publisher::MockPublisher;
