//! Redis pub/sub glue: the ingress subscription and the alert publisher.

pub mod redis_bus;

use thiserror::Error;

pub use redis_bus::{RedisAlertSink, RedisBus};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("message bus unavailable at {url}: {source}")]
    Unavailable {
        url: String,
        #[source]
        source: redis::RedisError,
    },

    #[error("failed to subscribe to channel {channel}: {source}")]
    Subscribe {
        channel: String,
        #[source]
        source: redis::RedisError,
    },
}
