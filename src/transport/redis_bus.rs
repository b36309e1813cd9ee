use futures::stream::LocalBoxStream;
use futures::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{debug, info};

use crate::alert::{AlertEvent, AlertSink, PublishError};
use crate::transport::TransportError;

/// A verified connection to the Redis server.
pub struct RedisBus {
    client: redis::Client,
    url: String,
}

impl RedisBus {
    /// Open a client and confirm the server answers `PING`.
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let unavailable = |source| TransportError::Unavailable {
            url: url.to_string(),
            source,
        };

        let client = redis::Client::open(url).map_err(unavailable)?;
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)?;
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        debug!(%url, reply = %pong, "message bus ping");
        info!(%url, "connected to message bus");

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Subscribe to `channel` and yield each message payload as text.
    ///
    /// Subscription bookkeeping frames never reach the stream. Payloads that
    /// are not valid UTF-8 are dropped.
    pub async fn subscribe(
        &self,
        channel: &str,
    ) -> Result<LocalBoxStream<'static, String>, TransportError> {
        let subscribe_err = |source| TransportError::Subscribe {
            channel: channel.to_string(),
            source,
        };

        let mut pubsub = self
            .client
            .get_async_pubsub()
            .await
            .map_err(subscribe_err)?;
        pubsub.subscribe(channel).await.map_err(subscribe_err)?;
        info!(%channel, "subscribed to ingress channel");

        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            match msg.get_payload::<String>() {
                Ok(payload) => Some(payload),
                Err(e) => {
                    debug!(error = %e, "dropping undecodable payload");
                    None
                }
            }
        });
        Ok(stream.boxed_local())
    }

    /// Open a publisher for `channel`.
    pub async fn alert_sink(&self, channel: &str) -> Result<RedisAlertSink, TransportError> {
        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|source| TransportError::Unavailable {
                url: self.url.clone(),
                source,
            })?;
        Ok(RedisAlertSink {
            conn,
            channel: channel.to_string(),
        })
    }
}

/// Publishes alerts as JSON on a Redis channel.
#[derive(Clone)]
pub struct RedisAlertSink {
    conn: MultiplexedConnection,
    channel: String,
}

#[async_trait::async_trait]
impl AlertSink for RedisAlertSink {
    async fn publish(&self, alert: &AlertEvent) -> Result<(), PublishError> {
        let payload = alert.to_json()?;
        let mut conn = self.conn.clone();
        let receivers: i64 = conn
            .publish(&self.channel, payload)
            .await
            .map_err(|e| PublishError::Channel {
                channel: self.channel.clone(),
                reason: e.to_string(),
            })?;
        debug!(channel = %self.channel, receivers, "alert published");
        Ok(())
    }
}
