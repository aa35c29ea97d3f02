//! Publishes points on Zenoh key expressions.

use crate::error::ZenohSinkError;
use crate::session::{ZenohConfig, connect};
use runstats::{Point, Sink, SinkError};
use std::sync::Arc;
use zenoh::Session;
use zenoh::bytes::Encoding;

/// Publishes each point as JSON on `<key_prefix>/<measurement>`.
#[derive(Clone, Debug)]
pub struct ZenohSink {
    session: Arc<Session>,
    key_prefix: String,
}

impl ZenohSink {
    /// Wrap an existing session.
    pub fn new(session: Arc<Session>, key_prefix: impl Into<String>) -> Self {
        Self {
            session,
            key_prefix: key_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    /// Open a session from `config` and wrap it.
    pub async fn connect(
        config: &ZenohConfig,
        key_prefix: impl Into<String>,
    ) -> Result<Self, ZenohSinkError> {
        let session = connect(config).await?;
        Ok(Self::new(Arc::new(session), key_prefix))
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Key expression a point for `measurement` is published on.
    pub fn key_for(&self, measurement: &str) -> String {
        if self.key_prefix.is_empty() {
            measurement.to_string()
        } else {
            format!("{}/{}", self.key_prefix, measurement)
        }
    }
}

impl Sink for ZenohSink {
    async fn ready(&self) -> Result<(), SinkError> {
        if self.session.is_closed() {
            return Err(SinkError::Unavailable("Zenoh session is closed".to_string()));
        }
        Ok(())
    }

    async fn write(&self, point: &Point) -> Result<(), SinkError> {
        let key = self.key_for(&point.measurement);
        let payload = serde_json::to_vec(point).map_err(|e| SinkError::Encode(e.to_string()))?;

        self.session
            .put(&key, payload)
            .encoding(Encoding::APPLICATION_JSON)
            .await
            .map_err(SinkError::Transport)?;

        tracing::trace!(key = %key, "Published runtime point");
        Ok(())
    }
}
