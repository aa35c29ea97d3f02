//! Session configuration and connection.

use crate::error::ZenohSinkError;
use serde::{Deserialize, Serialize};
use zenoh::Session;

/// Zenoh connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZenohConfig {
    /// "client", "peer" or "router".
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Endpoints to connect to.
    #[serde(default)]
    pub connect: Vec<String>,

    /// Endpoints to listen on.
    #[serde(default)]
    pub listen: Vec<String>,
}

fn default_mode() -> String {
    "peer".to_string()
}

impl Default for ZenohConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            connect: Vec::new(),
            listen: Vec::new(),
        }
    }
}

impl ZenohConfig {
    /// Translate into a native Zenoh configuration.
    pub fn to_zenoh(&self) -> Result<zenoh::Config, ZenohSinkError> {
        let mut config = zenoh::Config::default();

        let mode = match self.mode.as_str() {
            "client" | "peer" | "router" => format!("\"{}\"", self.mode),
            other => {
                return Err(ZenohSinkError::Config(format!(
                    "Invalid Zenoh mode: '{}'. Expected 'client', 'peer', or 'router'",
                    other
                )));
            }
        };
        config
            .insert_json5("mode", &mode)
            .map_err(|e| ZenohSinkError::Config(format!("Failed to set mode: {}", e)))?;

        for (key, endpoints) in [
            ("connect/endpoints", &self.connect),
            ("listen/endpoints", &self.listen),
        ] {
            if endpoints.is_empty() {
                continue;
            }
            let json = serde_json::to_string(endpoints).map_err(|e| {
                ZenohSinkError::Config(format!("Failed to serialize {}: {}", key, e))
            })?;
            config
                .insert_json5(key, &json)
                .map_err(|e| ZenohSinkError::Config(format!("Failed to set {}: {}", key, e)))?;
        }

        Ok(config)
    }
}

/// Open a session.
pub async fn connect(config: &ZenohConfig) -> Result<Session, ZenohSinkError> {
    let zenoh_config = config.to_zenoh()?;

    tracing::info!(
        mode = %config.mode,
        connect = ?config.connect,
        listen = ?config.listen,
        "Connecting to Zenoh"
    );

    let session = zenoh::open(zenoh_config).await?;

    tracing::info!(zid = %session.zid(), "Connected to Zenoh");

    Ok(session)
}
