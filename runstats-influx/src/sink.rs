//! HTTP sink for the InfluxDB v2 write API.

use crate::encode::encode_point;
use crate::error::InfluxError;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, Url};
use runstats::{Config, Point, Sink, SinkError};
use std::time::Duration;
use tracing::{debug, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Writes points to an InfluxDB v2 bucket.
#[derive(Debug, Clone)]
pub struct InfluxSink {
    client: Client,
    ready_url: Url,
    write_url: Url,
    token: String,
}

impl InfluxSink {
    /// Build a sink from a resolved [`Config`] (`host`, `token`, `org`,
    /// `bucket`).
    pub fn new(config: &Config) -> Result<Self, InfluxError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Self::with_client(config, client)
    }

    /// Build a sink that sends requests through `client`.
    pub fn with_client(config: &Config, client: Client) -> Result<Self, InfluxError> {
        let base = parse_endpoint(&config.host)?;

        let mut ready_url = base.clone();
        ready_url.set_path("/ready");

        let mut write_url = base;
        write_url.set_path("/api/v2/write");
        write_url
            .query_pairs_mut()
            .append_pair("org", &config.org)
            .append_pair("bucket", &config.bucket)
            .append_pair("precision", "ns");

        info!(endpoint = %write_url, "InfluxDB sink configured");

        Ok(Self {
            client,
            ready_url,
            write_url,
            token: config.token.clone(),
        })
    }

    /// The full write URL, including org, bucket and precision.
    pub fn write_url(&self) -> &Url {
        &self.write_url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        if self.token.is_empty() {
            request
        } else {
            request.header(AUTHORIZATION, format!("Token {}", self.token))
        }
    }
}

impl Sink for InfluxSink {
    async fn ready(&self) -> Result<(), SinkError> {
        let response = self
            .client
            .get(self.ready_url.clone())
            .send()
            .await
            .map_err(|e| SinkError::Unavailable(format!("{}: {}", self.ready_url, e)))?;
        check_status(response).await
    }

    async fn write(&self, point: &Point) -> Result<(), SinkError> {
        let Some(body) = encode_point(point) else {
            debug!(measurement = %point.measurement, "Point has no encodable fields, skipping");
            return Ok(());
        };

        let request = self
            .client
            .post(self.write_url.clone())
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body);

        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(SinkError::transport)?;
        check_status(response).await
    }
}

async fn check_status(response: Response) -> Result<(), SinkError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let message = response.text().await.unwrap_or_default();
    Err(SinkError::Rejected {
        status: status.as_u16(),
        message,
    })
}

/// Parse `host` into a base URL. A bare `host:port` is treated as plain HTTP.
fn parse_endpoint(host: &str) -> Result<Url, InfluxError> {
    let invalid = |reason: &str| InfluxError::InvalidEndpoint {
        host: host.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = host.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty host"));
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    };

    let url = Url::parse(&with_scheme).map_err(|e| invalid(&e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(&format!("unsupported scheme '{}'", other))),
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host name"));
    }

    Ok(url)
}
