//! InfluxDB v2 sink for runstats.
//!
//! Points are encoded as line protocol and written through the v2 HTTP write
//! API, one request per point.
//!
//! ```ignore
//! let config = runstats::Config { token: "secret".into(), ..Default::default() };
//! let sink = runstats_influx::InfluxSink::new(&config)?;
//! let handle = runstats::start(token, config, sink).await?;
//! ```

pub mod encode;
pub mod error;
pub mod sink;

pub use encode::encode_point;
pub use error::InfluxError;
pub use sink::InfluxSink;
