//! Sink clients.
//!
//! Both InfluxDB generations receive line protocol over HTTP; they only
//! differ in endpoint and authentication. Each write builds its own client,
//! so nothing is shared between sinks or passes.

mod influx_v1;
mod influx_v2;

use async_trait::async_trait;

pub use influx_v1::write_url as legacy_write_url;
pub use influx_v2::write_url as modern_write_url;

use crate::config::SinkTarget;
use crate::error::{Error, Result};
use crate::point::Point;

/// Writes one batch of points to one sink.
#[async_trait]
pub trait SinkWriter: Send + Sync {
    /// Write `points` to the sink `name` in a single call.
    async fn write(&self, name: &str, target: SinkTarget<'_>, points: &[&Point]) -> Result<()>;
}

/// [`SinkWriter`] talking to real InfluxDB servers over HTTP.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpSinkWriter;

#[async_trait]
impl SinkWriter for HttpSinkWriter {
    async fn write(&self, name: &str, target: SinkTarget<'_>, points: &[&Point]) -> Result<()> {
        match target {
            SinkTarget::Legacy(sink) => influx_v1::write(name, sink, points).await,
            SinkTarget::Modern(sink) => influx_v2::write(name, sink, points).await,
        }
    }
}

async fn check_response(name: &str, resp: reqwest::Response) -> Result<()> {
    if resp.status().is_success() {
        return Ok(());
    }
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(Error::SinkWrite {
        sink: name.to_string(),
        message: format!("{status} - {}", body.trim()),
    })
}
