//! InfluxDB 1.x client (`/write?db=...`).

use tracing::debug;

use super::check_response;
use crate::config::LegacySinkDef;
use crate::error::Result;
use crate::line_protocol;
use crate::point::Point;

/// Write endpoint of a legacy sink. A `host` that already carries a scheme
/// is used as the base URL as is.
#[must_use]
pub fn write_url(sink: &LegacySinkDef) -> String {
    if sink.host.starts_with("http://") || sink.host.starts_with("https://") {
        return format!("{}/write", sink.host.trim_end_matches('/'));
    }
    let scheme = if sink.ssl { "https" } else { "http" };
    format!("{scheme}://{}:{}/write", sink.host, sink.port)
}

pub(super) async fn write(name: &str, sink: &LegacySinkDef, points: &[&Point]) -> Result<()> {
    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(!sink.verify_ssl)
        .build()?;

    let mut query = vec![("db", sink.database.as_str()), ("precision", "ns")];
    if let Some(ref username) = sink.username {
        query.push(("u", username.as_str()));
    }
    if let Some(ref password) = sink.password {
        query.push(("p", password.as_str()));
    }

    let url = write_url(sink);
    debug!("POST {} ({} point(s)) to {}", url, points.len(), name);
    let resp = client
        .post(&url)
        .query(&query)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(line_protocol::encode(points))
        .send()
        .await?;
    check_response(name, resp).await
}
