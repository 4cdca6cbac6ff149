//! InfluxDB 2.x client (`/api/v2/write?org=...&bucket=...`).

use tracing::debug;

use super::check_response;
use crate::config::ModernSinkDef;
use crate::error::Result;
use crate::line_protocol;
use crate::point::Point;

/// Write endpoint of a modern sink.
#[must_use]
pub fn write_url(sink: &ModernSinkDef) -> String {
    format!("{}/api/v2/write", sink.url.trim_end_matches('/'))
}

pub(super) async fn write(name: &str, sink: &ModernSinkDef, points: &[&Point]) -> Result<()> {
    let client = reqwest::Client::new();

    let url = write_url(sink);
    debug!("POST {} ({} point(s)) to {}", url, points.len(), name);
    let resp = client
        .post(&url)
        .query(&[
            ("org", sink.org.as_str()),
            ("bucket", sink.bucket.as_str()),
            ("precision", "ns"),
        ])
        .header("Authorization", format!("Token {}", sink.token))
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(line_protocol::encode(points))
        .send()
        .await?;
    check_response(name, resp).await
}
