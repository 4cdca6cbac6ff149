//! Fan-out of a pass's points to sinks.

use indexmap::IndexMap;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::point::{Point, RoutedPoint};
use crate::sinks::SinkWriter;

/// Outcome of one dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Sinks written successfully with the number of points sent.
    pub delivered: Vec<(String, usize)>,
    /// Sinks whose write failed and was logged.
    pub failed: Vec<String>,
}

/// Group points by sink and write one batch per sink.
///
/// Sinks are visited in declaration order, legacy sinks first; sinks without
/// points are skipped. A failed write is logged and the next sink is tried,
/// unless `halt_on_send_error` is set, in which case the error is returned
/// and the remaining sinks are not attempted.
///
/// A point routed to an undeclared sink is an error before anything is sent.
pub async fn dispatch(
    points: &[RoutedPoint],
    config: &AppConfig,
    writer: &dyn SinkWriter,
    halt_on_send_error: bool,
) -> Result<DispatchReport> {
    let batches = group_by_sink(points, config)?;

    let mut report = DispatchReport::default();
    for (name, target) in config.sinks() {
        let batch = match batches.get(name) {
            Some(batch) if !batch.is_empty() => batch,
            _ => continue,
        };

        info!(
            "Sending {} point(s) to {} {}",
            batch.len(),
            target.protocol(),
            name
        );
        match writer.write(name, target, batch).await {
            Ok(()) => report.delivered.push((name.to_string(), batch.len())),
            Err(e) if halt_on_send_error => return Err(e),
            Err(e) => {
                error!(
                    "Cannot send {} point(s) to {} {}: {}",
                    batch.len(),
                    target.protocol(),
                    name,
                    e.report()
                );
                report.failed.push(name.to_string());
            }
        }
    }
    Ok(report)
}

/// Batches keyed by sink name, in sink declaration order.
pub fn group_by_sink<'a>(
    points: &'a [RoutedPoint],
    config: &'a AppConfig,
) -> Result<IndexMap<&'a str, Vec<&'a Point>>> {
    let mut batches: IndexMap<&str, Vec<&Point>> =
        config.sinks().map(|(name, _)| (name, Vec::new())).collect();

    for routed in points {
        for sink in &routed.sinks {
            batches
                .get_mut(sink.as_str())
                .ok_or_else(|| Error::UnknownSink(sink.clone()))?
                .push(&routed.point);
        }
    }
    Ok(batches)
}
