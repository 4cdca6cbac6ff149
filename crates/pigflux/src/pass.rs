//! One pass over the config files, and the loop repeating it.

use std::future::Future;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::AppConfig;
use crate::connectors::ConnectorRegistry;
use crate::dispatcher::{dispatch, DispatchReport};
use crate::error::{Error, Result};
use crate::resolver::resolve_all;
use crate::runner::run_tests;
use crate::sinks::SinkWriter;
use crate::validator::validate;

/// Collaborators shared by every pass.
#[derive(Clone, Copy)]
pub struct PassContext<'a> {
    pub registry: &'a ConnectorRegistry,
    pub writer: &'a dyn SinkWriter,
    pub halt_on_send_error: bool,
}

/// Resolve, validate, run and dispatch one parsed document.
pub async fn run_config(mut config: AppConfig, ctx: PassContext<'_>) -> Result<DispatchReport> {
    resolve_all(&mut config.tests)?;
    validate(&config, ctx.registry)?;
    let points = run_tests(&config, ctx.registry).await?;
    dispatch(&points, &config, ctx.writer, ctx.halt_on_send_error).await
}

/// Load and process every config file in order. Files are re-read on every
/// call, so edits take effect on the next pass.
pub async fn run_pass(files: &[PathBuf], ctx: PassContext<'_>) -> Result<Vec<DispatchReport>> {
    let mut reports = Vec::with_capacity(files.len());
    for file in files {
        info!("Processing {}", file.display());
        let config = AppConfig::load(file)?;
        reports.push(run_config(config, ctx).await?);
    }
    Ok(reports)
}

/// How many passes to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassCount {
    Finite(u64),
    Forever,
}

impl PassCount {
    /// Map a command line count: negative runs forever, zero is rejected.
    #[must_use]
    pub fn from_count(count: i64) -> Option<Self> {
        match count {
            0 => None,
            n if n < 0 => Some(Self::Forever),
            n => u64::try_from(n).ok().map(Self::Finite),
        }
    }

    fn is_last(self, completed: u64) -> bool {
        matches!(self, Self::Finite(n) if completed >= n)
    }
}

/// Repeats [`run_pass`] with a fixed period.
#[derive(Debug, Clone)]
pub struct PassLoop {
    pub files: Vec<PathBuf>,
    pub count: PassCount,
    /// Target period between pass starts.
    pub wait: Duration,
    pub halt_on_send_error: bool,
}

impl PassLoop {
    /// Run passes until the count is reached, an error occurs, or `shutdown`
    /// completes. Returns the number of completed passes.
    ///
    /// After each pass except the last the loop sleeps for `wait` minus the
    /// pass duration. A shutdown during the sleep ends the loop normally; a
    /// shutdown during a pass abandons it and returns [`Error::Interrupted`].
    pub async fn run(
        &self,
        registry: &ConnectorRegistry,
        writer: &dyn SinkWriter,
        shutdown: impl Future<Output = ()>,
    ) -> Result<u64> {
        let ctx = PassContext {
            registry,
            writer,
            halt_on_send_error: self.halt_on_send_error,
        };
        tokio::pin!(shutdown);

        let mut completed = 0;
        while !self.count.is_last(completed) {
            if self.count != PassCount::Finite(1) {
                info!("Pass #{} started", completed + 1);
            }

            let started = Instant::now();
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    warn!("Pass #{} interrupted", completed + 1);
                    return Err(Error::Interrupted);
                }
                outcome = run_pass(&self.files, ctx) => {
                    outcome?;
                }
            }
            let elapsed = started.elapsed();
            completed += 1;

            let remaining = self.wait.saturating_sub(elapsed);
            if self.count.is_last(completed) || remaining.is_zero() {
                info!("Pass #{} elapsed {:.2} sec", completed, elapsed.as_secs_f64());
                continue;
            }

            info!(
                "Pass #{} elapsed {:.2} sec, waiting {:.2} sec for next.",
                completed,
                elapsed.as_secs_f64(),
                remaining.as_secs_f64()
            );
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("Stopping after pass #{}", completed);
                    break;
                }
                () = tokio::time::sleep(remaining) => {}
            }
        }
        Ok(completed)
    }
}
