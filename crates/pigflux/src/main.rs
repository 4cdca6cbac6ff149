//! `pigflux` - run SQL tests on a schedule and send the results to InfluxDB.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pigflux::discovery::config_files;
use pigflux::{ConnectorRegistry, HttpSinkWriter, PassCount, PassLoop, EXAMPLE_CONFIG};

/// Run SQL queries against relational databases and send the results to
/// InfluxDB.
#[derive(Parser, Debug)]
#[command(name = "pigflux")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file, may be repeated
    #[arg(short, long = "config", value_name = "FILE", env = "PIGFLUX_CONFIG")]
    configs: Vec<PathBuf>,

    /// Directory whose .yml/.yaml files are all processed, may be repeated
    #[arg(long = "config-dir", value_name = "DIR", env = "PIGFLUX_CONFIG_DIR")]
    config_dirs: Vec<PathBuf>,

    /// Number of passes, negative runs forever
    #[arg(
        short = 'n',
        long,
        default_value = "1",
        allow_negative_numbers = true,
        value_parser = parse_count,
        env = "PIGFLUX_COUNT"
    )]
    count: PassCount,

    /// Seconds between the start of two passes
    #[arg(short, long, default_value = "10", value_parser = parse_wait, env = "PIGFLUX_WAIT")]
    wait: Duration,

    /// Only log errors (progress lines are logged by default)
    #[arg(short, long, conflicts_with_all = ["verbose", "debug"], env = "PIGFLUX_SILENT")]
    silent: bool,

    /// Also log point contents and connection details
    #[arg(short, long, conflicts_with = "debug", env = "PIGFLUX_VERBOSE")]
    verbose: bool,

    /// Debug logging for every crate, including the database and HTTP clients
    #[arg(short, long, env = "PIGFLUX_DEBUG")]
    debug: bool,

    /// Stop the pass at the first sink that cannot be written
    #[arg(long, env = "PIGFLUX_HALT_ON_SEND_ERROR")]
    halt_on_send_error: bool,

    /// Print an example config file and exit
    #[arg(long)]
    show_example: bool,
}

impl Args {
    fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.verbose {
            "warn,pigflux=debug"
        } else if self.silent {
            "error"
        } else {
            "warn,pigflux=info"
        }
    }
}

fn parse_count(raw: &str) -> Result<PassCount, String> {
    let count: i64 = raw.parse().map_err(|e| format!("{e}"))?;
    PassCount::from_count(count).ok_or_else(|| "count must not be 0".to_string())
}

fn parse_wait(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if !secs.is_finite() || secs <= 0.0 {
        return Err("wait must be a positive number of seconds".to_string());
    }
    Duration::try_from_secs_f64(secs).map_err(|e| e.to_string())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available: never resolve.
        std::future::pending::<()>().await;
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    if args.show_example {
        print!("{EXAMPLE_CONFIG}");
        return ExitCode::SUCCESS;
    }

    let filter = std::env::var("RUST_LOG")
        .map_or_else(|_| EnvFilter::new(args.log_level()), EnvFilter::new);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(args).await {
        Ok(passes) => {
            tracing::info!("Finished after {} pass(es)", passes);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<u64> {
    let files = config_files(&args.configs, &args.config_dirs)?;
    let pass_loop = PassLoop {
        files,
        count: args.count,
        wait: args.wait,
        halt_on_send_error: args.halt_on_send_error,
    };

    let registry = ConnectorRegistry::with_default_drivers();
    tracing::debug!("Available drivers: {}", registry.drivers().join(", "));

    pass_loop
        .run(&registry, &HttpSinkWriter, shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!(e.report()))
}
