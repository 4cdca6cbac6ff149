//! # pigflux
//!
//! Run SQL queries against relational databases on a fixed interval and send
//! the results to InfluxDB.
//!
//! One pass loads each config document, resolves `inherit_from` chains
//! between tests, validates references, runs the tests in `order` and fans
//! the resulting points out to their sinks:
//!
//! ```text
//! config -> resolver -> validator -> runner -> dispatcher -> sinks
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use pigflux::{AppConfig, ConnectorRegistry, HttpSinkWriter, PassContext};
//!
//! # async fn example() -> pigflux::Result<()> {
//! let config = AppConfig::load("pigflux.yml".as_ref())?;
//! let registry = ConnectorRegistry::with_default_drivers();
//! let ctx = PassContext {
//!     registry: &registry,
//!     writer: &HttpSinkWriter,
//!     halt_on_send_error: false,
//! };
//! let report = pigflux::run_config(config, ctx).await?;
//! println!("delivered: {:?}", report.delivered);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(test, allow(clippy::float_cmp))]

pub mod config;
pub mod connectors;
pub mod discovery;
pub mod dispatcher;
pub mod error;
pub mod line_protocol;
pub mod pass;
pub mod point;
pub mod resolver;
pub mod runner;
#[cfg(test)]
mod runner_tests;
pub mod sinks;
#[cfg(test)]
mod test_support;
pub mod validator;

pub use config::{AppConfig, DataSourceDef, LegacySinkDef, ModernSinkDef, SinkTarget, TestDef};
pub use connectors::{ColumnValue, ConnectorRegistry, QueryRow, SourceConnection, SourceConnector};
pub use dispatcher::{dispatch, DispatchReport};
pub use error::{Error, ErrorKind, Result};
pub use pass::{run_config, run_pass, PassContext, PassCount, PassLoop};
pub use point::{FieldValue, Point, RoutedPoint};
pub use sinks::{HttpSinkWriter, SinkWriter};

/// Example configuration printed by `pigflux --show-example`.
pub const EXAMPLE_CONFIG: &str = include_str!("../pigflux_example.yml");
