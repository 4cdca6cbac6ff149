//! Error types for pigflux.

use thiserror::Error;

/// Broad classification of an [`Error`].
///
/// Configuration and execution errors abort the process. Dispatch errors are
/// isolated per sink unless halt-on-send-error is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed configuration; retrying will not help.
    Configuration,
    /// A query or data source connection failed during a pass.
    Execution,
    /// A sink could not be written.
    Dispatch,
    /// The process was asked to stop in the middle of a pass.
    Interrupted,
}

/// Pigflux error types.
#[derive(Error, Debug)]
pub enum Error {
    /// A test's `inherit_from` chain revisits a test.
    #[error("Circular reference tests.{test}.inherit_from={parent} (chain={})", .chain.join(" -> "))]
    CircularReference {
        /// Test whose parent closes the cycle.
        test: String,
        /// The parent that was already visited.
        parent: String,
        /// Tests visited before the cycle was found.
        chain: Vec<String>,
    },

    /// A test inherits from a test that does not exist.
    #[error("Invalid reference tests.{test}.inherit_from={parent}")]
    InvalidReference {
        /// Test holding the reference.
        test: String,
        /// Missing parent name.
        parent: String,
    },

    /// A non-template test is missing a value after inheritance.
    #[error("tests.{test}.{field} is required")]
    MissingRequiredField {
        /// Test name.
        test: String,
        /// Field name.
        field: &'static str,
    },

    /// A test references an undeclared data source.
    #[error("{test}: invalid database {database}")]
    InvalidDatabaseReference {
        /// Test name.
        test: String,
        /// Undeclared data source name.
        database: String,
    },

    /// A test references an undeclared sink.
    #[error("{test}: invalid influx {sink}")]
    InvalidSinkReference {
        /// Test name.
        test: String,
        /// Undeclared sink name.
        sink: String,
    },

    /// A data source names a driver that is not registered.
    #[error("database {database}: unknown driver {driver} (valid drivers: {})", .valid.join(", "))]
    UnknownDriver {
        /// Data source name.
        database: String,
        /// Requested driver.
        driver: String,
        /// Registered driver names.
        valid: Vec<String>,
    },

    /// A configuration key is not identifier-like.
    #[error("invalid {section} name: {name:?}")]
    InvalidIdentifier {
        /// Config section (`database`, `influx`, `influx2`, `test`).
        section: &'static str,
        /// Offending name.
        name: String,
    },

    /// The same sink name is declared by both sink families.
    #[error("sink {0} is declared in both influxes and influxes2")]
    DuplicateSink(String),

    /// A non-template test has an empty data source list.
    #[error("test {0}: no databases specified")]
    NoDataSources(String),

    /// A non-template test has an empty sink list.
    #[error("test {0}: no influxes specified")]
    NoSinks(String),

    /// A config file could not be found or read.
    #[error("Configuration error: {0}")]
    ConfigFile(String),

    /// Connection error to a data source.
    #[error("Source connection error: {0}")]
    SourceConnection(String),

    /// Query execution error.
    #[error("Query error: {0}")]
    Query(String),

    /// A query returned no rows.
    #[error("test {test}: query on database {database} returned no rows")]
    EmptyResult {
        /// Test name.
        test: String,
        /// Data source name.
        database: String,
    },

    /// A declared field is not a column of the query result.
    #[error("test {test}: field {field} is not a column of the result on database {database}")]
    MissingColumn {
        /// Test name.
        test: String,
        /// Declared field name.
        field: String,
        /// Data source name.
        database: String,
    },

    /// A result column has a type that cannot become a field value.
    #[error("column {column}: unsupported type {type_name}")]
    UnsupportedColumnType {
        /// Column name.
        column: String,
        /// Database type name.
        type_name: String,
    },

    /// A point is routed to a sink that is not declared.
    #[error("Invalid influx name: {0}")]
    UnknownSink(String),

    /// Sink write failure.
    #[error("Cannot send points to {sink}: {message}")]
    SinkWrite {
        /// Sink name.
        sink: String,
        /// Failure detail.
        message: String,
    },

    /// Interrupted by a signal while a pass was running.
    #[error("interrupted while a pass was running")]
    Interrupted,

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Database driver error.
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),
}

impl Error {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CircularReference { .. }
            | Self::InvalidReference { .. }
            | Self::MissingRequiredField { .. }
            | Self::InvalidDatabaseReference { .. }
            | Self::InvalidSinkReference { .. }
            | Self::UnknownDriver { .. }
            | Self::InvalidIdentifier { .. }
            | Self::DuplicateSink(_)
            | Self::NoDataSources(_)
            | Self::NoSinks(_)
            | Self::ConfigFile(_)
            | Self::Yaml(_)
            | Self::Io(_) => ErrorKind::Configuration,
            Self::SourceConnection(_)
            | Self::Query(_)
            | Self::EmptyResult { .. }
            | Self::MissingColumn { .. }
            | Self::UnsupportedColumnType { .. }
            | Self::Sql(_) => ErrorKind::Execution,
            Self::UnknownSink(_) | Self::SinkWrite { .. } | Self::Http(_) => ErrorKind::Dispatch,
            Self::Interrupted => ErrorKind::Interrupted,
        }
    }

    /// Render this error followed by its `source()` chain, one cause per line.
    #[must_use]
    pub fn report(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str("\n  caused by: ");
            out.push_str(&cause.to_string());
            source = cause.source();
        }
        out
    }
}

/// Result type alias for pigflux operations.
pub type Result<T> = std::result::Result<T, Error>;
