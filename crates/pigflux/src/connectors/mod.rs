//! Data source connectors.
//!
//! A [`SourceConnector`] turns a [`DataSourceDef`] into a live
//! [`SourceConnection`]. Connectors are looked up by driver name in a
//! [`ConnectorRegistry`]; the built-in ones are backed by sqlx and gated by
//! the `postgres`, `mysql` and `sqlite` features.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::DataSourceDef;
use crate::error::Result;
use crate::point::FieldValue;

/// Try `row.try_get::<Option<T>>` for each listed type in turn and return the
/// first one that decodes as a [`ColumnValue`]. A SQL NULL decodes as
/// [`ColumnValue::Null`] on the first attempt.
#[cfg(any(feature = "postgres", feature = "mysql", feature = "sqlite"))]
macro_rules! decode_first {
    ($row:expr, $idx:expr, $( $ty:ty => $map:expr ),+ $(,)?) => {
        $(
            if let Ok(value) = $row.try_get::<Option<$ty>, _>($idx) {
                return $crate::connectors::ColumnValue::from(value.and_then($map));
            }
        )+
    };
}

#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "postgres")]
mod postgres;
#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "mysql")]
pub use mysql::MySqlConnector;
#[cfg(feature = "postgres")]
pub use postgres::PostgresConnector;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteConnector;

/// One decoded result cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Value(FieldValue),
    /// SQL NULL.
    Null,
    /// The database type has no field value mapping. Only an error when the
    /// column is a declared field.
    Unsupported(String),
}

impl From<Option<FieldValue>> for ColumnValue {
    fn from(value: Option<FieldValue>) -> Self {
        value.map_or(Self::Null, Self::Value)
    }
}

/// Column names and decoded values of one result row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRow {
    pub columns: Vec<String>,
    pub values: Vec<ColumnValue>,
}

impl QueryRow {
    /// Build a row from `(column, value)` pairs.
    #[must_use]
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ColumnValue>,
    {
        let (columns, values) = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .unzip();
        Self { columns, values }
    }

    /// Map column name to position. On duplicate names the first one wins.
    #[must_use]
    pub fn column_index(&self) -> HashMap<&str, usize> {
        let mut index = HashMap::with_capacity(self.columns.len());
        for (pos, name) in self.columns.iter().enumerate() {
            index.entry(name.as_str()).or_insert(pos);
        }
        index
    }
}

/// Opens connections for one driver.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Driver name used in the `driver` key of a data source.
    fn driver(&self) -> &'static str;

    /// Open a connection to `source`.
    async fn connect(&self, source: &DataSourceDef) -> Result<Box<dyn SourceConnection>>;
}

/// A live data source connection.
#[async_trait]
pub trait SourceConnection: Send {
    /// Execute a static query and return its first row, if any. Remaining
    /// rows are discarded.
    async fn fetch_one(&mut self, sql: &str) -> Result<Option<QueryRow>>;

    /// Close the connection. Further calls to `fetch_one` fail.
    async fn close(&mut self) -> Result<()>;
}

/// Connectors keyed by driver name.
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    connectors: BTreeMap<String, Arc<dyn SourceConnector>>,
}

impl ConnectorRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every connector compiled into this build.
    #[must_use]
    pub fn with_default_drivers() -> Self {
        #[allow(unused_mut)]
        let mut registry = Self::new();
        #[cfg(feature = "postgres")]
        registry.register(PostgresConnector);
        #[cfg(feature = "mysql")]
        registry.register(MySqlConnector);
        #[cfg(feature = "sqlite")]
        registry.register(SqliteConnector);
        registry
    }

    /// Register a connector under its driver name, replacing any previous one.
    pub fn register(&mut self, connector: impl SourceConnector + 'static) {
        self.connectors
            .insert(connector.driver().to_string(), Arc::new(connector));
    }

    /// Whether `driver` is registered.
    #[must_use]
    pub fn contains(&self, driver: &str) -> bool {
        self.connectors.contains_key(driver)
    }

    /// Registered driver names, sorted.
    #[must_use]
    pub fn drivers(&self) -> Vec<String> {
        self.connectors.keys().cloned().collect()
    }

    /// Connector for `driver`.
    #[must_use]
    pub fn get(&self, driver: &str) -> Option<&dyn SourceConnector> {
        self.connectors.get(driver).map(|connector| &**connector)
    }
}

impl std::fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorRegistry")
            .field("drivers", &self.drivers())
            .finish()
    }
}
