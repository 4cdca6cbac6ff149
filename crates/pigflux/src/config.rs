//! Configuration model for one pigflux config document.
//!
//! A document declares data sources (`databases`), legacy InfluxDB 1.x sinks
//! (`influxes`), InfluxDB 2.x sinks (`influxes2`) and the `tests` to run.
//! Every section is an ordered map: declaration order decides tie-breaking
//! between tests of equal `order` and the order in which sinks are written.

use std::collections::BTreeMap;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};

/// Execution order of a test that never sets `order`.
pub const DEFAULT_ORDER: i64 = 100;

/// Driver used when a data source does not name one.
pub const DEFAULT_DRIVER: &str = "postgres";

/// One parsed configuration document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Data sources keyed by name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub databases: IndexMap<String, DataSourceDef>,
    /// InfluxDB 1.x sinks keyed by name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub influxes: IndexMap<String, LegacySinkDef>,
    /// InfluxDB 2.x sinks keyed by name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub influxes2: IndexMap<String, ModernSinkDef>,
    /// Test definitions keyed by name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tests: IndexMap<String, TestDef>,
}

/// Connection parameters of a relational data source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataSourceDef {
    /// Driver name, looked up in the connector registry.
    #[serde(default = "default_driver")]
    pub driver: String,
    /// Full connection URL. Takes precedence over the discrete fields.
    pub dsn: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl DataSourceDef {
    /// A data source for `driver` with no connection parameters set.
    #[must_use]
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            dsn: None,
            host: None,
            port: None,
            database: None,
            user: None,
            password: None,
        }
    }
}

/// InfluxDB 1.x sink (line protocol over `/write`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LegacySinkDef {
    pub host: String,
    #[serde(default = "default_influx_port")]
    pub port: u16,
    #[serde(default)]
    pub ssl: bool,
    #[serde(default = "default_true")]
    pub verify_ssl: bool,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// InfluxDB 2.x sink (bucket/org/token).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModernSinkDef {
    pub url: String,
    pub org: String,
    pub bucket: String,
    pub token: String,
}

/// A sink definition from either protocol family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkTarget<'a> {
    /// Declared under `influxes`.
    Legacy(&'a LegacySinkDef),
    /// Declared under `influxes2`.
    Modern(&'a ModernSinkDef),
}

impl SinkTarget<'_> {
    /// Human readable protocol label used in log lines.
    #[must_use]
    pub fn protocol(&self) -> &'static str {
        match self {
            Self::Legacy(_) => "influxdb v1",
            Self::Modern(_) => "influxdb v2",
        }
    }
}

/// A test definition as written in the document.
///
/// All fields except `is_template` and `inherit_from` are inheritable: `None`
/// means "not set here", and the resolver fills it from the ancestor chain.
/// An explicitly empty list or map counts as set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestDef {
    /// Data sources to run the query on.
    pub databases: Option<Vec<String>>,
    /// Sinks to send the resulting points to.
    pub influxes: Option<Vec<String>>,
    pub measurement: Option<String>,
    /// Static tags added to every point.
    pub tags: Option<BTreeMap<String, String>>,
    /// Result columns to turn into fields, in order.
    pub fields: Option<Vec<String>>,
    pub sql: Option<String>,
    /// Ascending execution order; [`DEFAULT_ORDER`] when never set.
    pub order: Option<i64>,
    /// Templates are only inherited from, never executed.
    #[serde(default)]
    pub is_template: bool,
    pub inherit_from: Option<String>,
}

/// Borrowed view of a test whose required fields are all present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTest<'a> {
    pub name: &'a str,
    pub databases: &'a [String],
    pub influxes: &'a [String],
    pub measurement: &'a str,
    pub tags: &'a BTreeMap<String, String>,
    pub fields: &'a [String],
    pub sql: &'a str,
    pub order: i64,
}

impl TestDef {
    /// Copy every inheritable field that is unset here from `parent`.
    pub fn inherit(&mut self, parent: &TestDef) {
        fill(&mut self.databases, &parent.databases);
        fill(&mut self.influxes, &parent.influxes);
        fill(&mut self.measurement, &parent.measurement);
        fill(&mut self.tags, &parent.tags);
        fill(&mut self.fields, &parent.fields);
        fill(&mut self.sql, &parent.sql);
        fill(&mut self.order, &parent.order);
    }

    /// First required field that is still unset. `order` is never reported
    /// since it falls back to [`DEFAULT_ORDER`].
    #[must_use]
    pub fn missing_field(&self) -> Option<&'static str> {
        if self.databases.is_none() {
            Some("databases")
        } else if self.influxes.is_none() {
            Some("influxes")
        } else if self.measurement.is_none() {
            Some("measurement")
        } else if self.tags.is_none() {
            Some("tags")
        } else if self.fields.is_none() {
            Some("fields")
        } else if self.sql.is_none() {
            Some("sql")
        } else {
            None
        }
    }

    /// Execution order with the default applied.
    #[must_use]
    pub fn effective_order(&self) -> i64 {
        self.order.unwrap_or(DEFAULT_ORDER)
    }

    /// Borrow this test as a [`ResolvedTest`].
    ///
    /// Fails with [`Error::MissingRequiredField`] if a required field is unset.
    pub fn resolved<'a>(&'a self, name: &'a str) -> Result<ResolvedTest<'a>> {
        let missing = |field| Error::MissingRequiredField {
            test: name.to_string(),
            field,
        };
        Ok(ResolvedTest {
            name,
            databases: self.databases.as_deref().ok_or_else(|| missing("databases"))?,
            influxes: self.influxes.as_deref().ok_or_else(|| missing("influxes"))?,
            measurement: self.measurement.as_deref().ok_or_else(|| missing("measurement"))?,
            tags: self.tags.as_ref().ok_or_else(|| missing("tags"))?,
            fields: self.fields.as_deref().ok_or_else(|| missing("fields"))?,
            sql: self.sql.as_deref().ok_or_else(|| missing("sql"))?,
            order: self.effective_order(),
        })
    }
}

fn fill<T: Clone>(slot: &mut Option<T>, parent: &Option<T>) {
    if slot.is_none() {
        slot.clone_from(parent);
    }
}

impl AppConfig {
    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a YAML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigFile(format!("cannot read {}: {e}", path.display())))?;
        serde_yaml::from_str(&text)
            .map_err(|e| Error::ConfigFile(format!("cannot parse {}: {e}", path.display())))
    }

    /// Look up a sink by name in both families, legacy first.
    #[must_use]
    pub fn sink(&self, name: &str) -> Option<SinkTarget<'_>> {
        self.influxes
            .get(name)
            .map(SinkTarget::Legacy)
            .or_else(|| self.influxes2.get(name).map(SinkTarget::Modern))
    }

    /// All sinks: legacy ones in declaration order, then modern ones.
    pub fn sinks(&self) -> impl Iterator<Item = (&str, SinkTarget<'_>)> {
        let legacy = self
            .influxes
            .iter()
            .map(|(name, def)| (name.as_str(), SinkTarget::Legacy(def)));
        let modern = self
            .influxes2
            .iter()
            .map(|(name, def)| (name.as_str(), SinkTarget::Modern(def)));
        legacy.chain(modern)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn default_driver() -> String {
    DEFAULT_DRIVER.to_string()
}

fn default_influx_port() -> u16 {
    8086
}

fn default_true() -> bool {
    true
}
