//! In-memory connector and sink writer shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::{DataSourceDef, SinkTarget};
use crate::connectors::{ConnectorRegistry, QueryRow, SourceConnection, SourceConnector};
use crate::error::{Error, Result};
use crate::point::{FieldValue, Point};

pub const FAKE_DRIVER: &str = "fake";

#[derive(Default)]
struct FakeState {
    rows: HashMap<String, Option<QueryRow>>,
    failing_sql: HashSet<String>,
    failing_sources: HashSet<String>,
    queries: Vec<(String, String)>,
    opened: usize,
    closed: usize,
}

/// Connector answering canned rows keyed by SQL text.
///
/// Data sources are identified by their `database` key. Every query is
/// recorded as `(database, sql)`.
#[derive(Clone, Default)]
pub struct FakeConnector {
    state: Arc<Mutex<FakeState>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row(self, sql: &str, row: QueryRow) -> Self {
        self.state.lock().unwrap().rows.insert(sql.to_string(), Some(row));
        self
    }

    pub fn with_empty_result(self, sql: &str) -> Self {
        self.state.lock().unwrap().rows.insert(sql.to_string(), None);
        self
    }

    pub fn failing_query(self, sql: &str) -> Self {
        self.state.lock().unwrap().failing_sql.insert(sql.to_string());
        self
    }

    pub fn failing_source(self, database: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .failing_sources
            .insert(database.to_string());
        self
    }

    pub fn queries(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().queries.clone()
    }

    /// Connections opened and not closed yet.
    pub fn open_connections(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.opened - state.closed
    }

    pub fn registry(&self) -> ConnectorRegistry {
        let mut registry = ConnectorRegistry::new();
        registry.register(self.clone());
        registry
    }
}

#[async_trait]
impl SourceConnector for FakeConnector {
    fn driver(&self) -> &'static str {
        FAKE_DRIVER
    }

    async fn connect(&self, source: &DataSourceDef) -> Result<Box<dyn SourceConnection>> {
        let database = source.database.clone().unwrap_or_default();
        let mut state = self.state.lock().unwrap();
        if state.failing_sources.contains(&database) {
            return Err(Error::SourceConnection(format!("{database} is down")));
        }
        state.opened += 1;
        Ok(Box::new(FakeConnection {
            state: Arc::clone(&self.state),
            database,
            open: true,
        }))
    }
}

struct FakeConnection {
    state: Arc<Mutex<FakeState>>,
    database: String,
    open: bool,
}

#[async_trait]
impl SourceConnection for FakeConnection {
    async fn fetch_one(&mut self, sql: &str) -> Result<Option<QueryRow>> {
        if !self.open {
            return Err(Error::SourceConnection("connection is closed".into()));
        }
        let mut state = self.state.lock().unwrap();
        state.queries.push((self.database.clone(), sql.to_string()));
        if state.failing_sql.contains(sql) {
            return Err(Error::Query(format!("syntax error in {sql}")));
        }
        state
            .rows
            .get(sql)
            .cloned()
            .ok_or_else(|| Error::Query(format!("unexpected query {sql}")))
    }

    async fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            self.state.lock().unwrap().closed += 1;
        }
        Ok(())
    }
}

/// Single row with integer columns.
pub fn int_row(columns: &[(&str, i64)]) -> QueryRow {
    QueryRow::from_pairs(
        columns
            .iter()
            .map(|(name, value)| (*name, Some(FieldValue::Integer(*value)))),
    )
}

/// One recorded sink write.
#[derive(Debug, Clone)]
pub struct SinkCall {
    pub sink: String,
    pub protocol: &'static str,
    pub points: Vec<Point>,
}

/// Sink writer recording every batch it receives.
#[derive(Default)]
pub struct RecordingWriter {
    calls: Mutex<Vec<SinkCall>>,
    failing: HashSet<String>,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes to `sink` are recorded, then fail.
    pub fn failing(mut self, sink: &str) -> Self {
        self.failing.insert(sink.to_string());
        self
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sinks_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|call| call.sink).collect()
    }
}

#[async_trait]
impl crate::sinks::SinkWriter for RecordingWriter {
    async fn write(&self, name: &str, target: SinkTarget<'_>, points: &[&Point]) -> Result<()> {
        self.calls.lock().unwrap().push(SinkCall {
            sink: name.to_string(),
            protocol: target.protocol(),
            points: points.iter().map(|p| (*p).clone()).collect(),
        });
        if self.failing.contains(name) {
            return Err(Error::SinkWrite {
                sink: name.to_string(),
                message: "500 Internal Server Error - boom".to_string(),
            });
        }
        Ok(())
    }
}
