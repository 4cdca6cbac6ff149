//! SQLite connector.
//!
//! `database` is the path of the database file; a `dsn` such as
//! `sqlite::memory:` or `sqlite://data/app.db?mode=ro` takes precedence.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, Row, TypeInfo};
use tracing::debug;

use super::{ColumnValue, QueryRow, SourceConnection, SourceConnector};
use crate::config::DataSourceDef;
use crate::error::{Error, Result};
use crate::point::FieldValue;

/// SQLite source connector (driver `sqlite`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteConnector;

#[async_trait]
impl SourceConnector for SqliteConnector {
    fn driver(&self) -> &'static str {
        "sqlite"
    }

    async fn connect(&self, source: &DataSourceDef) -> Result<Box<dyn SourceConnection>> {
        let options = connect_options(source)?;
        debug!(
            "Opening SQLite database {}",
            source.dsn.as_deref().or(source.database.as_deref()).unwrap_or_default()
        );
        let conn = SqliteConnection::connect_with(&options)
            .await
            .map_err(|e| Error::SourceConnection(format!("SQLite: {e}")))?;
        Ok(Box::new(SqliteSourceConnection { conn: Some(conn) }))
    }
}

fn connect_options(source: &DataSourceDef) -> Result<SqliteConnectOptions> {
    if let Some(ref dsn) = source.dsn {
        return dsn
            .parse()
            .map_err(|e| Error::SourceConnection(format!("invalid SQLite dsn: {e}")));
    }
    let path = source.database.as_deref().ok_or_else(|| {
        Error::SourceConnection("SQLite data source needs `database` or `dsn`".into())
    })?;
    Ok(SqliteConnectOptions::new().filename(path))
}

struct SqliteSourceConnection {
    conn: Option<SqliteConnection>,
}

#[async_trait]
impl SourceConnection for SqliteSourceConnection {
    async fn fetch_one(&mut self, sql: &str) -> Result<Option<QueryRow>> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| Error::SourceConnection("SQLite connection is closed".into()))?;
        let row = sqlx::query(sql)
            .fetch_optional(conn)
            .await
            .map_err(|e| Error::Query(format!("SQLite: {e}")))?;
        Ok(row.as_ref().map(decode_row))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
        }
        Ok(())
    }
}

fn decode_row(row: &SqliteRow) -> QueryRow {
    let mut result = QueryRow::default();
    for column in row.columns() {
        result.columns.push(column.name().to_string());
        result
            .values
            .push(decode_value(row, column.ordinal(), column.type_info().name()));
    }
    result
}

fn decode_value(row: &SqliteRow, idx: usize, type_name: &str) -> ColumnValue {
    decode_first!(row, idx,
        i64 => |v| Some(FieldValue::Integer(v)),
        f64 => |v| Some(FieldValue::Float(v)),
        bool => |v| Some(FieldValue::Boolean(v)),
        String => |v| Some(FieldValue::String(v)),
        Vec<u8> => |v: Vec<u8>| Some(FieldValue::String(String::from_utf8_lossy(&v).into_owned())),
    );
    ColumnValue::Unsupported(type_name.to_string())
}
