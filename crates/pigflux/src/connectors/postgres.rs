//! `PostgreSQL` connector.

use async_trait::async_trait;
use bigdecimal::{BigDecimal, ToPrimitive};
use sqlx::postgres::{PgConnectOptions, PgConnection, PgRow};
use sqlx::{Column, Connection, Row, TypeInfo};
use tracing::debug;

use super::{ColumnValue, QueryRow, SourceConnection, SourceConnector};
use crate::config::DataSourceDef;
use crate::error::{Error, Result};
use crate::point::FieldValue;

/// `PostgreSQL` source connector (driver `postgres`).
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresConnector;

#[async_trait]
impl SourceConnector for PostgresConnector {
    fn driver(&self) -> &'static str {
        "postgres"
    }

    async fn connect(&self, source: &DataSourceDef) -> Result<Box<dyn SourceConnection>> {
        let options = connect_options(source)?;
        debug!(
            "Connecting to PostgreSQL {}:{}/{}",
            options.get_host(),
            options.get_port(),
            options.get_database().unwrap_or_default()
        );
        let conn = PgConnection::connect_with(&options)
            .await
            .map_err(|e| Error::SourceConnection(format!("PostgreSQL: {e}")))?;
        Ok(Box::new(PostgresConnection { conn: Some(conn) }))
    }
}

fn connect_options(source: &DataSourceDef) -> Result<PgConnectOptions> {
    if let Some(ref dsn) = source.dsn {
        return dsn
            .parse()
            .map_err(|e| Error::SourceConnection(format!("invalid PostgreSQL dsn: {e}")));
    }

    let mut options = PgConnectOptions::new();
    if let Some(ref host) = source.host {
        options = options.host(host);
    }
    if let Some(port) = source.port {
        options = options.port(port);
    }
    if let Some(ref user) = source.user {
        options = options.username(user);
    }
    if let Some(ref password) = source.password {
        options = options.password(password);
    }
    if let Some(ref database) = source.database {
        options = options.database(database);
    }
    Ok(options)
}

struct PostgresConnection {
    conn: Option<PgConnection>,
}

#[async_trait]
impl SourceConnection for PostgresConnection {
    async fn fetch_one(&mut self, sql: &str) -> Result<Option<QueryRow>> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| Error::SourceConnection("PostgreSQL connection is closed".into()))?;
        let row = sqlx::query(sql)
            .fetch_optional(conn)
            .await
            .map_err(|e| Error::Query(format!("PostgreSQL: {e}")))?;
        Ok(row.as_ref().map(decode_row))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
        }
        Ok(())
    }
}

fn decode_row(row: &PgRow) -> QueryRow {
    let mut result = QueryRow::default();
    for column in row.columns() {
        result.columns.push(column.name().to_string());
        result
            .values
            .push(decode_value(row, column.ordinal(), column.type_info().name()));
    }
    result
}

fn decode_value(row: &PgRow, idx: usize, type_name: &str) -> ColumnValue {
    decode_first!(row, idx,
        i64 => |v| Some(FieldValue::Integer(v)),
        i32 => |v| Some(FieldValue::Integer(v.into())),
        i16 => |v| Some(FieldValue::Integer(v.into())),
        f64 => |v| Some(FieldValue::Float(v)),
        f32 => |v| Some(FieldValue::Float(v.into())),
        BigDecimal => |v: BigDecimal| v.to_f64().map(FieldValue::Float),
        bool => |v| Some(FieldValue::Boolean(v)),
        String => |v| Some(FieldValue::String(v)),
    );
    ColumnValue::Unsupported(type_name.to_string())
}
