//! MySQL / MariaDB connector.

use async_trait::async_trait;
use bigdecimal::{BigDecimal, ToPrimitive};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, Connection, Row, TypeInfo};
use tracing::debug;

use super::{ColumnValue, QueryRow, SourceConnection, SourceConnector};
use crate::config::DataSourceDef;
use crate::error::{Error, Result};
use crate::point::FieldValue;

/// MySQL source connector (driver `mysql`).
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlConnector;

#[async_trait]
impl SourceConnector for MySqlConnector {
    fn driver(&self) -> &'static str {
        "mysql"
    }

    async fn connect(&self, source: &DataSourceDef) -> Result<Box<dyn SourceConnection>> {
        let options = connect_options(source)?;
        debug!(
            "Connecting to MySQL {}:{}",
            source.host.as_deref().unwrap_or("localhost"),
            source.port.unwrap_or(3306)
        );
        let conn = MySqlConnection::connect_with(&options)
            .await
            .map_err(|e| Error::SourceConnection(format!("MySQL: {e}")))?;
        Ok(Box::new(MySqlSourceConnection { conn: Some(conn) }))
    }
}

fn connect_options(source: &DataSourceDef) -> Result<MySqlConnectOptions> {
    if let Some(ref dsn) = source.dsn {
        return dsn
            .parse()
            .map_err(|e| Error::SourceConnection(format!("invalid MySQL dsn: {e}")));
    }

    let mut options = MySqlConnectOptions::new();
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

struct MySqlSourceConnection {
    conn: Option<MySqlConnection>,
}

#[async_trait]
impl SourceConnection for MySqlSourceConnection {
    async fn fetch_one(&mut self, sql: &str) -> Result<Option<QueryRow>> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| Error::SourceConnection("MySQL connection is closed".into()))?;
        let row = sqlx::query(sql)
            .fetch_optional(conn)
            .await
            .map_err(|e| Error::Query(format!("MySQL: {e}")))?;
        Ok(row.as_ref().map(decode_row))
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(conn) = self.conn.take() {
            conn.close().await?;
        }
        Ok(())
    }
}

fn decode_row(row: &MySqlRow) -> QueryRow {
    let mut result = QueryRow::default();
    for column in row.columns() {
        result.columns.push(column.name().to_string());
        result
            .values
            .push(decode_value(row, column.ordinal(), column.type_info().name()));
    }
    result
}

// Unsigned values above i64::MAX lose precision as floats.
#[allow(clippy::cast_precision_loss)]
fn decode_value(row: &MySqlRow, idx: usize, type_name: &str) -> ColumnValue {
    decode_first!(row, idx,
        i64 => |v| Some(FieldValue::Integer(v)),
        i32 => |v| Some(FieldValue::Integer(v.into())),
        i16 => |v| Some(FieldValue::Integer(v.into())),
        i8 => |v| Some(FieldValue::Integer(v.into())),
        u64 => |v: u64| Some(i64::try_from(v).map_or(FieldValue::Float(v as f64), FieldValue::Integer)),
        u32 => |v| Some(FieldValue::Integer(v.into())),
        u16 => |v| Some(FieldValue::Integer(v.into())),
        u8 => |v| Some(FieldValue::Integer(v.into())),
        f64 => |v| Some(FieldValue::Float(v)),
        f32 => |v| Some(FieldValue::Float(v.into())),
        BigDecimal => |v: BigDecimal| v.to_f64().map(FieldValue::Float),
        bool => |v| Some(FieldValue::Boolean(v)),
        String => |v| Some(FieldValue::String(v)),
        Vec<u8> => |v: Vec<u8>| Some(FieldValue::String(String::from_utf8_lossy(&v).into_owned())),
    );
    ColumnValue::Unsupported(type_name.to_string())
}
