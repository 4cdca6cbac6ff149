//! Test execution: order the resolved tests, query every data source and
//! shape each result row into a [`Point`].
//!
//! Execution is strictly sequential. The first connection or query error
//! aborts the run and no point of the pass is returned.

use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, info, warn};

use crate::config::{AppConfig, DataSourceDef, ResolvedTest};
use crate::connectors::{ColumnValue, ConnectorRegistry, QueryRow};
use crate::error::{Error, Result};
use crate::point::{FieldValue, Point, RoutedPoint, DATA_SOURCE_TAG, ELAPSED_FIELD};

/// Non-template tests sorted by ascending `order`.
///
/// The sort is stable, so tests with equal order keep their declaration order.
pub fn execution_order(config: &AppConfig) -> Result<Vec<ResolvedTest<'_>>> {
    let mut tests = config
        .tests
        .iter()
        .filter(|(_, test)| !test.is_template)
        .map(|(name, test)| test.resolved(name))
        .collect::<Result<Vec<_>>>()?;
    tests.sort_by_key(|test| test.order);
    Ok(tests)
}

/// Run every test of a resolved, validated document.
///
/// Points come back in execution order: test by test, and within a test in
/// the order its data sources are listed.
pub async fn run_tests(config: &AppConfig, registry: &ConnectorRegistry) -> Result<Vec<RoutedPoint>> {
    let mut points = Vec::new();
    for test in execution_order(config)? {
        for database in test.databases {
            info!("Running test {} on database {}", test.name, database);
            let source = config.databases.get(database.as_str()).ok_or_else(|| {
                Error::InvalidDatabaseReference {
                    test: test.name.to_string(),
                    database: database.clone(),
                }
            })?;
            let fetch = query_source(registry, test.name, database, source, test.sql).await?;
            let point = build_point(&test, database, &fetch)?;
            debug!(
                "Test {} on database {}: fields={:?} tags={:?}",
                test.name, database, point.fields, point.tags
            );
            points.push(RoutedPoint {
                point,
                sinks: test.influxes.to_vec(),
            });
        }
    }
    Ok(points)
}

/// One fetched row with its timing.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetch {
    pub row: QueryRow,
    /// Wall-clock duration of the query.
    pub elapsed: Duration,
    pub fetched_at: SystemTime,
}

/// Open a connection, fetch the first row, and close the connection again
/// whether or not the query succeeded.
pub async fn query_source(
    registry: &ConnectorRegistry,
    test: &str,
    database: &str,
    source: &DataSourceDef,
    sql: &str,
) -> Result<Fetch> {
    let connector = registry
        .get(&source.driver)
        .ok_or_else(|| Error::UnknownDriver {
            database: database.to_string(),
            driver: source.driver.clone(),
            valid: registry.drivers(),
        })?;

    let mut conn = connector.connect(source).await?;
    let started = Instant::now();
    let fetched = conn.fetch_one(sql).await;
    let elapsed = started.elapsed();
    if let Err(e) = conn.close().await {
        warn!("could not close connection to database {}: {}", database, e);
    }

    let row = fetched?.ok_or_else(|| Error::EmptyResult {
        test: test.to_string(),
        database: database.to_string(),
    })?;
    Ok(Fetch {
        row,
        elapsed,
        fetched_at: SystemTime::now(),
    })
}

/// Shape a fetched row into a point.
///
/// Declared fields are looked up by column name; a field that is not a
/// column or has an unsupported type is an error, a NULL value is left out.
/// Other columns are ignored. `q_elapsed` is always added.
/// Static tags are copied and the data source tag is set last: a static tag
/// with the same key is dropped with a warning.
pub fn build_point(test: &ResolvedTest<'_>, database: &str, fetch: &Fetch) -> Result<Point> {
    let columns = fetch.row.column_index();

    let mut point = Point::new(test.measurement);
    point.timestamp = fetch.fetched_at;

    for field in test.fields {
        let pos = columns
            .get(field.as_str())
            .copied()
            .ok_or_else(|| Error::MissingColumn {
                test: test.name.to_string(),
                field: field.clone(),
                database: database.to_string(),
            })?;
        match fetch.row.values.get(pos) {
            Some(ColumnValue::Value(value)) => {
                point.fields.insert(field.clone(), value.clone());
            }
            Some(ColumnValue::Unsupported(type_name)) => {
                return Err(Error::UnsupportedColumnType {
                    column: field.clone(),
                    type_name: type_name.clone(),
                });
            }
            Some(ColumnValue::Null) | None => {
                debug!("Test {} field {} is NULL, omitted", test.name, field);
            }
        }
    }
    point.fields.insert(
        ELAPSED_FIELD.to_string(),
        FieldValue::Float(fetch.elapsed.as_secs_f64()),
    );

    point.tags.clone_from(test.tags);
    if let Some(overridden) = point.tags.get(DATA_SOURCE_TAG) {
        if overridden != database {
            warn!(
                "tests.{}.tags.{}={} is reserved, using {}",
                test.name, DATA_SOURCE_TAG, overridden, database
            );
        }
    }
    point
        .tags
        .insert(DATA_SOURCE_TAG.to_string(), database.to_string());

    Ok(point)
}
