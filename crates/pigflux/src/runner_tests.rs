//! Tests for test ordering, execution and point shaping.

use std::time::{Duration, SystemTime};

use super::config::AppConfig;
use super::connectors::{ColumnValue, QueryRow};
use super::error::Error;
use super::point::{FieldValue, DATA_SOURCE_TAG, ELAPSED_FIELD};
use super::resolver::resolve_all;
use super::runner::*;
use super::test_support::{int_row, FakeConnector};

fn resolved(yaml: &str) -> AppConfig {
    let mut config = AppConfig::from_yaml_str(yaml).unwrap();
    resolve_all(&mut config.tests).unwrap();
    config
}

const ORDERED: &str = r"
databases:
  db1: {driver: fake, database: one}
  db2: {driver: fake, database: two}
influxes:
  s1: {host: h, database: d}
tests:
  base:
    is_template: true
    databases: [db1]
    influxes: [s1]
    tags: {}
    fields: [x]
    order: 1
  t_a:
    inherit_from: base
    measurement: a
    sql: SELECT 'a'
    order: 30
  t_b:
    inherit_from: base
    measurement: b
    sql: SELECT 'b'
    order: 10
  t_c:
    inherit_from: base
    measurement: c
    sql: SELECT 'c'
    order: 20
  t_d:
    inherit_from: base
    measurement: d
    sql: SELECT 'd'
    order: 10
";

#[test]
fn test_execution_order_is_stable_by_order() {
    let config = resolved(ORDERED);
    let names: Vec<_> = execution_order(&config)
        .unwrap()
        .iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["t_b", "t_d", "t_c", "t_a"]);
}

#[test]
fn test_default_order_sorts_last() {
    let config = resolved(&ORDERED.replace("    order: 30\n", ""));
    let order: Vec<_> = execution_order(&config)
        .unwrap()
        .iter()
        .map(|t| (t.name, t.order))
        .collect();
    // t_a inherits order 1 from the template.
    assert_eq!(order[0], ("t_a", 1));

    let config = resolved(&ORDERED.replace("    order: 1\n", "").replace("    order: 30\n", ""));
    let last = *execution_order(&config).unwrap().last().unwrap();
    assert_eq!((last.name, last.order), ("t_a", 100));
}

#[tokio::test]
async fn test_run_tests_in_order_with_one_point_per_database() {
    let yaml = ORDERED.replace(
        "  t_c:\n    inherit_from: base\n",
        "  t_c:\n    inherit_from: base\n    databases: [db2, db1]\n",
    );
    let config = resolved(&yaml);
    let fake = ["a", "b", "c", "d"]
        .into_iter()
        .fold(FakeConnector::new(), |fake, m| {
            fake.with_row(&format!("SELECT '{m}'"), int_row(&[("x", 1)]))
        });

    let points = run_tests(&config, &fake.registry()).await.unwrap();
    let shape: Vec<_> = points
        .iter()
        .map(|p| {
            (
                p.point.measurement.as_str(),
                p.point.tags[DATA_SOURCE_TAG].as_str(),
            )
        })
        .collect();
    assert_eq!(
        shape,
        vec![("b", "db1"), ("d", "db1"), ("c", "db2"), ("c", "db1"), ("a", "db1")]
    );
    assert!(points.iter().all(|p| p.sinks == vec!["s1".to_string()]));

    let queried: Vec<_> = fake.queries().into_iter().map(|(db, _)| db).collect();
    assert_eq!(queried, vec!["one", "one", "two", "one", "one"]);
    assert_eq!(fake.open_connections(), 0);
}

#[tokio::test]
async fn test_first_failure_aborts_the_run() {
    let config = resolved(ORDERED);
    let fake = FakeConnector::new()
        .with_row("SELECT 'b'", int_row(&[("x", 1)]))
        .failing_query("SELECT 'd'");

    let err = run_tests(&config, &fake.registry()).await.unwrap_err();
    assert!(matches!(err, Error::Query(_)));
    // t_c and t_a never ran.
    assert_eq!(fake.queries().len(), 2);
    assert_eq!(fake.open_connections(), 0);
}

#[tokio::test]
async fn test_connection_failure_is_fatal() {
    let config = resolved(ORDERED);
    let fake = FakeConnector::new().failing_source("one");
    let err = run_tests(&config, &fake.registry()).await.unwrap_err();
    assert!(matches!(err, Error::SourceConnection(_)));
    assert!(fake.queries().is_empty());
}

#[tokio::test]
async fn test_empty_result_is_an_error() {
    let config = resolved(ORDERED);
    let source = &config.databases["db1"];
    let fake = FakeConnector::new().with_empty_result("SELECT 0");

    let err = query_source(&fake.registry(), "t", "db1", source, "SELECT 0")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "test t: query on database db1 returned no rows");
    assert_eq!(fake.open_connections(), 0);
}

#[tokio::test]
async fn test_query_source_returns_first_row() {
    let config = resolved(ORDERED);
    let fake = FakeConnector::new().with_row("SELECT 2", int_row(&[("x", 2), ("y", 3)]));
    let fetch = query_source(&fake.registry(), "t", "db1", &config.databases["db1"], "SELECT 2")
        .await
        .unwrap();
    assert_eq!(fetch.row, int_row(&[("x", 2), ("y", 3)]));
    assert!(fetch.fetched_at <= SystemTime::now());
}

fn fetch_of(row: QueryRow) -> Fetch {
    Fetch {
        row,
        elapsed: Duration::from_millis(1500),
        fetched_at: SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000),
    }
}

const SHAPING: &str = r"
databases:
  db1: {driver: fake}
influxes:
  s1: {host: h, database: d}
tests:
  t:
    databases: [db1]
    influxes: [s1]
    measurement: m
    tags: {env: prod}
    fields: [x, y]
    sql: SELECT 1
";

#[test]
fn test_build_point_shapes_row() {
    let config = resolved(SHAPING);
    let test = config.tests["t"].resolved("t").unwrap();
    let row = QueryRow::from_pairs([
        ("y", Some(FieldValue::Float(2.5))),
        ("ignored", Some(FieldValue::Integer(9))),
        ("x", Some(FieldValue::Integer(1))),
    ]);
    let fetch = fetch_of(row);

    let point = build_point(&test, "db1", &fetch).unwrap();
    assert_eq!(point.measurement, "m");
    assert_eq!(point.timestamp, fetch.fetched_at);
    assert_eq!(point.tags.len(), 2);
    assert_eq!(point.tags["env"], "prod");
    assert_eq!(point.tags[DATA_SOURCE_TAG], "db1");
    assert_eq!(point.fields["x"], FieldValue::Integer(1));
    assert_eq!(point.fields["y"], FieldValue::Float(2.5));
    assert_eq!(point.fields[ELAPSED_FIELD], FieldValue::Float(1.5));
    assert!(!point.fields.contains_key("ignored"));
}

#[test]
fn test_build_point_missing_column() {
    let config = resolved(SHAPING);
    let test = config.tests["t"].resolved("t").unwrap();
    let fetch = fetch_of(int_row(&[("x", 1)]));

    let err = build_point(&test, "db1", &fetch).unwrap_err();
    assert!(matches!(
        err,
        Error::MissingColumn { ref field, ref database, .. } if field == "y" && database == "db1"
    ));
}

#[test]
fn test_build_point_omits_null() {
    let config = resolved(SHAPING);
    let test = config.tests["t"].resolved("t").unwrap();
    let fetch = fetch_of(QueryRow::from_pairs([
        ("x", None),
        ("y", Some(FieldValue::Boolean(true))),
    ]));

    let point = build_point(&test, "db1", &fetch).unwrap();
    assert!(!point.fields.contains_key("x"));
    assert_eq!(point.fields["y"], FieldValue::Boolean(true));
    assert!(point.fields.contains_key(ELAPSED_FIELD));
}

#[test]
fn test_unsupported_column_only_matters_when_declared() {
    let config = resolved(SHAPING);
    let test = config.tests["t"].resolved("t").unwrap();
    let fetch = fetch_of(QueryRow::from_pairs([
        ("ts", ColumnValue::Unsupported("TIMESTAMPTZ".to_string())),
        ("x", ColumnValue::Value(FieldValue::Integer(1))),
        ("y", ColumnValue::Value(FieldValue::Integer(2))),
    ]));
    let point = build_point(&test, "db1", &fetch).unwrap();
    assert!(!point.fields.contains_key("ts"));
    assert_eq!(point.fields["x"], FieldValue::Integer(1));

    let fetch = fetch_of(QueryRow::from_pairs([
        ("x", ColumnValue::Value(FieldValue::Integer(1))),
        ("y", ColumnValue::Unsupported("INTERVAL".to_string())),
    ]));
    let err = build_point(&test, "db1", &fetch).unwrap_err();
    assert!(matches!(
        err,
        Error::UnsupportedColumnType { ref column, ref type_name } if column == "y" && type_name == "INTERVAL"
    ));
}

#[test]
fn test_reserved_tag_cannot_be_overridden() {
    let config = resolved(&SHAPING.replace("{env: prod}", "{database_name: spoofed}"));
    let test = config.tests["t"].resolved("t").unwrap();
    let fetch = fetch_of(int_row(&[("x", 1), ("y", 2)]));

    let point = build_point(&test, "db1", &fetch).unwrap();
    assert_eq!(point.tags.len(), 1);
    assert_eq!(point.tags[DATA_SOURCE_TAG], "db1");
}
