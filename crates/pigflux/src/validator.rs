//! Cross-reference and naming checks run after inheritance resolution.

use crate::config::AppConfig;
use crate::connectors::ConnectorRegistry;
use crate::error::{Error, Result};

/// Run every configuration check against a resolved document.
///
/// Order: names, sink uniqueness, drivers, then per-test references.
/// The first violation is returned.
pub fn validate(config: &AppConfig, registry: &ConnectorRegistry) -> Result<()> {
    check_identifiers(config)?;
    check_sink_names(config)?;
    check_drivers(config, registry)?;
    validate_references(config)
}

/// Check that every non-template test only names declared data sources and
/// sinks. Template tests are skipped entirely.
pub fn validate_references(config: &AppConfig) -> Result<()> {
    for (name, test) in &config.tests {
        if test.is_template {
            continue;
        }
        let test = test.resolved(name)?;

        if test.databases.is_empty() {
            return Err(Error::NoDataSources(name.clone()));
        }
        if let Some(database) = test
            .databases
            .iter()
            .find(|db| !config.databases.contains_key(db.as_str()))
        {
            return Err(Error::InvalidDatabaseReference {
                test: name.clone(),
                database: database.clone(),
            });
        }

        if test.influxes.is_empty() {
            return Err(Error::NoSinks(name.clone()));
        }
        if let Some(sink) = test.influxes.iter().find(|s| config.sink(s).is_none()) {
            return Err(Error::InvalidSinkReference {
                test: name.clone(),
                sink: sink.clone(),
            });
        }
    }
    Ok(())
}

/// `[A-Za-z][A-Za-z0-9_]*`
#[must_use]
pub fn is_identifier_like(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_identifiers(config: &AppConfig) -> Result<()> {
    let sections = [
        ("database", config.databases.keys().collect::<Vec<_>>()),
        ("influx", config.influxes.keys().collect()),
        ("influx2", config.influxes2.keys().collect()),
        ("test", config.tests.keys().collect()),
    ];
    for (section, names) in sections {
        if let Some(name) = names.into_iter().find(|n| !is_identifier_like(n)) {
            return Err(Error::InvalidIdentifier {
                section,
                name: name.clone(),
            });
        }
    }
    Ok(())
}

fn check_sink_names(config: &AppConfig) -> Result<()> {
    match config
        .influxes
        .keys()
        .find(|name| config.influxes2.contains_key(name.as_str()))
    {
        Some(name) => Err(Error::DuplicateSink(name.clone())),
        None => Ok(()),
    }
}

fn check_drivers(config: &AppConfig, registry: &ConnectorRegistry) -> Result<()> {
    for (name, source) in &config.databases {
        if !registry.contains(&source.driver) {
            return Err(Error::UnknownDriver {
                database: name.clone(),
                driver: source.driver.clone(),
                valid: registry.drivers(),
            });
        }
    }
    Ok(())
}
