//! `inherit_from` resolution.
//!
//! Each test may name a single parent. Resolving a test first resolves its
//! parent (post-order), then copies every inheritable field the test leaves
//! unset. The walk carries the chain of tests currently being resolved so a
//! cycle is reported instead of recursing forever. Recursion depth is bounded
//! by the length of the longest `inherit_from` chain in one document.

use indexmap::IndexMap;
use tracing::debug;

use crate::config::TestDef;
use crate::error::{Error, Result};

/// Resolve every test of a document, in declaration order.
///
/// The first error aborts resolution; the map may then be partially filled
/// and must not be executed.
pub fn resolve_all(tests: &mut IndexMap<String, TestDef>) -> Result<()> {
    let names: Vec<String> = tests.keys().cloned().collect();
    let mut chain = Vec::new();
    for name in &names {
        resolve(tests, name, &mut chain)?;
        debug_assert!(chain.is_empty());
    }
    Ok(())
}

/// Resolve one test in place.
///
/// `chain` holds the tests whose resolution is in progress above this call;
/// pass an empty vector at the top level. It is restored before returning
/// `Ok`. Resolving an already resolved test changes nothing.
pub fn resolve(
    tests: &mut IndexMap<String, TestDef>,
    name: &str,
    chain: &mut Vec<String>,
) -> Result<()> {
    let test = tests.get(name).ok_or_else(|| Error::ConfigFile(format!("unknown test {name}")))?;

    if let Some(parent) = test.inherit_from.clone() {
        if chain.contains(&parent) {
            let mut visited = chain.clone();
            visited.push(name.to_string());
            return Err(Error::CircularReference {
                test: name.to_string(),
                parent,
                chain: visited,
            });
        }
        if !tests.contains_key(&parent) {
            return Err(Error::InvalidReference {
                test: name.to_string(),
                parent,
            });
        }

        chain.push(name.to_string());
        let outcome = resolve(tests, &parent, chain);
        chain.pop();
        outcome?;

        let parent_def = tests.get(&parent).cloned().unwrap_or_default();
        if let Some(test) = tests.get_mut(name) {
            debug!("tests.{} inherits from {}", name, parent);
            test.inherit(&parent_def);
        }
    }

    match tests.get(name) {
        Some(test) if !test.is_template => match test.missing_field() {
            Some(field) => Err(Error::MissingRequiredField {
                test: name.to_string(),
                field,
            }),
            None => Ok(()),
        },
        _ => Ok(()),
    }
}
