//! Config file discovery.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Config file used when neither files nor directories are given.
pub const DEFAULT_CONFIG_FILE: &str = "pigflux.yml";

/// Build the ordered list of config files to process in every pass.
///
/// Explicit files come first, in the order given, followed by the `.yml` and
/// `.yaml` files of each directory sorted by file name. With no input at all
/// the list is just [`DEFAULT_CONFIG_FILE`].
pub fn config_files(files: &[PathBuf], dirs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    if files.is_empty() && dirs.is_empty() {
        return Ok(vec![PathBuf::from(DEFAULT_CONFIG_FILE)]);
    }

    let mut result = files.to_vec();
    for dir in dirs {
        result.extend(list_dir(dir)?);
    }
    if result.is_empty() {
        return Err(Error::ConfigFile("no config files found".to_string()));
    }
    Ok(result)
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| Error::ConfigFile(format!("cannot list {}: {e}", dir.display())))?;

    let mut found = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && is_yaml(&path) {
            found.push(path);
        }
    }
    found.sort();
    Ok(found)
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yml") || ext.eq_ignore_ascii_case("yaml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_file() {
        let files = config_files(&[], &[]).unwrap();
        assert_eq!(files, vec![PathBuf::from("pigflux.yml")]);
    }

    #[test]
    fn test_directory_listing_is_sorted_and_filtered() {
        let dir = TempDir::new().unwrap();
        for name in ["b.yml", "a.YAML", "notes.txt", "c.yaml"] {
            std::fs::write(dir.path().join(name), "tests: {}\n").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.yml")).unwrap();

        let files = config_files(&[], &[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.YAML", "b.yml", "c.yaml"]);
    }

    #[test]
    fn test_explicit_files_come_first() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.yml"), "").unwrap();

        let explicit = PathBuf::from("/etc/pigflux/main.yml");
        let files = config_files(&[explicit.clone()], &[dir.path().to_path_buf()]).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0], explicit);
    }

    #[test]
    fn test_empty_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = config_files(&[], &[dir.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, Error::ConfigFile(_)));
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let err = config_files(&[], &[PathBuf::from("/nonexistent/pigflux.d")]).unwrap_err();
        assert!(err.to_string().contains("cannot list"));
    }
}
