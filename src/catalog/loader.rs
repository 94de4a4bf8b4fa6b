use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use super::model::{Catalog, CatalogEntry, Category};
use crate::utils::is_safe_relative_path;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Catalog does not match the expected shape: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid catalog: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

/// Top-level shape of the mappings file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawCatalog {
    editor: RawEditor,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawEditor {
    main: Vec<CatalogEntry>,
    #[serde(default)]
    plugins: Vec<CatalogEntry>,
    #[serde(default)]
    other: Vec<CatalogEntry>,
}

/// Read and validate the mappings file at `path`.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let catalog = parse_catalog(&raw)?;
    info!(
        path = %path.display(),
        plugins = catalog.entries(Category::Plugins).len(),
        other = catalog.entries(Category::Other).len(),
        "Catalog loaded"
    );
    Ok(catalog)
}

pub fn parse_catalog(raw: &str) -> Result<Catalog> {
    let RawCatalog { editor } = serde_json::from_str(raw)?;

    validate_list("main", &editor.main)?;
    validate_list("plugins", &editor.plugins)?;
    validate_list("other", &editor.other)?;

    let [main] = <[CatalogEntry; 1]>::try_from(editor.main).map_err(|main| {
        CatalogError::Invalid(format!(
            "editor.main must hold exactly one entry, found {}",
            main.len()
        ))
    })?;

    Ok(Catalog::new(main, editor.plugins, editor.other))
}

fn validate_list(list: &str, entries: &[CatalogEntry]) -> Result<()> {
    let mut names = HashSet::new();
    for entry in entries {
        if entry.name.trim().is_empty() {
            return Err(CatalogError::Invalid(format!("{list}: entry with empty name")));
        }
        if !names.insert(entry.name.as_str()) {
            return Err(CatalogError::Invalid(format!(
                "{list}: duplicate name '{}'",
                entry.name
            )));
        }
        if let Err(e) = url::Url::parse(&entry.url) {
            return Err(CatalogError::Invalid(format!(
                "{list}/{}: invalid url '{}': {}",
                entry.name, entry.url, e
            )));
        }
        if !is_safe_relative_path(&entry.filename) {
            return Err(CatalogError::Invalid(format!(
                "{list}/{}: filename '{}' must be a relative path inside the archive",
                entry.name, entry.filename
            )));
        }
        debug!(list, name = %entry.name, "Catalog entry ok");
    }
    Ok(())
}
