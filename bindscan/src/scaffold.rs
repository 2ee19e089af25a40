//! Service directory layout: creation and checks.
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const SCHEMA_DIR: &str = "schema";
pub const BINDINGS_DIR: &str = "bindings";
pub const ROUTES_DIR: &str = "routes";

#[derive(Debug, thiserror::Error)]
pub enum ScaffoldError {
    #[error("'{0}' already exists")]
    AlreadyExists(String),
    #[error("not inside a service directory ('{0}/' is missing)")]
    NotAServiceDir(&'static str),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Creates `<name>/schema`, `<name>/bindings` and `<name>/routes`, plus a
/// placeholder schema file.
pub fn create_service(name: &str) -> Result<PathBuf, ScaffoldError> {
    let root = PathBuf::from(name);
    if root.exists() {
        return Err(ScaffoldError::AlreadyExists(name.to_string()));
    }

    for dir in [SCHEMA_DIR, BINDINGS_DIR, ROUTES_DIR] {
        fs::create_dir_all(root.join(dir))?;
    }
    let schema = root.join(SCHEMA_DIR).join(format!("{name}.proto"));
    fs::write(&schema, "syntax=\"proto2\";\n")?;

    info!(service = %name, schema = %schema.display(), "scaffolded service directory");
    Ok(root)
}

/// Fails unless the current directory has the service layout.
pub fn ensure_service_dir() -> Result<(), ScaffoldError> {
    for dir in [SCHEMA_DIR, BINDINGS_DIR, ROUTES_DIR] {
        if !Path::new(dir).is_dir() {
            return Err(ScaffoldError::NotAServiceDir(dir));
        }
    }
    Ok(())
}

/// The schema file stems under `schema/` (without the `.proto` extension).
pub fn schema_stems() -> Result<BTreeSet<String>, ScaffoldError> {
    let mut stems = BTreeSet::new();
    for entry in fs::read_dir(SCHEMA_DIR)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "proto")
            && let Some(stem) = path.file_stem().and_then(|stem| stem.to_str())
        {
            stems.insert(stem.to_string());
        }
    }
    Ok(stems)
}
