//! Purpose: Database-directory and table-file path resolution.
//! Exports: `default_base_dir`, `resolve_database_dir`, `resolve_table_path`, `TABLE_EXTENSION`.
//! Role: Single source for the on-disk layout shared by the catalog, tables, and CLI.
//! Invariants: Layout is `<base>/<database>/<table>.json`.
//! Invariants: Names are single path components: non-empty, not `.`/`..`, no separators.

use std::path::{Path, PathBuf};

use crate::core::error::{Error, ErrorKind};

pub const TABLE_EXTENSION: &str = "json";
pub const BASE_DIR_ENV: &str = "TABSTORE_DIR";

/// `$TABSTORE_DIR` when set, else `~/.tabstore/databases`.
pub fn default_base_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(BASE_DIR_ENV).filter(|dir| !dir.is_empty()) {
        return PathBuf::from(dir);
    }
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".tabstore").join("databases")
}

pub fn resolve_database_dir(base_dir: &Path, name: &str) -> Result<PathBuf, Error> {
    check_name("database", name)?;
    Ok(base_dir.join(name))
}

pub fn resolve_table_path(db_dir: &Path, name: &str) -> Result<PathBuf, Error> {
    check_name("table", name)?;
    Ok(db_dir.join(format!("{name}.{TABLE_EXTENSION}")))
}

/// Table name for a directory entry, or `None` when it is not a table file
/// (wrong extension, or a stem that is not a valid table name, such as `..json`).
pub(crate) fn table_name_from_path(path: &Path) -> Option<String> {
    if path.extension().and_then(|ext| ext.to_str()) != Some(TABLE_EXTENSION) {
        return None;
    }
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| check_name("table", stem).is_ok())
        .map(str::to_string)
}

fn check_name(what: &str, name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message(format!("{what} name must not be empty")));
    }
    if name == "." || name == ".." {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("{what} name must not be \".\" or \"..\"")));
    }
    if name.chars().any(|ch| ch == '/' || std::path::is_separator(ch)) {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("{what} name must not contain path separators")));
    }
    Ok(())
}
