// Database catalog: one directory of table files, discovered on open.
// The in-memory table list changes only through `create_table`; files added by
// other processes after `open` are not picked up.
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::error::{Error, ErrorKind};
use crate::core::paths::{default_base_dir, resolve_database_dir, table_name_from_path};
use crate::core::table::Table;
use crate::core::types::Schema;

/// Where database directories live. Passed explicitly; there is no global.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    base_dir: PathBuf,
}

impl Config {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(default_base_dir())
    }
}

pub struct Database {
    name: String,
    path: PathBuf,
    tables: HashMap<String, Table>,
    table_names: Vec<String>,
}

impl Database {
    /// Creates the database directory (and parents). Fails if it already exists.
    pub fn create(config: &Config, name: &str) -> Result<(), Error> {
        let path = resolve_database_dir(config.base_dir(), name)?;
        fs::create_dir_all(config.base_dir()).map_err(|err| {
            Error::io(err, config.base_dir()).with_message("failed to create base directory")
        })?;
        fs::create_dir(&path).map_err(|err| {
            let err = Error::io(err, &path);
            if err.kind() == ErrorKind::AlreadyExists {
                err.with_message(format!("database \"{name}\" already exists"))
            } else {
                err.with_message("failed to create database directory")
            }
        })?;
        tracing::info!(database = %name, path = %path.display(), "created database");
        Ok(())
    }

    /// Opens an existing database, loading the schema of every `*.json` table file.
    pub fn open(config: &Config, name: &str) -> Result<Self, Error> {
        let path = resolve_database_dir(config.base_dir(), name)?;
        let table_names = list_table_names(&path)?;
        let mut tables = HashMap::with_capacity(table_names.len());
        for table_name in &table_names {
            let table = Table::open_or_create(&path, table_name, None)?;
            tables.insert(table_name.clone(), table);
        }
        tracing::debug!(database = %name, tables = table_names.len(), "opened database");
        Ok(Self {
            name: name.to_string(),
            path,
            tables,
            table_names,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn create_table(&mut self, name: &str, schema: Schema) -> Result<&Table, Error> {
        if self.tables.contains_key(name) || list_table_names(&self.path)?.iter().any(|t| t == name) {
            return Err(Error::new(ErrorKind::AlreadyExists)
                .with_message(format!("table \"{name}\" already exists"))
                .with_path(&self.path));
        }
        let table = Table::create(&self.path, name, schema)?;
        self.table_names.push(name.to_string());
        Ok(&*self.tables.entry(name.to_string()).or_insert(table))
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Tables found at open (sorted by name) followed by tables created through this handle.
    pub fn show_tables(&self) -> &[String] {
        &self.table_names
    }
}

/// Creates a database and returns an open handle to it.
pub fn create_database(config: &Config, name: &str) -> Result<Database, Error> {
    Database::create(config, name)?;
    Database::open(config, name)
}

pub fn connect_database(config: &Config, name: &str) -> Result<Database, Error> {
    Database::open(config, name)
}

fn list_table_names(dir: &Path) -> Result<Vec<String>, Error> {
    let entries = fs::read_dir(dir).map_err(|err| {
        let err = Error::io(err, dir);
        let message = if err.kind() == ErrorKind::NotFound {
            "database not found"
        } else {
            "failed to read database directory"
        };
        err.with_message(message)
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read database directory entry")
                .with_path(dir)
                .with_source(err)
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(name) = table_name_from_path(&path) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::{Config, Database, connect_database, create_database};
    use crate::core::error::ErrorKind;
    use crate::core::types::{ColumnDef, Schema, TypeTag, Value};

    fn schema() -> Schema {
        Schema::new(vec![ColumnDef::new("n", TypeTag::Int)]).expect("schema")
    }

    #[test]
    fn create_twice_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::new(dir.path().join("nested").join("base"));
        Database::create(&config, "shop").expect("create");
        assert!(config.base_dir().join("shop").is_dir());
        let err = Database::create(&config, "shop").expect_err("exists");
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[test]
    fn concurrent_creates_have_one_winner() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::new(dir.path());
        let results: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| Database::create(&config, "shop")))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("join"))
                .collect()
        });
        let winners = results.iter().filter(|result| result.is_ok()).count();
        assert_eq!(winners, 1);
        for err in results.iter().filter_map(|result| result.as_ref().err()) {
            assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        }
    }

    #[test]
    fn open_missing_database_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::new(dir.path());
        let err = Database::open(&config, "nope").err().expect("err");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.path(), Some(dir.path().join("nope").as_path()));
    }

    #[test]
    fn open_discovers_only_json_files_sorted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::new(dir.path());
        let mut db = create_database(&config, "shop").expect("create");
        db.create_table("zebra", schema()).expect("table");
        db.create_table("apple", schema()).expect("table");
        assert_eq!(db.show_tables(), ["zebra", "apple"]);
        std::fs::write(db.path().join("notes.txt"), "ignore me").expect("write");
        std::fs::create_dir(db.path().join("dir.json")).expect("mkdir");
        std::fs::write(db.path().join("..json"), "{}").expect("write");

        let reopened = connect_database(&config, "shop").expect("open");
        assert_eq!(reopened.show_tables(), ["apple", "zebra"]);
        assert_eq!(reopened.table("apple").expect("apple").describe(), &schema());
        assert!(reopened.table("notes").is_none());
    }

    #[test]
    fn create_table_twice_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::new(dir.path());
        let mut db = create_database(&config, "shop").expect("create");
        db.create_table("t", schema()).expect("table");
        let err = db.create_table("t", schema()).err().expect("err");
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(db.show_tables(), ["t"]);
    }

    #[test]
    fn create_table_sees_files_from_other_handles() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::new(dir.path());
        let mut first = create_database(&config, "shop").expect("create");
        let mut second = connect_database(&config, "shop").expect("open");
        first.create_table("t", schema()).expect("table");

        let err = second.create_table("t", schema()).err().expect("err");
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert!(second.show_tables().is_empty());
    }

    #[test]
    fn failed_table_create_keeps_database_openable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::new(dir.path());
        let mut db = create_database(&config, "shop").expect("create");
        std::fs::create_dir(db.path().join("t.json")).expect("mkdir");

        db.create_table("t", schema()).err().expect("occupied");
        assert!(db.show_tables().is_empty());
        let reopened = connect_database(&config, "shop").expect("open");
        assert!(reopened.show_tables().is_empty());
        let names: Vec<_> = std::fs::read_dir(db.path())
            .expect("read dir")
            .map(|entry| entry.expect("entry").file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("t.json")]);
    }

    #[test]
    fn created_table_is_usable_through_catalog() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::new(dir.path());
        let mut db = create_database(&config, "shop").expect("create");
        let table = db.create_table("nums", schema()).expect("table");
        table.insert(&[Value::from(5)]).expect("insert");
        assert_eq!(db.table("nums").expect("nums").count().expect("count"), 1);
    }

    #[test]
    fn invalid_names_are_usage_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::new(dir.path());
        let err = Database::create(&config, "../escape").expect_err("bad name");
        assert_eq!(err.kind(), ErrorKind::Usage);
        let mut db = create_database(&config, "shop").expect("create");
        let err = db.create_table("a/b", schema()).err().expect("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
