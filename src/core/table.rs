// Table handle: schema-checked appends plus full and equality-predicate scans.
// Scans read the stored document once and decode rows lazily from that snapshot.
use std::path::Path;

use crate::core::codec::{EncodedRow, TableDocument, decode_row, encode_row};
use crate::core::error::{Error, ErrorKind};
use crate::core::paths::resolve_table_path;
use crate::core::storage::{JsonFile, TableStorage};
use crate::core::types::{Row, Schema, Value};

/// Conjunction of `column == value` terms. Empty matches every row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Predicate {
    terms: Vec<(String, Value)>,
}

impl Predicate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a term; a later term for the same column replaces the earlier one.
    pub fn equals(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        let column = column.into();
        let value = value.into();
        match self.terms.iter_mut().find(|(name, _)| *name == column) {
            Some(term) => term.1 = value,
            None => self.terms.push((column, value)),
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.terms.iter().map(|(name, value)| (name.as_str(), value))
    }

    fn check_columns(&self, schema: &Schema) -> Result<(), Error> {
        for (column, _) in &self.terms {
            if schema.column(column).is_none() {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message("predicate names a column the table does not have")
                    .with_column(column));
            }
        }
        Ok(())
    }

    fn matches(&self, row: &Row) -> Result<bool, Error> {
        for (column, expected) in &self.terms {
            let actual = row.get(column).ok_or_else(|| {
                Error::new(ErrorKind::Corrupt)
                    .with_message("stored row is missing a queried column")
                    .with_column(column)
            })?;
            if actual != expected {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Rows from one scan, in storage order. Stops after the first error.
#[derive(Debug)]
pub struct Rows {
    schema: Schema,
    predicate: Predicate,
    pending: std::vec::IntoIter<EncodedRow>,
    failed: bool,
}

impl Rows {
    fn new(schema: Schema, predicate: Predicate, rows: Vec<EncodedRow>) -> Self {
        Self {
            schema,
            predicate,
            pending: rows.into_iter(),
            failed: false,
        }
    }

    fn next_match(&mut self) -> Result<Option<Row>, Error> {
        for encoded in self.pending.by_ref() {
            let row = decode_row(&self.schema, &encoded)?;
            if self.predicate.matches(&row)? {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }
}

impl Iterator for Rows {
    type Item = Result<Row, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.next_match() {
            Ok(row) => row.map(Ok),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

pub struct Table<S: TableStorage = JsonFile> {
    name: String,
    schema: Schema,
    storage: S,
}

impl Table<JsonFile> {
    /// Opens `<db_dir>/<name>.json`, creating it from `schema` when absent.
    ///
    /// For an existing file the stored schema is authoritative; a differing
    /// `schema` argument is ignored with a warning.
    pub fn open_or_create(db_dir: &Path, name: &str, schema: Option<Schema>) -> Result<Self, Error> {
        let path = resolve_table_path(db_dir, name)?;
        Self::with_storage(name, JsonFile::new(path), schema)
    }

    /// Creates `<db_dir>/<name>.json`; fails with `AlreadyExists` if the file is present.
    pub fn create(db_dir: &Path, name: &str, schema: Schema) -> Result<Self, Error> {
        let path = resolve_table_path(db_dir, name)?;
        let storage = JsonFile::new(path);
        storage.create(&TableDocument::empty(schema.clone()))?;
        tracing::info!(table = %name, columns = schema.len(), "created table");
        Ok(Self {
            name: name.to_string(),
            schema,
            storage,
        })
    }

    pub fn path(&self) -> &Path {
        self.storage.path()
    }
}

impl<S: TableStorage> Table<S> {
    pub fn with_storage(
        name: impl Into<String>,
        storage: S,
        schema: Option<Schema>,
    ) -> Result<Self, Error> {
        let name = name.into();
        if !storage.exists()? {
            let Some(schema) = schema else {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(format!("table \"{name}\" does not exist and no schema was given")));
            };
            match storage.create(&TableDocument::empty(schema.clone())) {
                Ok(()) => {
                    tracing::info!(table = %name, columns = schema.len(), "created table");
                    return Ok(Self {
                        name,
                        schema,
                        storage,
                    });
                }
                // Lost a creation race; fall through and adopt the stored schema.
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    return Self::adopt_stored(name, storage, Some(schema));
                }
                Err(err) => return Err(err),
            }
        }
        Self::adopt_stored(name, storage, schema)
    }

    fn adopt_stored(name: String, storage: S, requested: Option<Schema>) -> Result<Self, Error> {
        let schema = storage.load()?.columns;
        if let Some(requested) = requested {
            if requested != schema {
                tracing::warn!(
                    table = %name,
                    "ignoring schema argument that differs from the stored schema"
                );
            }
        }
        tracing::debug!(table = %name, columns = schema.len(), "opened table");
        Ok(Self {
            name,
            schema,
            storage,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn describe(&self) -> &Schema {
        &self.schema
    }

    /// Validates `values` positionally against the schema, then appends the row.
    /// Nothing is written when validation fails.
    pub fn insert(&self, values: &[Value]) -> Result<(), Error> {
        self.check_values(values)?;
        let row = encode_row(&self.schema, values)?;
        let count = self.storage.append(row)?;
        tracing::debug!(table = %self.name, rows = count, "inserted row");
        Ok(())
    }

    fn check_values(&self, values: &[Value]) -> Result<(), Error> {
        if values.len() != self.schema.len() {
            return Err(Error::new(ErrorKind::Arity).with_message(format!(
                "wrong number of fields: given {}, expected {}",
                values.len(),
                self.schema.len()
            )));
        }
        for (column, value) in self.schema.iter().zip(values) {
            let actual = value.type_tag();
            if actual != column.type_tag {
                return Err(Error::new(ErrorKind::TypeMismatch)
                    .with_message(format!(
                        "invalid type of field \"{}\": given \"{actual}\", expected \"{}\"",
                        column.name, column.type_tag
                    ))
                    .with_column(&column.name));
            }
            if let Value::Float(number) = value {
                if !number.is_finite() {
                    return Err(Error::new(ErrorKind::Usage)
                        .with_message("non-finite floats cannot be stored")
                        .with_column(&column.name));
                }
            }
        }
        Ok(())
    }

    pub fn query(&self, predicate: &Predicate) -> Result<Rows, Error> {
        predicate.check_columns(&self.schema)?;
        let document = self.storage.load()?;
        Ok(Rows::new(self.schema.clone(), predicate.clone(), document.rows))
    }

    pub fn all(&self) -> Result<Rows, Error> {
        self.query(&Predicate::new())
    }

    pub fn count(&self) -> Result<usize, Error> {
        Ok(self.storage.load()?.rows.len())
    }
}
