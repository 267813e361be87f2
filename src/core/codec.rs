// Table file document model and row encode/decode against a schema.
// Dates are stored as `YYYY-MM-DD` strings; every other value is a plain JSON scalar.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::core::error::{Error, ErrorKind};
use crate::core::types::{Row, Schema, TypeTag, Value, parse_date};

pub type EncodedRow = Map<String, JsonValue>;

/// Whole contents of one table file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TableDocument {
    pub columns: Schema,
    pub rows: Vec<EncodedRow>,
}

impl TableDocument {
    pub fn empty(columns: Schema) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let document: TableDocument = serde_json::from_slice(bytes).map_err(|err| {
            Error::new(ErrorKind::Corrupt)
                .with_message("table file is not a valid table document")
                .with_source(err)
        })?;
        document.columns.validate().map_err(|err| {
            let mut corrupt = Error::new(ErrorKind::Corrupt)
                .with_message(format!("invalid stored schema: {}", err.message().unwrap_or("")));
            if let Some(column) = err.column() {
                corrupt = corrupt.with_column(column);
            }
            corrupt
        })?;
        Ok(document)
    }

    pub fn to_vec(&self) -> Result<Vec<u8>, Error> {
        serde_json::to_vec(self).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode table document")
                .with_source(err)
        })
    }
}

/// Encodes already-validated values, pairing each with its column in schema order.
pub fn encode_row(schema: &Schema, values: &[Value]) -> Result<EncodedRow, Error> {
    let mut row = Map::new();
    for (column, value) in schema.iter().zip(values) {
        let encoded = serde_json::to_value(value).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode value")
                .with_column(&column.name)
                .with_source(err)
        })?;
        row.insert(column.name.clone(), encoded);
    }
    Ok(row)
}

/// Decodes the schema columns present in a stored row; absent columns are left out.
pub fn decode_row(schema: &Schema, encoded: &EncodedRow) -> Result<Row, Error> {
    let mut fields = Vec::with_capacity(schema.len());
    for column in schema {
        let Some(raw) = encoded.get(&column.name) else {
            continue;
        };
        let value = decode_value(column.type_tag, raw).ok_or_else(|| {
            Error::new(ErrorKind::Corrupt)
                .with_message(format!("stored value {raw} is not a valid {}", column.type_tag))
                .with_column(&column.name)
        })?;
        fields.push((column.name.clone(), value));
    }
    Ok(Row::from_fields(fields))
}

fn decode_value(type_tag: TypeTag, raw: &JsonValue) -> Option<Value> {
    match type_tag {
        TypeTag::String => raw.as_str().map(|text| Value::String(text.to_string())),
        TypeTag::Int => raw.as_i64().map(Value::Int),
        TypeTag::Float => raw.as_f64().map(Value::Float),
        TypeTag::Bool => raw.as_bool().map(Value::Bool),
        TypeTag::Date => raw
            .as_str()
            .and_then(|text| parse_date(text).ok())
            .map(Value::Date),
    }
}
