//! Purpose: Turn CLI text (column specs, JSON value arrays, `--where` filters) into typed inputs.
//! Exports: `parse_column`, `parse_values`, `parse_filter`.
//! Role: Keeps argument decoding out of dispatch so command logic stays small.
//! Invariants: JSON has no date type, so a string bound for a `date` column is parsed as `YYYY-MM-DD`.
//! Invariants: Every other JSON scalar maps to its natural type; `insert` still checks types exactly.
//! Invariants: Filters on `float` columns read integer literals as floats.

use serde_json::Value as JsonValue;
use tabstore::api::{ColumnDef, Error, ErrorKind, Schema, TypeTag, Value, parse_date};

pub(crate) fn parse_column(spec: &str) -> Result<ColumnDef, Error> {
    let Some((name, type_name)) = spec.split_once(':') else {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("invalid column \"{spec}\""))
            .with_hint("Use NAME:TYPE, e.g. --column price:float."));
    };
    let type_tag = type_name.trim().parse::<TypeTag>()?;
    Ok(ColumnDef::new(name.trim(), type_tag))
}

/// Decodes a JSON array positionally against `schema`. Length is left to `insert` to check.
pub(crate) fn parse_values(input: &str, schema: &Schema) -> Result<Vec<Value>, Error> {
    let raw: JsonValue = serde_json::from_str(input).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("values must be a JSON array")
            .with_hint("Example: '[\"Widget\", 9.99]'")
            .with_source(err)
    })?;
    let JsonValue::Array(items) = raw else {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("values must be a JSON array")
            .with_hint("Example: '[\"Widget\", 9.99]'"));
    };
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let expected = schema.columns().get(index).map(|column| column.type_tag);
            value_from_json(item, expected)
        })
        .collect()
}

/// Parses `COLUMN=VALUE`. VALUE is read as JSON when it parses, else taken as a string.
/// An integer literal for a `float` column becomes a float.
pub(crate) fn parse_filter(input: &str, schema: &Schema) -> Result<(String, Value), Error> {
    let Some((column, raw)) = input.split_once('=') else {
        return Err(Error::new(ErrorKind::Usage)
            .with_message(format!("invalid filter \"{input}\""))
            .with_hint("Use COLUMN=VALUE, e.g. --where title=Widget."));
    };
    let column = column.trim();
    let raw = serde_json::from_str::<JsonValue>(raw)
        .unwrap_or_else(|_| JsonValue::String(raw.to_string()));
    let expected = schema.column(column).map(|def| def.type_tag);
    let value = match value_from_json(&raw, expected).map_err(|err| err.with_column(column))? {
        // Whole numbers are written without a fraction; compare them as floats.
        Value::Int(int) if expected == Some(TypeTag::Float) => Value::Float(int as f64),
        value => value,
    };
    Ok((column.to_string(), value))
}

fn value_from_json(raw: &JsonValue, expected: Option<TypeTag>) -> Result<Value, Error> {
    match raw {
        JsonValue::String(text) if expected == Some(TypeTag::Date) => {
            parse_date(text).map(Value::Date)
        }
        JsonValue::String(text) => Ok(Value::String(text.clone())),
        JsonValue::Bool(flag) => Ok(Value::Bool(*flag)),
        JsonValue::Number(number) => {
            if let Some(int) = number.as_i64() {
                Ok(Value::Int(int))
            } else if number.is_u64() {
                Err(Error::new(ErrorKind::Usage).with_message(format!("integer {number} is out of range")))
            } else {
                number
                    .as_f64()
                    .map(Value::Float)
                    .ok_or_else(|| Error::new(ErrorKind::Usage).with_message("invalid number"))
            }
        }
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => Err(Error::new(
            ErrorKind::Usage,
        )
        .with_message(format!("unsupported value {raw}; only string, number, and bool are stored"))),
    }
}
