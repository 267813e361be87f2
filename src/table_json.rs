//! Purpose: Shared JSON envelopes for database and table output.
//! Exports: `columns_json`, `table_json`.
//! Role: Keep key names consistent across `db`, `table`, and `insert` commands.
//! Invariants: Column entries use the same `{name, type}` shape as table files.

use serde_json::{Map, Value, json};
use tabstore::api::{Schema, Table};

pub(crate) fn columns_json(schema: &Schema) -> Value {
    let columns = schema
        .iter()
        .map(|column| json!({ "name": column.name, "type": column.type_tag.as_str() }))
        .collect::<Vec<_>>();
    Value::Array(columns)
}

pub(crate) fn table_json(database: &str, table: &Table) -> Value {
    let mut map = Map::new();
    map.insert("database".to_string(), json!(database));
    map.insert("table".to_string(), json!(table.name()));
    map.insert("path".to_string(), json!(table.path().display().to_string()));
    map.insert("columns".to_string(), columns_json(table.describe()));
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::columns_json;
    use serde_json::json;
    use tabstore::api::{ColumnDef, Schema, TypeTag};

    #[test]
    fn columns_match_table_file_shape() {
        let schema = Schema::new(vec![
            ColumnDef::new("title", TypeTag::String),
            ColumnDef::new("when", TypeTag::Date),
        ])
        .expect("schema");
        assert_eq!(
            columns_json(&schema),
            json!([{"name": "title", "type": "string"}, {"name": "when", "type": "date"}])
        );
    }
}
