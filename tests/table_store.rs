// Library-level behavior of databases and tables on a real directory.
use serde_json::json;
use tabstore::api::{
    ColumnDef, Config, Database, ErrorKind, Predicate, Row, Schema, TypeTag, Value,
    connect_database, create_database,
};
use time::{Date, Month};

fn products_schema() -> Schema {
    Schema::new(vec![
        ColumnDef::new("title", TypeTag::String),
        ColumnDef::new("price", TypeTag::Float),
    ])
    .expect("schema")
}

fn rows(iter: tabstore::api::Rows) -> Vec<Row> {
    iter.collect::<Result<Vec<_>, _>>().expect("rows")
}

#[test]
fn shop_scenario() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = Config::new(temp.path());
    let mut db = create_database(&config, "shop").expect("create db");
    let products = db
        .create_table("products", products_schema())
        .expect("create table");

    products
        .insert(&[Value::from("Widget"), Value::from(9.99)])
        .expect("insert");
    assert_eq!(products.count().expect("count"), 1);

    let err = products
        .insert(&[Value::from("Widget"), Value::from(9)])
        .expect_err("int for float");
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    assert_eq!(err.column(), Some("price"));
    assert_eq!(products.count().expect("count"), 1);

    let found = rows(
        products
            .query(&Predicate::new().equals("title", "Widget"))
            .expect("query"),
    );
    assert_eq!(found.len(), 1);
    assert_eq!(
        found[0].to_json().expect("json"),
        json!({"title": "Widget", "price": 9.99})
    );
}

#[test]
fn arity_errors_leave_file_untouched() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = Config::new(temp.path());
    let mut db = create_database(&config, "shop").expect("create db");
    let products = db
        .create_table("products", products_schema())
        .expect("create table");
    let before = std::fs::read(products.path()).expect("read");

    for values in [
        vec![],
        vec![Value::from("Widget")],
        vec![Value::from("Widget"), Value::from(1.0), Value::from(true)],
    ] {
        let err = products.insert(&values).expect_err("arity");
        assert_eq!(err.kind(), ErrorKind::Arity);
    }

    assert_eq!(std::fs::read(products.path()).expect("read"), before);
    assert_eq!(products.count().expect("count"), 0);
}

#[test]
fn rows_survive_reopen_with_dates_intact() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = Config::new(temp.path());
    let schema = Schema::new(vec![
        ColumnDef::new("name", TypeTag::String),
        ColumnDef::new("age", TypeTag::Int),
        ColumnDef::new("active", TypeTag::Bool),
        ColumnDef::new("joined", TypeTag::Date),
        ColumnDef::new("score", TypeTag::Float),
    ])
    .expect("schema");
    let joined = Date::from_calendar_date(2019, Month::February, 28).expect("date");

    {
        let mut db = create_database(&config, "people").expect("create db");
        let table = db.create_table("members", schema.clone()).expect("table");
        table
            .insert(&[
                Value::from("ada"),
                Value::from(36),
                Value::from(true),
                Value::from(joined),
                Value::from(10.0),
            ])
            .expect("insert");
    }

    let db = connect_database(&config, "people").expect("reopen");
    assert_eq!(db.show_tables(), ["members"]);
    let table = db.table("members").expect("members");
    assert_eq!(table.describe(), &schema);

    let all = rows(table.all().expect("all"));
    assert_eq!(all.len(), 1);
    let row = &all[0];
    assert_eq!(row.get_str("name"), Some("ada"));
    assert_eq!(row.get_int("age"), Some(36));
    assert_eq!(row.get_bool("active"), Some(true));
    assert_eq!(row.get_date("joined"), Some(joined));
    assert_eq!(row.get("score"), Some(&Value::Float(10.0)));

    let by_date = rows(
        table
            .query(&Predicate::new().equals("joined", joined))
            .expect("query"),
    );
    assert_eq!(by_date.len(), 1);
}

#[test]
fn table_file_matches_documented_layout() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = Config::new(temp.path());
    let mut db = create_database(&config, "log").expect("create db");
    let schema = Schema::new(vec![
        ColumnDef::new("day", TypeTag::Date),
        ColumnDef::new("note", TypeTag::String),
    ])
    .expect("schema");
    let table = db.create_table("entries", schema).expect("table");
    let day = Date::from_calendar_date(2024, Month::January, 5).expect("date");
    table
        .insert(&[Value::from(day), Value::from("hello")])
        .expect("insert");

    let path = temp.path().join("log").join("entries.json");
    assert_eq!(table.path(), path.as_path());
    let stored: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).expect("read")).expect("json");
    assert_eq!(
        stored,
        json!({
            "columns": [
                {"name": "day", "type": "date"},
                {"name": "note", "type": "string"}
            ],
            "rows": [{"day": "2024-01-05", "note": "hello"}]
        })
    );
}

#[test]
fn stored_rows_keep_schema_column_order() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = Config::new(temp.path());
    let mut db = create_database(&config, "shop").expect("create db");
    let products = db
        .create_table("products", products_schema())
        .expect("create table");
    products
        .insert(&[Value::from("Widget"), Value::from(9.99)])
        .expect("insert");

    let text = std::fs::read_to_string(products.path()).expect("read");
    assert_eq!(
        text,
        r#"{"columns":[{"name":"title","type":"string"},{"name":"price","type":"float"}],"rows":[{"title":"Widget","price":9.99}]}"#
    );
    let row = rows(products.all().expect("all")).remove(0);
    assert_eq!(
        serde_json::to_string(&row.to_json().expect("json")).expect("encode"),
        r#"{"title":"Widget","price":9.99}"#
    );
}

#[test]
fn query_preserves_insertion_order() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = Config::new(temp.path());
    let mut db = create_database(&config, "nums").expect("create db");
    let schema = Schema::new(vec![
        ColumnDef::new("n", TypeTag::Int),
        ColumnDef::new("parity", TypeTag::String),
    ])
    .expect("schema");
    let table = db.create_table("ints", schema).expect("table");
    for n in 0..10i64 {
        let parity = if n % 2 == 0 { "even" } else { "odd" };
        table
            .insert(&[Value::from(n), Value::from(parity)])
            .expect("insert");
    }

    assert_eq!(table.count().expect("count"), 10);
    let odd: Vec<i64> = rows(
        table
            .query(&Predicate::new().equals("parity", "odd"))
            .expect("query"),
    )
    .iter()
    .filter_map(|row| row.get_int("n"))
    .collect();
    assert_eq!(odd, vec![1, 3, 5, 7, 9]);

    let all: Vec<i64> = rows(table.query(&Predicate::new()).expect("query"))
        .iter()
        .filter_map(|row| row.get_int("n"))
        .collect();
    assert_eq!(all, (0..10).collect::<Vec<_>>());
}

#[test]
fn duplicate_database_and_table_names_fail() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = Config::new(temp.path());
    Database::create(&config, "shop").expect("create");
    let err = Database::create(&config, "shop").expect_err("duplicate db");
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);

    let mut db = Database::open(&config, "shop").expect("open");
    db.create_table("products", products_schema()).expect("table");
    let err = db
        .create_table("products", products_schema())
        .err()
        .expect("duplicate table");
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
}

#[test]
fn reopened_table_ignores_conflicting_schema_argument() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = Config::new(temp.path());
    let mut db = create_database(&config, "shop").expect("create db");
    db.create_table("products", products_schema()).expect("table");

    let other = Schema::new(vec![ColumnDef::new("sku", TypeTag::Int)]).expect("schema");
    let table = tabstore::api::Table::open_or_create(db.path(), "products", Some(other))
        .expect("open");
    assert_eq!(table.describe(), &products_schema());
}
