//! Purpose: Hold top-level CLI command dispatch for `tabstore`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Every command opens the database fresh; no state survives between invocations.
//! Invariants: Row data is only touched through `Table` (locking and validation live there).

use super::*;
use clap::CommandFactory;
use super::cli_input::{parse_column, parse_filter, parse_values};
use super::table_json::table_json;
use tabstore::api::{Database, Predicate, Schema, Table, encode_row};

pub(super) fn dispatch_command(command: Command, config: &Config) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "tabstore", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Db { command } => match command {
            DbCommand::Create { name } => {
                Database::create(config, &name)?;
                let db = open_database(config, &name)?;
                emit_json(json!({
                    "created": {
                        "database": db.name(),
                        "path": db.path().display().to_string(),
                    }
                }));
                Ok(RunOutcome::ok())
            }
            DbCommand::Tables { name } => {
                let db = open_database(config, &name)?;
                emit_json(json!({ "database": db.name(), "tables": db.show_tables() }));
                Ok(RunOutcome::ok())
            }
        },
        Command::Table { command } => match command {
            TableCommand::Create {
                database,
                name,
                columns,
            } => {
                let columns = columns
                    .iter()
                    .map(|spec| parse_column(spec))
                    .collect::<Result<Vec<_>, _>>()?;
                let schema = Schema::new(columns)?;
                let mut db = open_database(config, &database)?;
                let table = db.create_table(&name, schema)?;
                emit_json(json!({ "created": table_json(&database, table) }));
                Ok(RunOutcome::ok())
            }
            TableCommand::Describe { database, name } => {
                let db = open_database(config, &database)?;
                let table = find_table(&db, &name)?;
                emit_json(table_json(&database, table));
                Ok(RunOutcome::ok())
            }
            TableCommand::Count { database, name } => {
                let db = open_database(config, &database)?;
                let table = find_table(&db, &name)?;
                emit_json(json!({
                    "database": database,
                    "table": table.name(),
                    "count": table.count()?,
                }));
                Ok(RunOutcome::ok())
            }
        },
        Command::Insert {
            database,
            table,
            values,
        } => {
            let db = open_database(config, &database)?;
            let table = find_table(&db, &table)?;
            let values = parse_values(&values, table.describe())?;
            table.insert(&values)?;

            let row = encode_row(table.describe(), &values)?;
            emit_json(json!({
                "database": database,
                "table": table.name(),
                "inserted": Value::Object(row),
                "count": table.count()?,
            }));
            Ok(RunOutcome::ok())
        }
        Command::Query {
            database,
            table,
            filters,
        } => {
            let db = open_database(config, &database)?;
            let table = find_table(&db, &table)?;
            let mut predicate = Predicate::new();
            for filter in &filters {
                let (column, value) = parse_filter(filter, table.describe())?;
                predicate = predicate.equals(column, value);
            }
            for row in table.query(&predicate)? {
                emit_json_line(&row?.to_json()?);
            }
            Ok(RunOutcome::ok())
        }
    }
}

fn open_database(config: &Config, name: &str) -> Result<Database, Error> {
    Database::open(config, name).map_err(|err| add_missing_database_hint(err, name))
}

fn find_table<'a>(db: &'a Database, name: &str) -> Result<&'a Table, Error> {
    db.table(name).ok_or_else(|| {
        Error::new(ErrorKind::NotFound)
            .with_message(format!("table \"{name}\" not found in database \"{}\"", db.name()))
            .with_path(db.path())
            .with_hint(format!(
                "List tables with `tabstore db tables {}` or create it with `tabstore table create`.",
                db.name()
            ))
    })
}

