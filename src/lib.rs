//! Purpose: Embedded tabular storage: named tables of schema-typed rows in per-table JSON files.
//! Exports: `api` (stable surface) and `core` (catalog, tables, codec, storage, errors).
//! Role: Library backing the `tabstore` CLI; usable directly by embedders.
//! Invariants: Every stored row conformed to its table schema at insert time.
//! Invariants: No concurrency guarantees beyond advisory file locks around each operation.
pub mod api;
pub mod core;
