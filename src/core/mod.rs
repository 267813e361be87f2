// Core modules implementing schemas, on-disk encoding, storage, and the catalog.
pub mod catalog;
pub mod codec;
pub mod error;
pub mod paths;
pub mod storage;
pub mod table;
pub mod types;
