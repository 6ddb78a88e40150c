//! Table store: the query backend behind the redirect-following loop
//!
//! This module contains the narrow query interface and its SQLite
//! implementation, including:
//! - The [`TableStore`] trait (materialize a round / refresh partitions)
//! - The parameterized SQL view templates
//! - Schema definitions for the store-owned and pre-created tables

mod schema;
pub mod sql;
mod sqlite;
mod traits;

pub use schema::{create_index_tables, initialize_schema, INDEX_TABLES_SQL, SCHEMA_SQL};
pub use sqlite::SqliteStore;
pub use traits::{QueryInfo, StoreError, StoreResult, TableStore};
