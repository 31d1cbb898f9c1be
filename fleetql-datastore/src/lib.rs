//! Embedded datastore: fleet tables, document vectors, and catalog
//! introspection behind the `IDatastore` trait.

pub mod schema;
pub mod sqlite;

pub use sqlite::SqliteDatastore;
