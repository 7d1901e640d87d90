//! Persistent device catalog storage.
//!
//! The engine crate ships an in-memory catalog; this module adds an SQLite
//! backed [`CatalogStore`](selection_engine::catalog::CatalogStore) behind
//! the `sqlite` feature.

#[cfg(feature = "sqlite")]
pub mod catalog_store;

#[cfg(feature = "sqlite")]
pub use catalog_store::SqliteCatalog;
