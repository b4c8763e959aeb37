//! SQLite persistence for session records.

mod error;
mod models;
mod repository;
mod schema;

pub use error::StoreError;
pub use repository::SqliteSessionStore;
