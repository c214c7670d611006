//! Persistence layer: insert-only signal stores.

pub mod libsql_backend;
pub mod migrations;
pub mod supabase;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use supabase::SupabaseStore;
pub use traits::{PersistenceSink, SignalRow, SignalStore};
