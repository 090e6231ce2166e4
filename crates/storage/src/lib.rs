//! Content-addressed track storage.
//!
//! A store root holds:
//! - `tracklibrary.db`, an SQLite index of per-track summaries
//! - `vault/`, the GPX files themselves, named by SHA-256 of their bytes

pub mod query;
pub mod track_store;
pub mod vault;

pub use query::{FieldRange, TrackField, TrackQuery};
pub use track_store::{ImportOutcome, TrackStore, DATABASE_FILE, SCHEMA_VERSION, VAULT_DIR};
pub use vault::Vault;
