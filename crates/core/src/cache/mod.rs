//! Result cache for aggregated searches.
//!
//! Two backends implement [`ResultCache`]:
//!
//! - [`CacheDb`]: SQLite via tokio-rusqlite, survives restarts, WAL mode,
//!   automatic schema migrations, capacity trimming by age
//! - [`MemoryCache`]: moka-backed, process lifetime
//!
//! Keys are derived from the request by [`CacheKey`]; freshness is decided
//! by a [`CachePolicy`] at read time.

pub mod connection;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod search;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use hash::CacheKey;
pub use memory::MemoryCache;
pub use store::{CacheEntry, CachePolicy, ResultCache};
