//! Route handlers exposed by the namescan server.

pub mod search;
pub mod sites;

pub use search::{SearchParams, search, search_report};
pub use sites::list_sites;
