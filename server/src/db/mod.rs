//! The in-memory document store backing the collection API.

mod docstore;

pub use docstore::*;
