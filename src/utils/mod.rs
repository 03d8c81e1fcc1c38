//! Standalone helpers usable without a catalog store.

pub mod isbn;
