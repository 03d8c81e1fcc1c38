//! Catalog core: validation, integrity rules, pagination and persistence.
//!
//! Transport-agnostic. The author and book services in [`crate::modules`]
//! compose these pieces; HTTP and CLI adapters only translate in and out.

pub mod dates;
pub mod error;
pub mod guard;
pub mod query;
pub mod sqlite;
pub mod store;
pub mod validation;

use time::OffsetDateTime;

pub use error::{CatalogError, CatalogResult, Entity, ErrorKind, Violation};
pub use guard::IntegrityGuard;
pub use query::{Page, PageParams};
pub use sqlite::SqliteCatalogStore;
pub use store::{CatalogStore, StoreError, StoreResult};

/// Current UTC time at the microsecond precision the store keeps.
pub fn timestamp_now() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    let micros = now.nanosecond() / 1_000 * 1_000;
    now.replace_nanosecond(micros).unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_truncated_to_micros() {
        let now = timestamp_now();
        assert_eq!(now.nanosecond() % 1_000, 0);
        assert_eq!(now.offset(), time::UtcOffset::UTC);
    }
}
