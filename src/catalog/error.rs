//! Failure taxonomy shared by every catalog operation.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::store::StoreError;

pub type CatalogResult<T> = Result<T, CatalogError>;

/// One field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: &'static str,
    pub message: String,
}

impl Violation {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Author,
    Book,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Entity::Author => "Author",
            Entity::Book => "Book",
        })
    }
}

/// Stable classification consumed by transports to choose a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    ReferenceNotFound,
    UniquenessViolation,
    DependencyConflict,
    Infrastructure,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid input: {}", join(.0))]
    InvalidInput(Vec<Violation>),

    #[error("{entity} with ID {id} not found")]
    NotFound { entity: Entity, id: String },

    #[error("Author with ID {id} not found")]
    ReferenceNotFound { field: &'static str, id: String },

    #[error("Book with {field} {value} already exists")]
    UniquenessViolation { field: &'static str, value: String },

    #[error("Author with ID {id} still has books; delete the books first")]
    DependencyConflict { id: String },

    /// Storage failed for a reason unrelated to catalog integrity.
    #[error("storage failure: {0}")]
    Infrastructure(#[from] StoreError),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::InvalidInput(_) => ErrorKind::InvalidInput,
            CatalogError::NotFound { .. } => ErrorKind::NotFound,
            CatalogError::ReferenceNotFound { .. } => ErrorKind::ReferenceNotFound,
            CatalogError::UniquenessViolation { .. } => ErrorKind::UniquenessViolation,
            CatalogError::DependencyConflict { .. } => ErrorKind::DependencyConflict,
            CatalogError::Infrastructure(_) => ErrorKind::Infrastructure,
        }
    }

    pub fn not_found(entity: Entity, id: impl fmt::Display) -> Self {
        CatalogError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        CatalogError::InvalidInput(vec![Violation::new(field, message)])
    }
}

fn join(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_lists_every_violation() {
        let err = CatalogError::InvalidInput(vec![
            Violation::new("title", "must not be empty"),
            Violation::new("isbn", "must be a valid ISBN-10 or ISBN-13"),
        ]);
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert_eq!(
            err.to_string(),
            "invalid input: title must not be empty; isbn must be a valid ISBN-10 or ISBN-13"
        );
    }

    #[test]
    fn store_failures_are_infrastructure() {
        let err: CatalogError = StoreError::Backend(anyhow::anyhow!("disk I/O error")).into();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert!(err.to_string().contains("disk I/O error"));
    }

    #[test]
    fn not_found_names_the_entity() {
        let err = CatalogError::not_found(Entity::Book, "42");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "Book with ID 42 not found");
    }
}
