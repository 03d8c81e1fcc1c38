//! Translation between catalog results and HTTP responses.

use std::str::FromStr;

use catalog_http::error::AppError;
use serde_json::json;

use crate::catalog::{CatalogError, Violation};

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        let message = err.to_string();
        match err {
            CatalogError::InvalidInput(violations) => {
                AppError::validation(violations.iter().map(violation_detail).collect(), message)
            }
            CatalogError::ReferenceNotFound { field, .. } => {
                AppError::validation(vec![json!({ "field": field, "error": "not found" })], message)
                    .with_code("reference_not_found")
            }
            CatalogError::NotFound { .. } => AppError::not_found(message),
            CatalogError::UniquenessViolation { field, value } => {
                AppError::conflict(vec![json!({ "field": field, "value": value })], message)
            }
            CatalogError::DependencyConflict { .. } => {
                AppError::conflict(Vec::new(), message).with_code("dependency_conflict")
            }
            CatalogError::Infrastructure(source) => AppError::Internal(anyhow::Error::new(source)),
        }
    }
}

fn violation_detail(violation: &Violation) -> serde_json::Value {
    json!({ "field": violation.field, "error": violation.message })
}

/// Parse a path segment as an entity id; malformed ids are a bad request.
pub(crate) fn path_id<T: FromStr>(entity: &str, raw: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::bad_request(format!("{entity} id `{raw}` is not a valid UUID")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Entity, StoreError};
    use axum::http::StatusCode;

    #[test]
    fn every_kind_maps_to_a_stable_status_and_code() {
        let cases = [
            (CatalogError::invalid("title", "must not be empty"), StatusCode::UNPROCESSABLE_ENTITY),
            (
                CatalogError::ReferenceNotFound {
                    field: "authorId",
                    id: "x".into(),
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (CatalogError::not_found(Entity::Author, "x"), StatusCode::NOT_FOUND),
            (
                CatalogError::UniquenessViolation {
                    field: "isbn",
                    value: "9780306406157".into(),
                },
                StatusCode::CONFLICT,
            ),
            (CatalogError::DependencyConflict { id: "x".into() }, StatusCode::CONFLICT),
            (
                CatalogError::Infrastructure(StoreError::Backend(anyhow::anyhow!("disk full"))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            let app: AppError = err.into();
            assert_eq!(app.status(), status);
        }
    }

    #[test]
    fn dependency_conflict_has_its_own_code() {
        let app: AppError = CatalogError::DependencyConflict { id: "x".into() }.into();
        assert!(matches!(app, AppError::Conflict { ref code, .. } if code == "dependency_conflict"));
    }

    #[test]
    fn malformed_path_id_is_bad_request() {
        let err = path_id::<uuid::Uuid>("author", "42").unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
