use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::catalog::{
    dates, query::SearchField, query::Searchable, validation::Validator, CatalogResult,
};

pub const NAME_MAX_CHARS: usize = 100;
pub const BIO_MAX_CHARS: usize = 1000;

/// Opaque, time-ordered author identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorId(Uuid);

impl AuthorId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl From<Uuid> for AuthorId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl FromStr for AuthorId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for AuthorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Stored author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: AuthorId,
    pub first_name: String,
    pub last_name: String,
    pub bio: Option<String>,
    #[serde(serialize_with = "dates::optional::serialize")]
    pub birth_date: Option<Date>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Searchable for Author {
    const SEARCH_FIELDS: &'static [SearchField] = &[SearchField::FirstName, SearchField::LastName];
}

/// Create request as received from a transport. Missing names arrive empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuthor {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub bio: Option<String>,
    pub birth_date: Option<String>,
}

/// Validated author fields, ready to be stamped with an id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuthor {
    pub first_name: String,
    pub last_name: String,
    pub bio: Option<String>,
    pub birth_date: Option<Date>,
}

impl CreateAuthor {
    pub fn validate(&self) -> CatalogResult<NewAuthor> {
        let mut v = Validator::new();
        let first_name = v.required_text("firstName", &self.first_name, NAME_MAX_CHARS);
        let last_name = v.required_text("lastName", &self.last_name, NAME_MAX_CHARS);
        let bio = v.optional_text("bio", self.bio.as_deref(), BIO_MAX_CHARS);
        let birth_date = v.optional_date("birthDate", self.birth_date.as_deref());

        v.finish(|| {
            Some(NewAuthor {
                first_name: first_name?,
                last_name: last_name?,
                bio,
                birth_date,
            })
        })
    }
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAuthor {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub birth_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorPatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub birth_date: Option<Date>,
}

impl UpdateAuthor {
    pub fn validate(&self) -> CatalogResult<AuthorPatch> {
        let mut v = Validator::new();
        let patch = AuthorPatch {
            first_name: v.replacement_text("firstName", self.first_name.as_deref(), NAME_MAX_CHARS),
            last_name: v.replacement_text("lastName", self.last_name.as_deref(), NAME_MAX_CHARS),
            bio: v.optional_text("bio", self.bio.as_deref(), BIO_MAX_CHARS),
            birth_date: v.optional_date("birthDate", self.birth_date.as_deref()),
        };
        v.finish(|| Some(patch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogError, ErrorKind};
    use time::macros::{date, datetime};

    #[test]
    fn create_requires_both_names() {
        let err = CreateAuthor::default().validate().unwrap_err();
        let CatalogError::InvalidInput(violations) = err else {
            panic!("expected InvalidInput");
        };
        let fields: Vec<&str> = violations.iter().map(|v| v.field).collect();
        assert_eq!(fields, vec!["firstName", "lastName"]);
    }

    #[test]
    fn create_parses_birth_date() {
        let input = CreateAuthor {
            first_name: "Ursula".into(),
            last_name: "Le Guin".into(),
            bio: Some("Earthsea".into()),
            birth_date: Some("1929-10-21".into()),
        };
        let author = input.validate().unwrap();
        assert_eq!(author.birth_date, Some(date!(1929 - 10 - 21)));
        assert_eq!(author.bio.as_deref(), Some("Earthsea"));
    }

    #[test]
    fn update_rejects_blank_replacement_name() {
        let input = UpdateAuthor {
            last_name: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(input.validate().unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn bio_over_limit_is_rejected() {
        let input = UpdateAuthor {
            bio: Some("b".repeat(BIO_MAX_CHARS + 1)),
            ..Default::default()
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn serializes_camel_case_with_calendar_dates() {
        let author = Author {
            id: "0190f1c4-8b5e-7c3a-9a3e-2f1d5c6b7a80".parse().unwrap(),
            first_name: "Ursula".into(),
            last_name: "Le Guin".into(),
            bio: None,
            birth_date: Some(date!(1929 - 10 - 21)),
            created_at: datetime!(2024-01-01 0:00 UTC),
            updated_at: datetime!(2024-01-02 0:00 UTC),
        };
        let json = serde_json::to_value(&author).unwrap();
        assert_eq!(json["firstName"], "Ursula");
        assert_eq!(json["birthDate"], "1929-10-21");
        assert_eq!(json["bio"], serde_json::Value::Null);
        assert_eq!(json["createdAt"], "2024-01-01T00:00:00Z");
    }
}
