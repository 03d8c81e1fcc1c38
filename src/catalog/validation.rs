//! Field-level checks that run before any store access.
//!
//! Each input type owns a `validate` function built from a [`Validator`];
//! every failing field is collected so the caller sees all problems at once.

use std::str::FromStr;

use time::Date;

use super::dates;
use super::error::{CatalogError, CatalogResult, Violation};
use crate::utils::isbn;

#[derive(Debug, Default)]
pub struct Validator {
    violations: Vec<Violation>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    fn reject(&mut self, field: &'static str, message: impl Into<String>) {
        self.violations.push(Violation::new(field, message));
    }

    fn check_length(&mut self, field: &'static str, value: &str, max: usize) -> bool {
        if value.chars().count() > max {
            self.reject(field, format!("must be at most {max} characters"));
            return false;
        }
        true
    }

    /// Non-blank text of at most `max` characters.
    pub fn required_text(&mut self, field: &'static str, value: &str, max: usize) -> Option<String> {
        if value.trim().is_empty() {
            self.reject(field, "must not be empty");
            return None;
        }
        self.check_length(field, value, max)
            .then(|| value.to_string())
    }

    /// Like [`required_text`](Self::required_text), but only when supplied.
    pub fn replacement_text(
        &mut self,
        field: &'static str,
        value: Option<&str>,
        max: usize,
    ) -> Option<String> {
        value.and_then(|value| self.required_text(field, value, max))
    }

    pub fn optional_text(
        &mut self,
        field: &'static str,
        value: Option<&str>,
        max: usize,
    ) -> Option<String> {
        let value = value?;
        self.check_length(field, value, max)
            .then(|| value.to_string())
    }

    pub fn optional_date(&mut self, field: &'static str, value: Option<&str>) -> Option<Date> {
        let value = value?;
        let parsed = dates::parse(value);
        if parsed.is_none() {
            self.reject(field, "must be a date in YYYY-MM-DD or RFC 3339 format");
        }
        parsed
    }

    /// Canonical compact ISBN when `value` passes the ISBN-10 or ISBN-13 checksum.
    pub fn isbn(&mut self, field: &'static str, value: &str) -> Option<String> {
        let canonical = isbn::canonical(value);
        if canonical.is_none() {
            self.reject(field, "must be a valid ISBN-10 or ISBN-13");
        }
        canonical
    }

    pub fn identifier<T: FromStr>(&mut self, field: &'static str, value: &str) -> Option<T> {
        let parsed = value.trim().parse().ok();
        if parsed.is_none() {
            self.reject(field, "must be a UUID");
        }
        parsed
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// `Ok(value)` when nothing was rejected, otherwise every violation.
    pub fn finish<T>(self, build: impl FnOnce() -> Option<T>) -> CatalogResult<T> {
        if !self.violations.is_empty() {
            return Err(CatalogError::InvalidInput(self.violations));
        }
        // A clean validator always produced every required piece.
        build().ok_or_else(|| CatalogError::invalid("input", "is incomplete"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ErrorKind;

    #[test]
    fn collects_every_violation() {
        let mut v = Validator::new();
        v.required_text("firstName", "   ", 100);
        v.required_text("lastName", &"x".repeat(101), 100);
        v.optional_date("birthDate", Some("not-a-date"));
        v.isbn("isbn", "0306406153");

        let err = v.finish(|| Some(())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let CatalogError::InvalidInput(violations) = err else {
            panic!("expected InvalidInput");
        };
        let fields: Vec<&str> = violations.iter().map(|v| v.field).collect();
        assert_eq!(fields, vec!["firstName", "lastName", "birthDate", "isbn"]);
    }

    #[test]
    fn length_limits_count_characters_not_bytes() {
        let mut v = Validator::new();
        let accented = "é".repeat(100);
        assert_eq!(v.required_text("lastName", &accented, 100), Some(accented.clone()));
        assert!(v.is_clean());
    }

    #[test]
    fn absent_optional_fields_are_not_violations() {
        let mut v = Validator::new();
        assert_eq!(v.optional_text("bio", None, 1000), None);
        assert_eq!(v.optional_date("birthDate", None), None);
        assert_eq!(v.replacement_text("title", None, 500), None);
        assert!(v.is_clean());
    }

    #[test]
    fn isbn_is_canonicalized() {
        let mut v = Validator::new();
        assert_eq!(v.isbn("isbn", "978-0-306-40615-7").as_deref(), Some("9780306406157"));
        assert!(v.is_clean());
    }
}
