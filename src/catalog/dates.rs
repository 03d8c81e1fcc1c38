//! Calendar-date parsing and rendering for optional date fields.

use time::{format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime};

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp, keeping only the date.
pub fn parse(input: &str) -> Option<Date> {
    let input = input.trim();
    Date::parse(input, format_description!("[year]-[month]-[day]"))
        .ok()
        .or_else(|| OffsetDateTime::parse(input, &Rfc3339).ok().map(|dt| dt.date()))
}

/// Renders `YYYY-MM-DD`.
pub fn format(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}

/// `serialize_with` helper for `Option<Date>` fields.
pub mod optional {
    use serde::Serializer;
    use time::Date;

    pub fn serialize<S: Serializer>(date: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error> {
        match date {
            Some(date) => serializer.serialize_str(&super::format(*date)),
            None => serializer.serialize_none(),
        }
    }
}
