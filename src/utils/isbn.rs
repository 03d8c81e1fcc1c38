//! ISBN-10 / ISBN-13 check digits: validation, canonicalization, and synthesis.
//!
//! Everything here is a pure function of its inputs. Generators take the
//! random source as a parameter so callers can seed it.

use std::collections::HashSet;

use rand::Rng;
use thiserror::Error;

/// EAN prefix used for every generated ISBN-13.
const ISBN13_PREFIX: &str = "978";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsbnKind {
    Isbn10,
    Isbn13,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IsbnError {
    #[error("registration group must be a single digit, got {0}")]
    InvalidGroup(u8),
}

/// Strip hyphens and whitespace, the only separators ISBNs are printed with.
pub fn compact(input: &str) -> String {
    input
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect()
}

/// Returns which checksum rule `input` satisfies, if any.
pub fn classify(input: &str) -> Option<IsbnKind> {
    let compacted = compact(input);
    let bytes = compacted.as_bytes();
    match bytes.len() {
        10 if isbn10_is_valid(bytes) => Some(IsbnKind::Isbn10),
        13 if isbn13_is_valid(bytes) => Some(IsbnKind::Isbn13),
        _ => None,
    }
}

/// `true` when `input` is a well-formed ISBN-10 or ISBN-13 with a correct check character.
pub fn validate(input: &str) -> bool {
    classify(input).is_some()
}

/// The compact form of a valid ISBN, used as the storage and uniqueness key.
pub fn canonical(input: &str) -> Option<String> {
    let compacted = compact(input);
    classify(&compacted).map(|_| compacted)
}

fn digit(byte: u8) -> Option<u32> {
    byte.is_ascii_digit().then(|| u32::from(byte - b'0'))
}

fn isbn10_weighted_sum(body: &[u8]) -> Option<u32> {
    body.iter()
        .enumerate()
        .try_fold(0, |sum, (i, &b)| Some(sum + digit(b)? * (10 - i as u32)))
}

fn isbn13_weighted_sum(body: &[u8]) -> Option<u32> {
    body.iter().enumerate().try_fold(0, |sum, (i, &b)| {
        let weight = if i % 2 == 0 { 1 } else { 3 };
        Some(sum + digit(b)? * weight)
    })
}

fn isbn10_is_valid(bytes: &[u8]) -> bool {
    let Some(sum) = isbn10_weighted_sum(&bytes[..9]) else {
        return false;
    };
    let check = match bytes[9] {
        b'X' => 10,
        other => match digit(other) {
            Some(value) => value,
            None => return false,
        },
    };
    (sum + check) % 11 == 0
}

fn isbn13_is_valid(bytes: &[u8]) -> bool {
    match (isbn13_weighted_sum(&bytes[..12]), digit(bytes[12])) {
        (Some(sum), Some(check)) => check == (10 - sum % 10) % 10,
        _ => false,
    }
}

fn isbn10_check_char(body: &[u8]) -> char {
    let sum = isbn10_weighted_sum(body).unwrap_or_default();
    match (11 - sum % 11) % 11 {
        10 => 'X',
        value => char::from(b'0' + value as u8),
    }
}

fn isbn13_check_char(body: &[u8]) -> char {
    let sum = isbn13_weighted_sum(body).unwrap_or_default();
    char::from(b'0' + ((10 - sum % 10) % 10) as u8)
}

fn random_digits<R: Rng + ?Sized>(rng: &mut R, count: usize) -> String {
    (0..count)
        .map(|_| char::from(b'0' + rng.gen_range(0..=9u8)))
        .collect()
}

/// Generate a hyphenated ISBN-13: `978-g-pppp-tttt-c`.
///
/// `group` pins the registration group digit; `None` draws it at random.
pub fn generate_isbn13<R: Rng + ?Sized>(rng: &mut R, group: Option<u8>) -> Result<String, IsbnError> {
    let group = match group {
        Some(g) if g > 9 => return Err(IsbnError::InvalidGroup(g)),
        Some(g) => g,
        None => rng.gen_range(0..=9),
    };
    let publisher = random_digits(rng, 4);
    let title = random_digits(rng, 4);

    let body = format!("{ISBN13_PREFIX}{group}{publisher}{title}");
    let check = isbn13_check_char(body.as_bytes());

    Ok(format!("{ISBN13_PREFIX}-{group}-{publisher}-{title}-{check}"))
}

/// Generate a hyphenated ISBN-10: `g-ppp-ttttt-c`, group in 1..=9.
pub fn generate_isbn10<R: Rng + ?Sized>(rng: &mut R) -> String {
    let group: u8 = rng.gen_range(1..=9);
    let publisher = random_digits(rng, 3);
    let title = random_digits(rng, 5);

    let body = format!("{group}{publisher}{title}");
    let check = isbn10_check_char(body.as_bytes());

    format!("{group}-{publisher}-{title}-{check}")
}

/// Generate `count` distinct ISBN-13 values in first-generated order.
pub fn generate_batch<R: Rng + ?Sized>(rng: &mut R, count: usize) -> Vec<String> {
    // group is always None here, so generation cannot fail
    generate_distinct(rng, count, |rng| generate_isbn13(rng, None).ok())
}

/// Draw from `next` until `count` distinct values are collected.
///
/// `next` returning `None` ends the batch early.
pub fn generate_distinct<R, F>(rng: &mut R, count: usize, mut next: F) -> Vec<String>
where
    R: Rng + ?Sized,
    F: FnMut(&mut R) -> Option<String>,
{
    let mut seen = HashSet::with_capacity(count);
    let mut batch = Vec::with_capacity(count);
    while batch.len() < count {
        let Some(isbn) = next(rng) else {
            break;
        };
        if seen.insert(isbn.clone()) {
            batch.push(isbn);
        }
    }
    batch
}
