//! Field validators for book records.
//!
//! These are pure functions with a single source of truth, called from two
//! places: the request boundary (first line of defense, client-facing
//! messages) and the repository commit path (last line of defense before
//! persistence). Both layers therefore agree on every edge case.

use std::collections::BTreeMap;

use thiserror::Error;
use time::{Date, OffsetDateTime};

use super::models::{BookDraft, BookPatch};

/// Message used for required text fields submitted blank.
pub const BLANK_FIELD_MESSAGE: &str = "This field may not be blank.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IsbnError {
    #[error("ISBN must contain only digits.")]
    NotDigits,
    #[error("ISBN must be 10 or 13 digits long.")]
    BadLength,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Publication date must be in the past.")]
pub struct FutureDate;

/// Field name to ordered list of human-readable messages. Collects every
/// violation, not just the first.
pub type FieldErrors = BTreeMap<&'static str, Vec<String>>;

/// ISBN shape check: decimal digits only, exactly 10 or 13 of them.
/// No check-digit verification.
pub fn validate_isbn(value: &str) -> Result<(), IsbnError> {
    if !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(IsbnError::NotDigits);
    }
    if value.len() != 10 && value.len() != 13 {
        return Err(IsbnError::BadLength);
    }
    Ok(())
}

/// Publication dates must not lie strictly after `today`.
pub fn validate_publication_date(value: Date, today: Date) -> Result<(), FutureDate> {
    if value > today {
        return Err(FutureDate);
    }
    Ok(())
}

/// Canonical "now" for date validation: UTC, date granularity.
pub fn today_utc() -> Date {
    OffsetDateTime::now_utc().date()
}

/// Run every field validator against a candidate record, aggregating all
/// violations per field.
pub fn validate_draft(draft: &BookDraft, today: Date) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if draft.title.trim().is_empty() {
        errors
            .entry("title")
            .or_default()
            .push(BLANK_FIELD_MESSAGE.to_string());
    }
    if draft.author.trim().is_empty() {
        errors
            .entry("author")
            .or_default()
            .push(BLANK_FIELD_MESSAGE.to_string());
    }
    if let Err(err) = validate_publication_date(draft.publication_date, today) {
        errors
            .entry("publication_date")
            .or_default()
            .push(err.to_string());
    }
    if let Err(err) = validate_isbn(&draft.isbn) {
        errors.entry("isbn").or_default().push(err.to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate only the fields a partial update supplies. The merged record is
/// still validated as a whole before commit.
pub fn validate_patch(patch: &BookPatch, today: Date) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if let Some(title) = &patch.title {
        if title.trim().is_empty() {
            errors
                .entry("title")
                .or_default()
                .push(BLANK_FIELD_MESSAGE.to_string());
        }
    }
    if let Some(author) = &patch.author {
        if author.trim().is_empty() {
            errors
                .entry("author")
                .or_default()
                .push(BLANK_FIELD_MESSAGE.to_string());
        }
    }
    if let Some(date) = patch.publication_date {
        if let Err(err) = validate_publication_date(date, today) {
            errors
                .entry("publication_date")
                .or_default()
                .push(err.to_string());
        }
    }
    if let Some(isbn) = &patch.isbn {
        if let Err(err) = validate_isbn(isbn) {
            errors.entry("isbn").or_default().push(err.to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn isbn_accepts_10_and_13_digit_strings() {
        assert_eq!(validate_isbn("1234567890"), Ok(()));
        assert_eq!(validate_isbn("1234567890123"), Ok(()));
    }

    #[test]
    fn isbn_rejects_non_digits() {
        assert_eq!(validate_isbn("invalid-isbn"), Err(IsbnError::NotDigits));
        assert_eq!(validate_isbn("123456789X"), Err(IsbnError::NotDigits));
        assert_eq!(validate_isbn("12345 7890"), Err(IsbnError::NotDigits));
    }

    #[test]
    fn isbn_rejects_wrong_lengths() {
        for len in [0usize, 1, 9, 11, 12, 14, 20] {
            let s = "7".repeat(len);
            assert_eq!(validate_isbn(&s), Err(IsbnError::BadLength), "len {len}");
        }
    }

    #[test]
    fn isbn_digit_check_takes_precedence_over_length() {
        // Wrong length AND non-digit: the format message wins.
        assert_eq!(validate_isbn("abc"), Err(IsbnError::NotDigits));
    }

    #[test]
    fn isbn_passes_iff_all_digits_and_len_10_or_13() {
        // Exhaustive over lengths 0..=20 with digit-only payloads.
        for len in 0usize..=20 {
            let s = "5".repeat(len);
            let expected = len == 10 || len == 13;
            assert_eq!(validate_isbn(&s).is_ok(), expected, "len {len}");
        }
    }

    #[test]
    fn publication_date_today_and_past_pass() {
        let today = date!(2024 - 06 - 15);
        assert_eq!(validate_publication_date(today, today), Ok(()));
        assert_eq!(
            validate_publication_date(date!(1999 - 12 - 31), today),
            Ok(())
        );
    }

    #[test]
    fn publication_date_tomorrow_fails() {
        let today = date!(2024 - 06 - 15);
        assert_eq!(
            validate_publication_date(date!(2024 - 06 - 16), today),
            Err(FutureDate)
        );
        assert_eq!(
            validate_publication_date(date!(2100 - 01 - 01), today),
            Err(FutureDate)
        );
    }

    #[test]
    fn draft_validation_collects_every_violation() {
        let draft = BookDraft {
            title: "".to_string(),
            author: "   ".to_string(),
            publication_date: date!(2100 - 01 - 01),
            isbn: "invalid-isbn".to_string(),
            summary: None,
        };
        let errors = validate_draft(&draft, date!(2024 - 06 - 15)).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert_eq!(errors["title"], vec![BLANK_FIELD_MESSAGE]);
        assert_eq!(errors["author"], vec![BLANK_FIELD_MESSAGE]);
        assert_eq!(
            errors["publication_date"],
            vec!["Publication date must be in the past."]
        );
        assert_eq!(errors["isbn"], vec!["ISBN must contain only digits."]);
    }

    #[test]
    fn patch_validation_skips_absent_fields() {
        let patch = BookPatch::default();
        assert!(validate_patch(&patch, date!(2024 - 06 - 15)).is_ok());
    }

    #[test]
    fn patch_validation_checks_supplied_fields() {
        let patch = BookPatch {
            title: Some("".to_string()),
            isbn: Some("invalid-isbn".to_string()),
            ..Default::default()
        };
        let errors = validate_patch(&patch, date!(2024 - 06 - 15)).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors["title"], vec![BLANK_FIELD_MESSAGE]);
        assert_eq!(errors["isbn"], vec!["ISBN must contain only digits."]);
    }

    #[test]
    fn patch_and_draft_validators_agree_on_shared_fields() {
        let today = date!(2024 - 06 - 15);
        for isbn in ["1234567890", "1234567890123", "invalid-isbn", "123"] {
            let draft = BookDraft {
                title: "T".to_string(),
                author: "A".to_string(),
                publication_date: date!(2020 - 01 - 01),
                isbn: isbn.to_string(),
                summary: None,
            };
            let patch = BookPatch {
                isbn: Some(isbn.to_string()),
                ..Default::default()
            };
            assert_eq!(
                validate_draft(&draft, today).is_ok(),
                validate_patch(&patch, today).is_ok(),
                "verdicts diverge for {isbn:?}"
            );
        }
    }

    #[test]
    fn draft_validation_passes_a_clean_record() {
        let draft = BookDraft {
            title: "Test Book".to_string(),
            author: "Test Author".to_string(),
            publication_date: date!(2020 - 01 - 01),
            isbn: "1234567890123".to_string(),
            summary: Some("Test Summary".to_string()),
        };
        assert!(validate_draft(&draft, date!(2024 - 06 - 15)).is_ok());
    }
}
