//! HTTP handlers for the books module.
//!
//! Request lifecycle: parse → validate at the boundary → delegate to the
//! repository → translate domain errors into structured responses. The
//! repository re-runs the same validators before commit, so a handler bug
//! can never persist an invalid record.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;

use bookstack_http::error::AppError;
use bookstack_http::extract::{Json, Query};

use super::models::{Book, BookDraft, BookId, BookPage, BookPatch};
use super::repository::{BookListing, BookRepository, RepositoryError};
use super::validation::{self, FieldErrors};

pub(super) type Repo = Arc<dyn BookRepository>;

const LIST_PATH: &str = "/api/books";

#[derive(Debug, Deserialize)]
pub(super) struct ListParams {
    #[serde(default = "default_page")]
    page: usize,
}

fn default_page() -> usize {
    1
}

/// GET / — one page of the catalog, title-ascending.
pub(super) async fn list_books(
    State(repo): State<Repo>,
    Query(params): Query<ListParams>,
) -> Result<Json<BookPage>, AppError> {
    let listing = repo.list(params.page).await?;
    Ok(Json(page_payload(listing)))
}

/// POST / — validate a candidate book and persist it.
pub(super) async fn create_book(
    State(repo): State<Repo>,
    Json(draft): Json<BookDraft>,
) -> Result<impl IntoResponse, AppError> {
    // First line of defense: reject malformed input before touching storage.
    validation::validate_draft(&draft, validation::today_utc()).map_err(validation_response)?;

    let book = repo.create(draft).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// GET /{id}
pub(super) async fn get_book(
    State(repo): State<Repo>,
    Path(id): Path<BookId>,
) -> Result<Json<Book>, AppError> {
    Ok(Json(repo.get(id).await?))
}

/// PUT /{id} and PATCH /{id} — partial update; unsupplied fields keep their
/// current values and the merged record is re-validated as a whole.
pub(super) async fn update_book(
    State(repo): State<Repo>,
    Path(id): Path<BookId>,
    Json(patch): Json<BookPatch>,
) -> Result<Json<Book>, AppError> {
    // Boundary check on the supplied fields only; the repository validates
    // the merged record as a whole before commit.
    validation::validate_patch(&patch, validation::today_utc()).map_err(validation_response)?;

    Ok(Json(repo.update(id, patch).await?))
}

/// DELETE /{id} — unconditional hard delete.
pub(super) async fn delete_book(
    State(repo): State<Repo>,
    Path(id): Path<BookId>,
) -> Result<StatusCode, AppError> {
    repo.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn page_payload(listing: BookListing) -> BookPage {
    let next = listing
        .has_next()
        .then(|| format!("{}?page={}", LIST_PATH, listing.page + 1));
    let previous = listing.has_previous().then(|| {
        if listing.page == 2 {
            LIST_PATH.to_string()
        } else {
            format!("{}?page={}", LIST_PATH, listing.page - 1)
        }
    });
    BookPage {
        count: listing.count,
        next,
        previous,
        results: listing.results,
    }
}

/// Flatten per-field messages into the error envelope's `details` list.
fn validation_response(errors: FieldErrors) -> AppError {
    let details = errors
        .iter()
        .flat_map(|(field, messages)| {
            messages
                .iter()
                .map(move |message| json!({"field": field, "error": message}))
        })
        .collect();
    AppError::validation(details, "Invalid data.")
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(_) => AppError::not_found("Book not found."),
            RepositoryError::InvalidPage => AppError::not_found("Invalid page."),
            RepositoryError::DuplicateIsbn => AppError::unique("ISBN must be unique."),
            RepositoryError::Validation(errors) => validation_response(errors),
            other => AppError::Internal(anyhow::Error::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn listing(count: usize, page: usize, page_size: usize) -> BookListing {
        BookListing {
            count,
            page,
            page_size,
            results: vec![],
        }
    }

    #[test]
    fn first_page_has_no_previous_link() {
        let payload = page_payload(listing(5, 1, 2));
        assert_eq!(payload.next.as_deref(), Some("/api/books?page=2"));
        assert_eq!(payload.previous, None);
    }

    #[test]
    fn second_page_links_back_to_the_bare_path() {
        let payload = page_payload(listing(5, 2, 2));
        assert_eq!(payload.next.as_deref(), Some("/api/books?page=3"));
        assert_eq!(payload.previous.as_deref(), Some("/api/books"));
    }

    #[test]
    fn last_page_has_no_next_link() {
        let payload = page_payload(listing(5, 3, 2));
        assert_eq!(payload.next, None);
        assert_eq!(payload.previous.as_deref(), Some("/api/books?page=2"));
    }

    #[test]
    fn repository_errors_map_to_the_documented_responses() {
        let not_found: AppError = RepositoryError::NotFound(7).into();
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let duplicate: AppError = RepositoryError::DuplicateIsbn.into();
        assert_eq!(duplicate.into_response().status(), StatusCode::BAD_REQUEST);

        let mut errors = FieldErrors::new();
        errors
            .entry("publication_date")
            .or_default()
            .push("Publication date must be in the past.".to_string());
        let validation: AppError = RepositoryError::Validation(errors).into();
        assert_eq!(validation.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn validation_details_carry_one_entry_per_message() {
        let draft = BookDraft {
            title: "".to_string(),
            author: "Test Author".to_string(),
            publication_date: date!(2100 - 01 - 01),
            isbn: "invalid-isbn".to_string(),
            summary: None,
        };
        let errors = validation::validate_draft(&draft, date!(2024 - 06 - 15)).unwrap_err();
        match validation_response(errors) {
            AppError::Validation { details, .. } => {
                assert_eq!(details.len(), 3);
                assert!(details.contains(&json!({
                    "field": "isbn",
                    "error": "ISBN must contain only digits."
                })));
                assert!(details.contains(&json!({
                    "field": "publication_date",
                    "error": "Publication date must be in the past."
                })));
                assert!(details.contains(&json!({
                    "field": "title",
                    "error": "This field may not be blank."
                })));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
