use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use bookstack_store::{MemoryStore, Row, StoreError, TableSchema};

use super::models::{Book, BookDraft, BookId, BookPatch};
use super::validation::{self, FieldErrors};

/// Schema handed to the store at startup. The unique index on `isbn` is the
/// authoritative, race-free uniqueness guard; `title` and `author` are
/// indexed for lookup.
pub const BOOKS_SCHEMA: TableSchema = TableSchema {
    name: "books",
    unique: &["isbn"],
    indexed: &["title", "author"],
};

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Book {0} not found")]
    NotFound(BookId),

    #[error("ISBN must be unique.")]
    DuplicateIsbn,

    #[error("Invalid page.")]
    InvalidPage,

    #[error("book failed validation")]
    Validation(FieldErrors),

    #[error("Failed to deserialize book: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("store failure: {0}")]
    Store(StoreError),
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        match err {
            // `isbn` is the only unique column on the books table.
            StoreError::UniqueViolation { .. } => RepositoryError::DuplicateIsbn,
            StoreError::NotFound { id, .. } => RepositoryError::NotFound(id),
            other => RepositoryError::Store(other),
        }
    }
}

/// One page of the catalog listing, title-ascending.
#[derive(Debug)]
pub struct BookListing {
    pub count: usize,
    pub page: usize,
    pub page_size: usize,
    pub results: Vec<Book>,
}

impl BookListing {
    pub fn has_next(&self) -> bool {
        self.page * self.page_size < self.count
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Lists one page of books sorted by title ascending. Pages are
    /// 1-based; a page past the end fails with `InvalidPage`.
    async fn list(&self, page: usize) -> Result<BookListing, RepositoryError>;
    /// Validates and persists a candidate book, returning it with its
    /// assigned id.
    async fn create(&self, draft: BookDraft) -> Result<Book, RepositoryError>;
    /// Retrieves a book by id.
    async fn get(&self, id: BookId) -> Result<Book, RepositoryError>;
    /// Applies a partial update, re-validating the merged record as a whole
    /// before commit.
    async fn update(&self, id: BookId, patch: BookPatch) -> Result<Book, RepositoryError>;
    /// Hard-deletes a book by id.
    async fn delete(&self, id: BookId) -> Result<(), RepositoryError>;
}

/// Repository backed by the embedded record store.
pub struct StoreBookRepository {
    store: MemoryStore,
    page_size: usize,
}

impl StoreBookRepository {
    pub fn new(store: MemoryStore, page_size: usize) -> Self {
        Self { store, page_size }
    }

    fn all_books_by_title(&self) -> Result<Vec<Book>, RepositoryError> {
        let mut books = self
            .store
            .scan(BOOKS_SCHEMA.name)
            .map_err(RepositoryError::from)?
            .into_iter()
            .map(|(id, row)| from_row(id, row))
            .collect::<Result<Vec<_>, _>>()?;
        // Id as tiebreaker keeps ordering deterministic between equal titles.
        books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(books)
    }
}

#[async_trait]
impl BookRepository for StoreBookRepository {
    async fn list(&self, page: usize) -> Result<BookListing, RepositoryError> {
        let books = self.all_books_by_title()?;
        let count = books.len();
        let last_page = count.div_ceil(self.page_size).max(1);
        if page == 0 || page > last_page {
            return Err(RepositoryError::InvalidPage);
        }
        let results = books
            .into_iter()
            .skip((page - 1) * self.page_size)
            .take(self.page_size)
            .collect();
        Ok(BookListing {
            count,
            page,
            page_size: self.page_size,
            results,
        })
    }

    async fn create(&self, draft: BookDraft) -> Result<Book, RepositoryError> {
        // Last line of defense: the same validators the request boundary
        // already ran. Nothing invalid reaches the store.
        validation::validate_draft(&draft, validation::today_utc())
            .map_err(RepositoryError::Validation)?;

        let id = self.store.insert(BOOKS_SCHEMA.name, to_row(&draft)?)?;
        tracing::debug!(id, isbn = %draft.isbn, "book created");
        Ok(hydrate(id, draft))
    }

    async fn get(&self, id: BookId) -> Result<Book, RepositoryError> {
        let row = self.store.get(BOOKS_SCHEMA.name, id)?;
        from_row(id, row)
    }

    async fn update(&self, id: BookId, patch: BookPatch) -> Result<Book, RepositoryError> {
        let current = self.get(id).await?;
        let merged = current.merged(patch);

        validation::validate_draft(&merged, validation::today_utc())
            .map_err(RepositoryError::Validation)?;

        // The store re-checks isbn uniqueness excluding this record.
        self.store.update(BOOKS_SCHEMA.name, id, to_row(&merged)?)?;
        tracing::debug!(id, "book updated");
        Ok(hydrate(id, merged))
    }

    async fn delete(&self, id: BookId) -> Result<(), RepositoryError> {
        self.store.delete(BOOKS_SCHEMA.name, id)?;
        tracing::debug!(id, "book deleted");
        Ok(())
    }
}

fn to_row(draft: &BookDraft) -> Result<Row, serde_json::Error> {
    match serde_json::to_value(draft)? {
        Value::Object(map) => Ok(map),
        // A struct with named fields always serializes to an object.
        _ => unreachable!("book draft serialized to a non-object"),
    }
}

fn from_row(id: BookId, mut row: Row) -> Result<Book, RepositoryError> {
    row.insert("id".to_string(), json!(id));
    serde_json::from_value(Value::Object(row)).map_err(RepositoryError::from)
}

fn hydrate(id: BookId, draft: BookDraft) -> Book {
    Book {
        id,
        title: draft.title,
        author: draft.author,
        publication_date: draft.publication_date,
        isbn: draft.isbn,
        summary: draft.summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn repository() -> StoreBookRepository {
        let store = MemoryStore::new();
        store.define_table(BOOKS_SCHEMA);
        StoreBookRepository::new(store, 10)
    }

    fn draft(title: &str, isbn: &str) -> BookDraft {
        BookDraft {
            title: title.to_string(),
            author: "Test Author".to_string(),
            publication_date: date!(2020 - 01 - 01),
            isbn: isbn.to_string(),
            summary: None,
        }
    }

    #[tokio::test]
    async fn create_assigns_an_id_and_get_round_trips() {
        let repo = repository();
        let created = repo.create(draft("Test Book", "1234567890123")).await.unwrap();
        let fetched = repo.get(created.id).await.unwrap();
        assert_eq!(created, fetched);
    }

    #[tokio::test]
    async fn create_rejects_invalid_drafts_even_without_boundary_checks() {
        let repo = repository();
        let err = repo.create(draft("Test Book", "invalid-isbn")).await.unwrap_err();
        match err {
            RepositoryError::Validation(errors) => {
                assert_eq!(errors["isbn"], vec!["ISBN must contain only digits."]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn duplicate_isbn_is_a_distinct_error() {
        let repo = repository();
        repo.create(draft("First", "1234567890123")).await.unwrap();
        let err = repo.create(draft("Second", "1234567890123")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateIsbn));
    }

    #[tokio::test]
    async fn list_is_title_ascending_regardless_of_insertion_order() {
        let repo = repository();
        repo.create(draft("Zen", "1111111111")).await.unwrap();
        repo.create(draft("Aardvark", "2222222222")).await.unwrap();
        repo.create(draft("Middle", "3333333333")).await.unwrap();

        let listing = repo.list(1).await.unwrap();
        let titles: Vec<_> = listing.results.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, ["Aardvark", "Middle", "Zen"]);
        assert_eq!(listing.count, 3);
    }

    #[tokio::test]
    async fn list_pages_report_neighbours() {
        let store = MemoryStore::new();
        store.define_table(BOOKS_SCHEMA);
        let repo = StoreBookRepository::new(store, 2);

        for (i, title) in ["A", "B", "C", "D", "E"].iter().enumerate() {
            repo.create(draft(title, &format!("{}", 1111111110 + i as u64)))
                .await
                .unwrap();
        }

        let first = repo.list(1).await.unwrap();
        assert!(first.has_next() && !first.has_previous());
        let second = repo.list(2).await.unwrap();
        assert!(second.has_next() && second.has_previous());
        let third = repo.list(3).await.unwrap();
        assert!(!third.has_next() && third.has_previous());
        assert_eq!(third.results.len(), 1);

        assert!(matches!(
            repo.list(4).await.unwrap_err(),
            RepositoryError::InvalidPage
        ));
        assert!(matches!(
            repo.list(0).await.unwrap_err(),
            RepositoryError::InvalidPage
        ));
    }

    #[tokio::test]
    async fn empty_catalog_still_has_a_first_page() {
        let repo = repository();
        let listing = repo.list(1).await.unwrap();
        assert_eq!(listing.count, 0);
        assert!(listing.results.is_empty());
        assert!(!listing.has_next() && !listing.has_previous());
    }

    #[tokio::test]
    async fn partial_update_keeps_unspecified_fields() {
        let repo = repository();
        let created = repo
            .create(BookDraft {
                summary: Some("Test Summary".to_string()),
                ..draft("Test Book", "1234567890123")
            })
            .await
            .unwrap();

        let patch = BookPatch {
            title: Some("Updated Title".to_string()),
            ..Default::default()
        };
        let updated = repo.update(created.id, patch).await.unwrap();

        assert_eq!(updated.title, "Updated Title");
        assert_eq!(updated.author, created.author);
        assert_eq!(updated.isbn, created.isbn);
        assert_eq!(updated.publication_date, created.publication_date);
        assert_eq!(updated.summary, created.summary);
    }

    #[tokio::test]
    async fn update_revalidates_the_merged_record() {
        let repo = repository();
        let created = repo.create(draft("Test Book", "1234567890123")).await.unwrap();

        let patch = BookPatch {
            publication_date: Some(date!(2100 - 01 - 01)),
            ..Default::default()
        };
        let err = repo.update(created.id, patch).await.unwrap_err();
        match err {
            RepositoryError::Validation(errors) => {
                assert_eq!(
                    errors["publication_date"],
                    vec!["Publication date must be in the past."]
                );
            }
            other => panic!("expected validation error, got {other:?}"),
        }

        // Failed update touched no state.
        let fetched = repo.get(created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn update_cannot_steal_an_existing_isbn() {
        let repo = repository();
        repo.create(draft("First", "1234567890123")).await.unwrap();
        let second = repo.create(draft("Second", "9876543210987")).await.unwrap();

        let patch = BookPatch {
            isbn: Some("1234567890123".to_string()),
            ..Default::default()
        };
        let err = repo.update(second.id, patch).await.unwrap_err();
        assert!(matches!(err, RepositoryError::DuplicateIsbn));
    }

    #[tokio::test]
    async fn update_keeping_own_isbn_is_not_a_collision() {
        let repo = repository();
        let created = repo.create(draft("Test Book", "1234567890123")).await.unwrap();

        let patch = BookPatch {
            isbn: Some("1234567890123".to_string()),
            title: Some("Updated Title".to_string()),
            ..Default::default()
        };
        let updated = repo.update(created.id, patch).await.unwrap();
        assert_eq!(updated.title, "Updated Title");
    }

    #[tokio::test]
    async fn deleted_books_are_gone_for_every_operation() {
        let repo = repository();
        let created = repo.create(draft("Test Book", "1234567890123")).await.unwrap();
        repo.delete(created.id).await.unwrap();

        assert!(matches!(
            repo.get(created.id).await.unwrap_err(),
            RepositoryError::NotFound(_)
        ));
        assert!(matches!(
            repo.update(created.id, BookPatch::default()).await.unwrap_err(),
            RepositoryError::NotFound(_)
        ));
        assert!(matches!(
            repo.delete(created.id).await.unwrap_err(),
            RepositoryError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn boundary_and_repository_validators_agree() {
        // Same inputs through the pure validators (request boundary) and
        // through create (model layer): identical verdicts and messages.
        let repo = repository();
        let cases = [
            ("1234567890", true),
            ("1234567890123", true),
            ("invalid-isbn", false),
            ("123", false),
        ];
        for (i, (isbn, ok)) in cases.into_iter().enumerate() {
            let candidate = draft(&format!("Book {i}"), isbn);
            let boundary = validation::validate_draft(&candidate, validation::today_utc());
            let model = repo.create(candidate).await;
            assert_eq!(boundary.is_ok(), ok, "boundary verdict for {isbn:?}");
            assert_eq!(model.is_ok(), ok, "model verdict for {isbn:?}");
            if let (Err(boundary_errors), Err(RepositoryError::Validation(model_errors))) =
                (boundary, model)
            {
                assert_eq!(boundary_errors, model_errors);
            }
        }
    }
}
