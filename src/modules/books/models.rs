use serde::{Deserialize, Serialize};
use time::Date;

use bookstack_store::RecordId;

/// Store-assigned book identifier.
pub type BookId = RecordId;

/// A persisted catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub author: String,
    pub publication_date: Date,
    pub isbn: String,
    pub summary: Option<String>,
}

/// Candidate record supplied on create: everything but the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub publication_date: Date,
    pub isbn: String,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Partial update. Absent fields keep their current values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publication_date: Option<Date>,
    pub isbn: Option<String>,
    pub summary: Option<String>,
}

impl Book {
    /// Merge a patch over this record, producing the full candidate that
    /// must re-pass validation before commit.
    pub fn merged(&self, patch: BookPatch) -> BookDraft {
        BookDraft {
            title: patch.title.unwrap_or_else(|| self.title.clone()),
            author: patch.author.unwrap_or_else(|| self.author.clone()),
            publication_date: patch.publication_date.unwrap_or(self.publication_date),
            isbn: patch.isbn.unwrap_or_else(|| self.isbn.clone()),
            summary: patch.summary.or_else(|| self.summary.clone()),
        }
    }
}

/// Wire shape of the paginated list endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct BookPage {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<Book>,
}
