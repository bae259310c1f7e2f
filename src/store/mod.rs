use async_trait::async_trait;

use crate::error::BookError;
use crate::models::{Book, BookPatch, NewBook};

pub mod memory_store;
pub mod mongo_store;

pub use memory_store::MemoryBookStore;
pub use mongo_store::MongoBookStore;

/// The system of record for books. Owns identity and timestamps.
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn create(&self, fields: NewBook) -> Result<Book, BookError>;
    async fn get_all(&self) -> Result<Vec<Book>, BookError>;
    async fn get_by_id(&self, id: &str) -> Result<Book, BookError>;
    async fn update(&self, id: &str, patch: &BookPatch) -> Result<Book, BookError>;
    async fn delete(&self, id: &str) -> Result<Book, BookError>;
    async fn close(&self) {}
}

/// Title rule shared by every store: present and not blank, on create and on update.
pub(crate) fn require_title(title: Option<&str>) -> Result<String, BookError> {
    match title {
        Some(t) if !t.trim().is_empty() => Ok(t.to_string()),
        _ => Err(BookError::Invalid("title is required".into())),
    }
}
