use anyhow::Result;
use async_trait::async_trait;
use crate::models::{Book, BookPatch};

pub mod memory_engine;
pub mod opensearch_engine;

pub use memory_engine::MemorySearchEngine;
pub use opensearch_engine::OpenSearchEngine;

/// The search index mirror. Derived from the record store and keyed by its
/// ids, so every write here is idempotent and safe to repeat.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Inserts or fully replaces the document for `book.id`.
    async fn index_book(&self, book: &Book) -> Result<()>;
    /// Merges the `changed` fields of `book` into the indexed document,
    /// inserting the whole of `book` if the id is not indexed yet.
    async fn update_book(&self, book: &Book, changed: &BookPatch) -> Result<()>;
    async fn delete_book(&self, book_id: &str) -> Result<()>;
    /// Every token of `q` must match in title, author or description.
    async fn search(&self, q: &str) -> Result<Vec<Book>>;
    /// Drops every indexed document.
    async fn clear(&self) -> Result<()>;
}

/// Lowercased alphanumeric runs, the same split the index analyzer does.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::tokenize;

    #[test]
    fn tokenize_splits_and_lowercases() {
        assert_eq!(tokenize("The Left-Hand of Darkness"), ["the", "left", "hand", "of", "darkness"]);
        assert_eq!(tokenize("  ,.; "), Vec::<String>::new());
        assert_eq!(tokenize("Catch-22"), ["catch", "22"]);
    }
}
