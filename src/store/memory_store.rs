use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;

use super::{require_title, BookStore};
use crate::error::BookError;
use crate::models::{Book, BookPatch, NewBook};

/// Process-local record store, used when no MONGO_URI is configured.
/// Ids are ObjectId hex strings so they look the same as Mongo's.
#[derive(Default)]
pub struct MemoryBookStore {
    books: RwLock<Vec<Book>>,
}

impl MemoryBookStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for MemoryBookStore {
    async fn create(&self, fields: NewBook) -> Result<Book, BookError> {
        let title = require_title(fields.title.as_deref())?;
        let now = Utc::now();
        let book = Book {
            id: ObjectId::new().to_hex(),
            title,
            author: fields.author,
            publication: fields.publication,
            isbn: fields.isbn,
            description: fields.description,
            created_at: now,
            updated_at: now,
        };
        self.books.write().await.push(book.clone());
        Ok(book)
    }

    async fn get_all(&self) -> Result<Vec<Book>, BookError> {
        Ok(self.books.read().await.clone())
    }

    async fn get_by_id(&self, id: &str) -> Result<Book, BookError> {
        self.books
            .read()
            .await
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| BookError::NotFound(id.to_string()))
    }

    async fn update(&self, id: &str, patch: &BookPatch) -> Result<Book, BookError> {
        if patch.clears_title() {
            return Err(BookError::Invalid("title must not be empty".into()));
        }
        let mut books = self.books.write().await;
        let book = books
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| BookError::NotFound(id.to_string()))?;
        book.apply(patch);
        book.updated_at = Utc::now();
        Ok(book.clone())
    }

    async fn delete(&self, id: &str) -> Result<Book, BookError> {
        let mut books = self.books.write().await;
        let pos = books
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| BookError::NotFound(id.to_string()))?;
        Ok(books.remove(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_book(title: &str) -> NewBook {
        NewBook { title: Some(title.into()), ..Default::default() }
    }

    #[rocket::async_test]
    async fn create_assigns_id_and_timestamps() {
        let store = MemoryBookStore::new();
        let book = store.create(new_book("Dune")).await.unwrap();
        assert!(ObjectId::parse_str(&book.id).is_ok());
        assert_eq!(book.created_at, book.updated_at);
        assert_eq!(store.get_by_id(&book.id).await.unwrap(), book);
    }

    #[rocket::async_test]
    async fn create_rejects_blank_title() {
        let store = MemoryBookStore::new();
        let err = store.create(new_book("   ")).await.unwrap_err();
        assert!(matches!(err, BookError::Invalid(_)));
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[rocket::async_test]
    async fn list_keeps_insertion_order() {
        let store = MemoryBookStore::new();
        store.create(new_book("A")).await.unwrap();
        store.create(new_book("B")).await.unwrap();
        let titles: Vec<_> = store.get_all().await.unwrap().into_iter().map(|b| b.title).collect();
        assert_eq!(titles, ["A", "B"]);
    }

    #[rocket::async_test]
    async fn update_and_delete_unknown_id() {
        let store = MemoryBookStore::new();
        let missing = ObjectId::new().to_hex();
        let patch = BookPatch { author: Some("x".into()), ..Default::default() };
        assert!(matches!(store.update(&missing, &patch).await, Err(BookError::NotFound(_))));
        assert!(matches!(store.delete(&missing).await, Err(BookError::NotFound(_))));
    }

    #[rocket::async_test]
    async fn update_rejects_empty_title() {
        let store = MemoryBookStore::new();
        let book = store.create(new_book("Dune")).await.unwrap();
        let patch = BookPatch { title: Some("".into()), ..Default::default() };
        assert!(matches!(store.update(&book.id, &patch).await, Err(BookError::Invalid(_))));
        assert_eq!(store.get_by_id(&book.id).await.unwrap().title, "Dune");
    }

    #[rocket::async_test]
    async fn delete_returns_snapshot() {
        let store = MemoryBookStore::new();
        let book = store.create(new_book("Dune")).await.unwrap();
        assert_eq!(store.delete(&book.id).await.unwrap(), book);
        assert!(matches!(store.get_by_id(&book.id).await, Err(BookError::NotFound(_))));
    }
}
