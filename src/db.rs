use std::sync::Arc;

use anyhow::Result;

use crate::config::AppConfig;
use crate::error::BookError;
use crate::models::{Book, BookPatch, NewBook};
use crate::search::{MemorySearchEngine, OpenSearchEngine, SearchEngine};
use crate::store::{BookStore, MemoryBookStore, MongoBookStore};

/// Client handles for the record store and the search index mirror.
/// Built once at startup and handed to Rocket as managed state.
pub struct AppState {
    pub store: Arc<dyn BookStore>,
    pub search: Arc<dyn SearchEngine>,
}

pub async fn init_state(cfg: &AppConfig) -> Result<AppState> {
    let store: Arc<dyn BookStore> = match &cfg.mongo_uri {
        Some(uri) => {
            log::info!("record store: mongodb, database `{}`", cfg.db_name);
            Arc::new(MongoBookStore::connect(uri, &cfg.db_name).await?)
        }
        None => {
            log::warn!("MONGO_URI not set, books are kept in memory");
            Arc::new(MemoryBookStore::new())
        }
    };

    let search: Arc<dyn SearchEngine> = match &cfg.search_url {
        Some(url) => {
            log::info!("search index: opensearch at {url}, index `{}`", cfg.search_index);
            Arc::new(OpenSearchEngine::new(url, &cfg.search_index).await?)
        }
        None => {
            log::warn!("SEARCH_URL not set, search index is kept in memory");
            Arc::new(MemorySearchEngine::new())
        }
    };

    Ok(AppState::new(store, search))
}

impl AppState {
    pub fn new(store: Arc<dyn BookStore>, search: Arc<dyn SearchEngine>) -> Self {
        Self { store, search }
    }

    /// Store first; the mirror write only happens once the store accepted
    /// the book, and its failure does not undo the store write.
    pub async fn create_book(&self, fields: NewBook) -> Result<Book, BookError> {
        let book = self.store.create(fields).await?;
        if let Err(e) = self.search.index_book(&book).await {
            log::warn!("search index out of sync: index {} failed: {e:#}", book.id);
        }
        Ok(book)
    }

    pub async fn update_book(&self, id: &str, patch: &BookPatch) -> Result<Book, BookError> {
        let book = self.store.update(id, patch).await?;
        if let Err(e) = self.search.update_book(&book, patch).await {
            log::warn!("search index out of sync: update {} failed: {e:#}", book.id);
        }
        Ok(book)
    }

    pub async fn delete_book(&self, id: &str) -> Result<Book, BookError> {
        let book = self.store.delete(id).await?;
        if let Err(e) = self.search.delete_book(&book.id).await {
            log::warn!("search index out of sync: delete {} failed: {e:#}", book.id);
        }
        Ok(book)
    }

    /// Reads only the mirror.
    pub async fn search_books(&self, query: Option<&str>) -> Result<Vec<Book>, BookError> {
        let q = query.map(str::trim).filter(|q| !q.is_empty()).ok_or(BookError::EmptyQuery)?;
        self.search.search(q).await.map_err(BookError::Search)
    }

    /// Clears the mirror and indexes every book of the record store again.
    /// Returns how many books made it into the index.
    pub async fn rebuild_search_index(&self) -> Result<usize, BookError> {
        let books = self.store.get_all().await?;
        self.search.clear().await.map_err(BookError::Search)?;

        let mut indexed = 0;
        for book in &books {
            match self.search.index_book(book).await {
                Ok(()) => indexed += 1,
                Err(e) => log::warn!("reindex: skipping {}: {e:#}", book.id),
            }
        }
        log::info!("reindex: {indexed} of {} books indexed", books.len());
        Ok(indexed)
    }

    pub async fn close(&self) {
        self.store.close().await;
    }
}
