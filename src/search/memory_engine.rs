use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::{Book, BookPatch};
use super::{tokenize, SearchEngine};

/// Process-local mirror, used when SEARCH_URL is not set.
#[derive(Default)]
pub struct MemorySearchEngine {
    docs: RwLock<Vec<Book>>,
}

impl MemorySearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }
}

// Title hits count double, like the title^2 boost on the OpenSearch side.
// None when some token matches no field.
fn score(book: &Book, tokens: &[String]) -> Option<usize> {
    let title = tokenize(&book.title);
    let author = book.author.as_deref().map(tokenize).unwrap_or_default();
    let description = book.description.as_deref().map(tokenize).unwrap_or_default();

    let mut total = 0;
    for t in tokens {
        let hits = 2 * title.iter().filter(|w| *w == t).count()
            + author.iter().filter(|w| *w == t).count()
            + description.iter().filter(|w| *w == t).count();
        if hits == 0 {
            return None;
        }
        total += hits;
    }
    Some(total)
}

#[async_trait]
impl SearchEngine for MemorySearchEngine {
    async fn index_book(&self, book: &Book) -> Result<()> {
        let mut docs = self.docs.write().await;
        match docs.iter_mut().find(|d| d.id == book.id) {
            Some(d) => *d = book.clone(),
            None => docs.push(book.clone()),
        }
        Ok(())
    }

    async fn update_book(&self, book: &Book, changed: &BookPatch) -> Result<()> {
        let mut docs = self.docs.write().await;
        match docs.iter_mut().find(|d| d.id == book.id) {
            Some(d) => {
                // take the stored values, not the raw request
                let resolved = BookPatch {
                    title: changed.title.as_ref().map(|_| book.title.clone()),
                    author: changed.author.as_ref().and(book.author.clone()),
                    publication: changed.publication.as_ref().and(book.publication.clone()),
                    isbn: changed.isbn.as_ref().and(book.isbn.clone()),
                    description: changed.description.as_ref().and(book.description.clone()),
                };
                d.apply(&resolved);
                d.updated_at = book.updated_at;
            }
            None => docs.push(book.clone()),
        }
        Ok(())
    }

    async fn delete_book(&self, book_id: &str) -> Result<()> {
        self.docs.write().await.retain(|d| d.id != book_id);
        Ok(())
    }

    async fn search(&self, q: &str) -> Result<Vec<Book>> {
        let tokens = tokenize(q);
        if tokens.is_empty() {
            return Ok(vec![]);
        }
        let docs = self.docs.read().await;
        let mut hits: Vec<(usize, &Book)> = docs
            .iter()
            .filter_map(|b| score(b, &tokens).map(|s| (s, b)))
            .collect();
        // stable: equal scores keep indexing order
        hits.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(hits.into_iter().map(|(_, b)| b.clone()).collect())
    }

    async fn clear(&self) -> Result<()> {
        self.docs.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn book(id: &str, title: &str, author: Option<&str>, description: Option<&str>) -> Book {
        let now = Utc::now();
        Book {
            id: id.into(),
            title: title.into(),
            author: author.map(Into::into),
            publication: None,
            isbn: None,
            description: description.map(Into::into),
            created_at: now,
            updated_at: now,
        }
    }

    #[rocket::async_test]
    async fn tokens_are_anded_across_fields() {
        let engine = MemorySearchEngine::new();
        engine.index_book(&book("1", "Dune", Some("Frank Herbert"), None)).await.unwrap();
        engine.index_book(&book("2", "Dune Messiah", Some("Frank Herbert"), None)).await.unwrap();
        engine.index_book(&book("3", "Emma", Some("Jane Austen"), Some("a novel about dune"))).await.unwrap();

        // "dune" in title, "herbert" in author
        let ids: Vec<_> = engine.search("dune herbert").await.unwrap().into_iter().map(|b| b.id).collect();
        assert_eq!(ids, ["1", "2"]);

        assert!(engine.search("dune austen messiah").await.unwrap().is_empty());
        assert_eq!(engine.search("JANE dune").await.unwrap()[0].id, "3");
    }

    #[rocket::async_test]
    async fn isbn_and_publication_are_not_searched() {
        let engine = MemorySearchEngine::new();
        let mut b = book("1", "Dune", None, None);
        b.isbn = Some("9780441013593".into());
        b.publication = Some("Chilton".into());
        engine.index_book(&b).await.unwrap();
        assert!(engine.search("chilton").await.unwrap().is_empty());
        assert!(engine.search("9780441013593").await.unwrap().is_empty());
    }

    #[rocket::async_test]
    async fn punctuation_only_titles_are_not_searchable() {
        let engine = MemorySearchEngine::new();
        engine.index_book(&book("1", "?!", None, None)).await.unwrap();
        // no tokens on either side, like the standard analyzer
        assert!(engine.search("?!").await.unwrap().is_empty());
        assert_eq!(engine.len().await, 1);
    }

    #[rocket::async_test]
    async fn title_matches_rank_first() {
        let engine = MemorySearchEngine::new();
        engine.index_book(&book("a", "Other", None, Some("mentions rust once"))).await.unwrap();
        engine.index_book(&book("b", "Rust", None, None)).await.unwrap();
        let ids: Vec<_> = engine.search("rust").await.unwrap().into_iter().map(|b| b.id).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[rocket::async_test]
    async fn index_replaces_and_delete_removes() {
        let engine = MemorySearchEngine::new();
        engine.index_book(&book("1", "Dune", None, None)).await.unwrap();
        engine.index_book(&book("1", "Children of Dune", None, None)).await.unwrap();
        assert_eq!(engine.len().await, 1);
        assert_eq!(engine.search("children").await.unwrap().len(), 1);

        engine.delete_book("1").await.unwrap();
        engine.delete_book("1").await.unwrap();
        assert_eq!(engine.len().await, 0);
    }

    #[rocket::async_test]
    async fn update_merges_or_upserts() {
        let engine = MemorySearchEngine::new();
        let original = book("1", "Dune", Some("Frank Herbert"), None);
        engine.index_book(&original).await.unwrap();

        let mut stored = original.clone();
        stored.description = Some("desert planet".into());
        let changed = BookPatch { description: Some("desert planet".into()), ..Default::default() };
        engine.update_book(&stored, &changed).await.unwrap();
        let hit = &engine.search("desert").await.unwrap()[0];
        assert_eq!(hit.author.as_deref(), Some("Frank Herbert"));

        // missing id: the full document is inserted
        let other = book("2", "Emma", None, None);
        engine.update_book(&other, &BookPatch::default()).await.unwrap();
        assert_eq!(engine.search("emma").await.unwrap(), vec![other]);
    }
}
