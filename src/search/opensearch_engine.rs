use anyhow::{anyhow, Result};
use async_trait::async_trait;
use opensearch::http::response::Response;
use opensearch::http::transport::Transport;
use opensearch::indices::{IndicesCreateParts, IndicesDeleteParts};
use opensearch::params::Refresh;
use opensearch::{DeleteParts, IndexParts, OpenSearch, SearchParts, UpdateParts};
use serde_json::{json, Value};

use crate::models::{Book, BookPatch, BookSearchDoc};
use super::SearchEngine;

const MAX_HITS: usize = 100;

pub struct OpenSearchEngine {
    client: OpenSearch,
    index: String,
}

impl OpenSearchEngine {
    pub async fn new(url: &str, index: &str) -> Result<Self> {
        let transport = Transport::single_node(url)?;
        let engine = Self { client: OpenSearch::new(transport), index: index.to_string() };
        engine.create_index().await?;
        Ok(engine)
    }

    // Creates the index if it doesn't exist yet.
    async fn create_index(&self) -> Result<()> {
        let res = self.client.indices()
            .create(IndicesCreateParts::Index(&self.index))
            .body(json!({
                "mappings": {
                    "properties": {
                        "bookId": { "type": "keyword" },
                        "title": { "type": "text" },
                        "author": { "type": "text" },
                        "description": { "type": "text" },
                        "publication": { "type": "keyword" },
                        "isbn": { "type": "keyword" },
                        "createdAt": { "type": "date" },
                        "updatedAt": { "type": "date" }
                    }
                }
            }))
            .send()
            .await?;

        if res.status_code().is_success() {
            return Ok(());
        }
        let body: Value = res.json().await?;
        if body["error"]["type"] == "resource_already_exists_exception" {
            return Ok(());
        }
        Err(anyhow!("creating index {}: {}", self.index, body["error"]))
    }
}

// Transport errors already surface through `?`; this turns an HTTP error
// status from the cluster into an error as well.
async fn check(res: Response, what: &str) -> Result<Response> {
    if res.status_code().is_success() {
        return Ok(res);
    }
    let status = res.status_code();
    let body = res.text().await.unwrap_or_default();
    Err(anyhow!("{what} failed with {status}: {body}"))
}

// Merge the changed fields; a missing document gets the whole book.
fn update_body(book: &Book, changed: &BookPatch) -> Value {
    json!({
        "doc": BookSearchDoc::partial(book, changed),
        "upsert": BookSearchDoc::from(book),
    })
}

// cross_fields + and: every term must occur, each in any of the fields.
fn search_body(q: &str) -> Value {
    json!({
        "query": {
            "multi_match": {
                "query": q,
                "type": "cross_fields",
                "operator": "and",
                "fields": ["title^2", "author", "description"]
            }
        },
        "size": MAX_HITS
    })
}

#[async_trait]
impl SearchEngine for OpenSearchEngine {
    // Writes wait for a refresh so a book can be found as soon as the
    // request that wrote it returns.
    async fn index_book(&self, book: &Book) -> Result<()> {
        let doc = BookSearchDoc::from(book);
        let res = self.client.index(IndexParts::IndexId(&self.index, &book.id))
            .body(&doc)
            .refresh(Refresh::WaitFor)
            .send()
            .await?;
        check(res, "index").await?;
        Ok(())
    }

    async fn update_book(&self, book: &Book, changed: &BookPatch) -> Result<()> {
        let res = self.client.update(UpdateParts::IndexId(&self.index, &book.id))
            .body(update_body(book, changed))
            .refresh(Refresh::WaitFor)
            .send()
            .await?;
        check(res, "update").await?;
        Ok(())
    }

    async fn delete_book(&self, book_id: &str) -> Result<()> {
        let res = self.client.delete(DeleteParts::IndexId(&self.index, book_id))
            .refresh(Refresh::WaitFor)
            .send()
            .await?;
        // already gone is fine
        if res.status_code().as_u16() == 404 {
            return Ok(());
        }
        check(res, "delete").await?;
        Ok(())
    }

    async fn search(&self, q: &str) -> Result<Vec<Book>> {
        let res = self.client
            .search(SearchParts::Index(&[self.index.as_str()]))
            .body(search_body(q))
            .send()
            .await?;

        let json: Value = check(res, "search").await?.json().await?;
        let mut books = Vec::new();

        if let Some(arr) = json["hits"]["hits"].as_array() {
            for h in arr {
                let doc: BookSearchDoc = serde_json::from_value(h["_source"].clone())?;
                books.push(doc.into());
            }
        }

        Ok(books)
    }

    async fn clear(&self) -> Result<()> {
        let res = self.client.indices()
            .delete(IndicesDeleteParts::Index(&[self.index.as_str()]))
            .send()
            .await?;
        if res.status_code().as_u16() != 404 {
            check(res, "delete index").await?;
        }
        self.create_index().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn stored() -> Book {
        let now = Utc::now();
        Book {
            id: "65f1c0ffee0000000000beef".into(),
            title: "Dune".into(),
            author: Some("Frank Herbert".into()),
            publication: None,
            isbn: Some("0441013597".into()),
            description: Some("desert planet".into()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn search_requires_every_term_in_any_field() {
        let body = search_body("dune herbert");
        let mm = &body["query"]["multi_match"];
        assert_eq!(mm["query"], "dune herbert");
        assert_eq!(mm["type"], "cross_fields");
        assert_eq!(mm["operator"], "and");
        assert_eq!(mm["fields"], json!(["title^2", "author", "description"]));
        assert_eq!(body["size"], MAX_HITS);
    }

    #[test]
    fn update_merges_changed_fields_and_upserts_the_book() {
        let book = stored();
        let changed = BookPatch { description: Some("desert planet".into()), ..Default::default() };
        let body = update_body(&book, &changed);

        let doc = body["doc"].as_object().unwrap();
        assert_eq!(doc["description"], "desert planet");
        assert!(doc.contains_key("updatedAt"));
        assert!(!doc.contains_key("title"));
        assert!(!doc.contains_key("author"));

        let upsert = &body["upsert"];
        assert_eq!(upsert["bookId"], book.id.as_str());
        assert_eq!(upsert["title"], "Dune");
        assert_eq!(upsert["author"], "Frank Herbert");
        assert!(upsert.get("_id").is_none());
    }
}
