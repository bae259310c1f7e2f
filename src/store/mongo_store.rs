use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime, Document},
    options::{ClientOptions, ReturnDocument},
    Client, Collection,
};

use super::{require_title, BookStore};
use crate::error::BookError;
use crate::models::{Book, BookDoc, BookPatch, NewBook};

pub struct MongoBookStore {
    client: Client,
    books: Collection<BookDoc>,
}

impl MongoBookStore {
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, BookError> {
        let mut opts = ClientOptions::parse(uri).await?;
        opts.app_name = Some("books-backend".into());

        let client = Client::with_options(opts)?;
        let books = client.database(db_name).collection::<BookDoc>("books");
        Ok(Self { client, books })
    }
}

// An id that is not a valid ObjectId can't name any stored book.
fn parse_id(id: &str) -> Result<ObjectId, BookError> {
    ObjectId::parse_str(id).map_err(|_| BookError::NotFound(id.to_string()))
}

fn set_doc(patch: &BookPatch) -> Document {
    let mut set = doc! { "updatedAt": DateTime::now() };
    if let Some(t) = &patch.title { set.insert("title", t.as_str()); }
    if let Some(a) = &patch.author { set.insert("author", a.as_str()); }
    if let Some(p) = &patch.publication { set.insert("publication", p.as_str()); }
    if let Some(i) = &patch.isbn { set.insert("isbn", i.as_str()); }
    if let Some(d) = &patch.description { set.insert("description", d.as_str()); }
    set
}

#[async_trait]
impl BookStore for MongoBookStore {
    async fn create(&self, fields: NewBook) -> Result<Book, BookError> {
        let title = require_title(fields.title.as_deref())?;
        let now = DateTime::now();

        let d = BookDoc {
            id: ObjectId::new(),
            title,
            author: fields.author,
            publication: fields.publication,
            isbn: fields.isbn,
            description: fields.description,
            created_at: now,
            updated_at: now,
        };
        self.books.insert_one(&d).await?;
        Ok(d.into())
    }

    async fn get_all(&self) -> Result<Vec<Book>, BookError> {
        let cursor = self.books.find(doc! {}).await?;
        let docs: Vec<BookDoc> = cursor.try_collect().await?;
        Ok(docs.into_iter().map(Book::from).collect())
    }

    async fn get_by_id(&self, id: &str) -> Result<Book, BookError> {
        let oid = parse_id(id)?;
        self.books
            .find_one(doc! { "_id": oid })
            .await?
            .map(Book::from)
            .ok_or_else(|| BookError::NotFound(id.to_string()))
    }

    async fn update(&self, id: &str, patch: &BookPatch) -> Result<Book, BookError> {
        if patch.clears_title() {
            return Err(BookError::Invalid("title must not be empty".into()));
        }
        let oid = parse_id(id)?;
        self.books
            .find_one_and_update(doc! { "_id": oid }, doc! { "$set": set_doc(patch) })
            .return_document(ReturnDocument::After)
            .await?
            .map(Book::from)
            .ok_or_else(|| BookError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<Book, BookError> {
        let oid = parse_id(id)?;
        self.books
            .find_one_and_delete(doc! { "_id": oid })
            .await?
            .map(Book::from)
            .ok_or_else(|| BookError::NotFound(id.to_string()))
    }

    async fn close(&self) {
        self.client.clone().shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_doc_only_carries_supplied_fields() {
        let patch = BookPatch { isbn: Some("123".into()), ..Default::default() };
        let set = set_doc(&patch);
        assert_eq!(set.get_str("isbn").unwrap(), "123");
        assert!(set.contains_key("updatedAt"));
        assert!(!set.contains_key("title"));
        assert!(!set.contains_key("author"));
    }

    #[test]
    fn malformed_id_is_not_found() {
        assert!(matches!(parse_id("not-an-oid"), Err(BookError::NotFound(_))));
        assert!(parse_id(&ObjectId::new().to_hex()).is_ok());
    }
}
