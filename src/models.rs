use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A book as returned by the API and by search.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Applies every supplied field of `patch`; omitted fields stay as they are.
    pub fn apply(&mut self, patch: &BookPatch) {
        if let Some(t) = &patch.title { self.title = t.clone(); }
        if let Some(a) = &patch.author { self.author = Some(a.clone()); }
        if let Some(p) = &patch.publication { self.publication = Some(p.clone()); }
        if let Some(i) = &patch.isbn { self.isbn = Some(i.clone()); }
        if let Some(d) = &patch.description { self.description = Some(d.clone()); }
    }
}

/// Body of POST /create-book. `title` is optional here so a missing title
/// reaches validation instead of failing JSON parsing.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct NewBook {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publication: Option<String>,
    pub isbn: Option<String>,
    pub description: Option<String>,
}

impl NewBook {
    pub fn has_title(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

/// Body of PUT /update/<id>: only the supplied fields are changed.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub publication: Option<String>,
    pub isbn: Option<String>,
    pub description: Option<String>,
}

impl BookPatch {
    pub fn clears_title(&self) -> bool {
        self.title.as_deref().is_some_and(|t| t.trim().is_empty())
    }
}

/// Record Store representation (collection "books").
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookDoc {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

impl From<BookDoc> for Book {
    fn from(d: BookDoc) -> Self {
        Book {
            id: d.id.to_hex(),
            title: d.title,
            author: d.author,
            publication: d.publication,
            isbn: d.isbn,
            description: d.description,
            created_at: d.created_at.to_chrono(),
            updated_at: d.updated_at.to_chrono(),
        }
    }
}

/// Search Index Mirror representation. The id lives in `book_id` because
/// `_id` is index metadata and can't be part of the source document.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BookSearchDoc {
    pub book_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookSearchDoc {
    /// Partial document for a mirror merge: the fields the request supplied,
    /// carrying the store's post-write values, plus `updatedAt`.
    pub fn partial(book: &Book, changed: &BookPatch) -> Value {
        let mut m = Map::new();
        if changed.title.is_some() {
            m.insert("title".into(), Value::from(book.title.clone()));
        }
        let optional = [
            ("author", changed.author.is_some(), &book.author),
            ("publication", changed.publication.is_some(), &book.publication),
            ("isbn", changed.isbn.is_some(), &book.isbn),
            ("description", changed.description.is_some(), &book.description),
        ];
        for (key, supplied, value) in optional {
            if supplied {
                m.insert(key.into(), value.clone().map(Value::from).unwrap_or(Value::Null));
            }
        }
        m.insert("updatedAt".into(), serde_json::to_value(book.updated_at).unwrap_or(Value::Null));
        Value::Object(m)
    }
}

impl From<&Book> for BookSearchDoc {
    fn from(b: &Book) -> Self {
        BookSearchDoc {
            book_id: b.id.clone(),
            title: b.title.clone(),
            author: b.author.clone(),
            publication: b.publication.clone(),
            isbn: b.isbn.clone(),
            description: b.description.clone(),
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

impl From<BookSearchDoc> for Book {
    fn from(d: BookSearchDoc) -> Self {
        Book {
            id: d.book_id,
            title: d.title,
            author: d.author,
            publication: d.publication,
            isbn: d.isbn,
            description: d.description,
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}
