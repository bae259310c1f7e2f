use rocket::http::Status;
use rocket::response::{self, Responder, Response};
use rocket::serde::json::Json;
use rocket::Request;
use serde_json::json;
use thiserror::Error;

/// Errors raised by the record store, the search index and the dual-write
/// layer on top of them.
#[derive(Debug, Error)]
pub enum BookError {
    #[error("{0}")]
    Invalid(String),

    #[error("book {0} not found")]
    NotFound(String),

    #[error("search query must not be empty")]
    EmptyQuery,

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("search index error: {0:#}")]
    Search(anyhow::Error),
}

/// The one error shape the API sends: `{ "error": { "status", "message" } }`.
#[derive(Debug)]
pub struct ApiError {
    pub status: Status,
    pub message: String,
}

impl ApiError {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(Status::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(Status::NotFound, message)
    }
}

impl From<BookError> for ApiError {
    fn from(e: BookError) -> Self {
        let status = match e {
            BookError::Invalid(_) | BookError::EmptyQuery => Status::BadRequest,
            BookError::NotFound(_) => Status::NotFound,
            BookError::Database(_) | BookError::Search(_) => Status::InternalServerError,
        };
        ApiError::new(status, e.to_string())
    }
}

impl<'r> Responder<'r, 'static> for ApiError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        if self.status.code >= 500 {
            log::error!("{} {} -> {}: {}", req.method(), req.uri(), self.status.code, self.message);
        }
        let body = json!({
            "error": { "status": self.status.code, "message": self.message }
        });
        Response::build_from(Json(body).respond_to(req)?)
            .status(self.status)
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::from(BookError::Invalid("x".into())).status, Status::BadRequest);
        assert_eq!(ApiError::from(BookError::EmptyQuery).status, Status::BadRequest);
        assert_eq!(ApiError::from(BookError::NotFound("1".into())).status, Status::NotFound);
        let e = BookError::Search(anyhow::anyhow!("index down"));
        let api = ApiError::from(e);
        assert_eq!(api.status, Status::InternalServerError);
        assert!(api.message.contains("index down"));
    }
}
