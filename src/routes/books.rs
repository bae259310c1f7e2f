use rocket::serde::json::{self, Json};
use rocket::{Route, State};
use serde::Serialize;

use crate::db::AppState;
use crate::error::{ApiError, BookError};
use crate::models::{Book, BookPatch, NewBook};

const MISSING_ID: &str = "Bad request, check given parameters. Please include book id.";

#[derive(Serialize)]
pub struct Created {
    message: &'static str,
    book: Book,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deleted {
    message: &'static str,
    deleted_book: Book,
}

// A body that isn't the expected JSON is a bad request like any other
// missing or wrong parameter, not Rocket's 422.
fn require_body<T>(body: Result<Json<T>, json::Error<'_>>) -> Result<T, ApiError> {
    body.map(Json::into_inner)
        .map_err(|e| ApiError::bad_request(format!("Bad request, check given parameters: {e}")))
}

fn require_id(id: &str) -> Result<&str, ApiError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ApiError::bad_request(MISSING_ID));
    }
    Ok(id)
}

/* ===== Handlers ===== */

// POST /books/create-book
#[post("/create-book", data = "<body>")]
pub async fn create(
    state: &State<AppState>,
    body: Result<Json<NewBook>, json::Error<'_>>,
) -> Result<Json<Created>, ApiError> {
    let fields = require_body(body)?;
    if !fields.has_title() {
        return Err(ApiError::bad_request(
            "Bad request, check given parameters, book must have a title",
        ));
    }

    let book = state.create_book(fields).await?;
    Ok(Json(Created { message: "Your new book has been saved successfully.", book }))
}

// GET /books/all
#[get("/all")]
pub async fn all(state: &State<AppState>) -> Result<Json<Vec<Book>>, ApiError> {
    Ok(Json(state.store.get_all().await?))
}

// GET /books/search/query?query=
#[get("/search/query?<query>")]
pub async fn search(state: &State<AppState>, query: Option<&str>) -> Result<Json<Vec<Book>>, ApiError> {
    match state.search_books(query).await {
        Ok(books) => Ok(Json(books)),
        Err(BookError::EmptyQuery) => Err(ApiError::bad_request(
            "Bad request, check given parameters. Please include a search query.",
        )),
        Err(e) => Err(e.into()),
    }
}

// GET /books/<id>
#[get("/<id>")]
pub async fn read(state: &State<AppState>, id: &str) -> Result<Json<Book>, ApiError> {
    let id = require_id(id)?;
    match state.store.get_by_id(id).await {
        Ok(book) => Ok(Json(book)),
        Err(BookError::NotFound(_)) => Err(ApiError::bad_request("Could not fetch books")),
        Err(e) => Err(e.into()),
    }
}

// PUT /books/update/<id>
#[put("/update/<id>", data = "<body>")]
pub async fn update(
    state: &State<AppState>,
    id: &str,
    body: Result<Json<BookPatch>, json::Error<'_>>,
) -> Result<Json<Book>, ApiError> {
    let id = require_id(id)?;
    let patch = require_body(body)?;
    match state.update_book(id, &patch).await {
        Ok(book) => Ok(Json(book)),
        Err(BookError::NotFound(_)) => Err(ApiError::not_found("Book not found")),
        Err(e) => Err(e.into()),
    }
}

// DELETE /books/delete/<id>
#[delete("/delete/<id>")]
pub async fn delete(state: &State<AppState>, id: &str) -> Result<Json<Deleted>, ApiError> {
    let id = require_id(id)?;
    match state.delete_book(id).await {
        Ok(book) => Ok(Json(Deleted { message: "Book deleted successfully", deleted_book: book })),
        Err(BookError::NotFound(_)) => Err(ApiError::not_found("Book not found")),
        Err(e) => Err(e.into()),
    }
}

pub fn routes() -> Vec<Route> {
    routes![create, all, search, read, update, delete]
}
