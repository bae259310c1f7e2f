#[macro_use] extern crate rocket;

use rocket::fairing::AdHoc;
use rocket::figment::Figment;
use rocket::http::{Method, Status};
use rocket::{Build, Request, Rocket};
use rocket_cors::{AllowedHeaders, AllowedOrigins, CorsOptions};

mod config;
mod db;
mod error;
mod models;
mod search;
mod store;
mod routes {
    pub mod books;

    #[cfg(test)]
    mod tests;
}

use error::ApiError;

#[catch(404)]
fn not_found() -> ApiError {
    ApiError::not_found("not found")
}

// Everything Rocket fails on by itself (bad JSON bodies, panics) gets the
// same error shape as the handlers.
#[catch(default)]
fn default_catcher(status: Status, _req: &Request<'_>) -> ApiError {
    ApiError::new(status, status.reason().unwrap_or("internal server error"))
}

// Open CORS, as for development.
fn cors() -> Result<rocket_cors::Cors, rocket_cors::Error> {
    CorsOptions {
        allowed_origins: AllowedOrigins::all(),
        allowed_methods: vec![
            Method::Get,
            Method::Post,
            Method::Put,
            Method::Delete,
            Method::Options,
        ].into_iter().map(From::from).collect(),
        allowed_headers: AllowedHeaders::some(&["Content-Type", "Accept", "Authorization"]),
        ..Default::default()
    }
    .to_cors()
}

/// Routes, catchers and the store lifecycle around an already built state.
pub fn app(figment: Figment, state: db::AppState) -> Rocket<Build> {
    rocket::custom(figment)
        .manage(state)
        .mount("/api/books", routes::books::routes())
        .register("/", catchers![not_found, default_catcher])
        .attach(AdHoc::on_shutdown("Close stores", |rocket| Box::pin(async move {
            if let Some(state) = rocket.state::<db::AppState>() {
                state.close().await;
            }
        })))
}

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::AppConfig::from_env()?;

    // 1) Stores are opened here and closed by the shutdown fairing.
    let state = db::init_state(&cfg).await?;

    // 2) An in-memory mirror starts empty, so it always has to be filled
    //    from the record store.
    if cfg.reindex_on_start || cfg.search_url.is_none() {
        state.rebuild_search_index().await?;
    }

    let figment = rocket::Config::figment()
        .merge(("address", cfg.host))
        .merge(("port", cfg.port));

    let _ = app(figment, state).attach(cors()?).launch().await?;
    Ok(())
}
