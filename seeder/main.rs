use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use dotenvy::dotenv;
use fake::faker::lorem::en::{Sentence, Words};
use fake::faker::name::raw::Name;
use fake::locales::EN;
use fake::Fake;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime},
    options::ClientOptions,
    Client, Collection,
};
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

const BOOKS: usize = 50;

// Same shape as the server's record store documents.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
struct BookDoc {
    #[serde(rename = "_id")]
    id: ObjectId,
    title: String,
    author: Option<String>,
    publication: Option<String>,
    isbn: Option<String>,
    description: Option<String>,
    created_at: DateTime,
    updated_at: DateTime,
}

fn title_case(words: Vec<String>) -> String {
    words
        .iter()
        .map(|w| {
            let mut c = w.chars();
            match c.next() {
                Some(f) => f.to_uppercase().chain(c).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let uri = std::env::var("MONGO_URI").context("MONGO_URI not set")?;
    let db_name = std::env::var("DB_NAME").unwrap_or_else(|_| "books".into());

    let mut client_opts = ClientOptions::parse(&uri).await?;
    client_opts.app_name = Some("books-seeder".into());
    let client = Client::with_options(client_opts)?;
    let books: Collection<BookDoc> = client.database(&db_name).collection("books");

    let publishers = [
        "Penguin", "Vintage", "Ace", "Tor", "Gollancz", "Faber", "Picador", "Orbit", "Harper", "Knopf",
    ];

    let mut rng = rand::thread_rng();
    let mut uniques = HashSet::<String>::new();
    let mut docs: Vec<BookDoc> = Vec::new();

    while docs.len() < BOOKS {
        let title = title_case(Words(2..5).fake());
        if !uniques.insert(title.clone()) {
            continue;
        }

        let author: String = Name(EN).fake();
        let description: String = Sentence(8..20).fake();

        // publication: "<publisher>, <year>"
        let year = rng.gen_range(1950..=2024);
        let publication = publishers
            .choose(&mut rng)
            .map(|p| format!("{p}, {year}"));

        let isbn = format!("978{:010}", rng.gen_range(0..10_000_000_000u64));

        let created = Utc
            .with_ymd_and_hms(2024, rng.gen_range(1..=12), rng.gen_range(1..=28), 0, 0, 0)
            .single()
            .map(DateTime::from_chrono)
            .unwrap_or_else(DateTime::now);

        docs.push(BookDoc {
            id: ObjectId::new(),
            title,
            author: Some(author),
            publication,
            isbn: Some(isbn),
            description: Some(description),
            created_at: created,
            updated_at: created,
        });
    }

    // Wipe and seed. The search index is rebuilt by the server on
    // start with REINDEX_ON_START=true.
    books.delete_many(doc! {}).await?;
    let res = books.insert_many(docs).await?;
    println!("Seeded books: {}", res.inserted_ids.len());

    Ok(())
}
