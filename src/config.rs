use std::env;
use std::net::IpAddr;

use anyhow::{Context, Result};

pub struct AppConfig {
    pub mongo_uri: Option<String>,
    pub db_name: String,
    pub search_url: Option<String>,
    pub search_index: String,
    pub host: IpAddr,
    pub port: u16,
    pub reindex_on_start: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignored if there is no .env
        Self::from_lookup(|k| env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |k: &str, d: &str| lookup(k).unwrap_or_else(|| d.to_string());

        let host = get("HOST", "127.0.0.1");
        let port = get("PORT", "3000");
        let reindex = get("REINDEX_ON_START", "false");

        Ok(Self {
            mongo_uri: lookup("MONGO_URI").filter(|s| !s.is_empty()),
            db_name: get("DB_NAME", "books"),
            search_url: lookup("SEARCH_URL").filter(|s| !s.is_empty()),
            search_index: get("SEARCH_INDEX", "books"),
            host: host.parse().with_context(|| format!("invalid HOST `{host}`"))?,
            port: port.parse().with_context(|| format!("invalid PORT `{port}`"))?,
            reindex_on_start: reindex
                .parse()
                .with_context(|| format!("invalid REINDEX_ON_START `{reindex}`"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.mongo_uri, None);
        assert_eq!(cfg.search_url, None);
        assert_eq!(cfg.db_name, "books");
        assert_eq!(cfg.search_index, "books");
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.host.to_string(), "127.0.0.1");
        assert!(!cfg.reindex_on_start);
    }

    #[test]
    fn reads_values() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("MONGO_URI", "mongodb://db:27017"),
            ("SEARCH_URL", "http://search:9200"),
            ("PORT", "8080"),
            ("HOST", "0.0.0.0"),
            ("REINDEX_ON_START", "true"),
        ]))
        .unwrap();
        assert_eq!(cfg.mongo_uri.as_deref(), Some("mongodb://db:27017"));
        assert_eq!(cfg.search_url.as_deref(), Some("http://search:9200"));
        assert_eq!(cfg.port, 8080);
        assert!(cfg.reindex_on_start);
    }

    #[test]
    fn empty_urls_count_as_unset() {
        let cfg = AppConfig::from_lookup(lookup(&[("MONGO_URI", ""), ("SEARCH_URL", "")])).unwrap();
        assert!(cfg.mongo_uri.is_none());
        assert!(cfg.search_url.is_none());
    }

    #[test]
    fn rejects_bad_port() {
        let err = AppConfig::from_lookup(lookup(&[("PORT", "http")])).err().unwrap();
        assert!(err.to_string().contains("PORT"));
    }
}
