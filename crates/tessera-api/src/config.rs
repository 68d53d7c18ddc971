//! Server settings read from the environment.

use std::fmt;
use std::str::FromStr;

use tessera_core::defaults::SERVER_PORT;
use tessera_core::Error;

/// Which [`ItemStore`](tessera_core::ItemStore) backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    #[default]
    Memory,
    Postgres,
}

impl FromStr for StoreKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            other => Err(Error::Config(format!("Unknown store: {}", other))),
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StoreKind::Memory => "memory",
            StoreKind::Postgres => "postgres",
        })
    }
}

/// Listener and backend selection.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreKind,
    pub database_url: String,
    /// Comma-separated CORS origins; empty allows any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: SERVER_PORT,
            store: StoreKind::default(),
            database_url: "postgres://localhost/tessera".to_string(),
            allowed_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Read `HOST`, `PORT`, `TESSERA_STORE`, `DATABASE_URL`, `ALLOWED_ORIGINS`.
    pub fn from_env() -> Result<Self, Error> {
        let mut config = Self::default();
        if let Ok(host) = std::env::var("HOST") {
            config.host = host;
        }
        if let Ok(port) = std::env::var("PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("PORT is not a port number: {}", port)))?;
        }
        if let Ok(store) = std::env::var("TESSERA_STORE") {
            config.store = store.parse()?;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Ok(origins) = std::env::var("ALLOWED_ORIGINS") {
            config.allowed_origins = parse_origins(&origins);
        }
        Ok(config)
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_kind_parses_aliases() {
        assert_eq!("PG".parse::<StoreKind>().unwrap(), StoreKind::Postgres);
        assert_eq!(" memory ".parse::<StoreKind>().unwrap(), StoreKind::Memory);
        assert!("sqlite".parse::<StoreKind>().is_err());
    }

    #[test]
    fn test_parse_origins_skips_blanks() {
        assert_eq!(
            parse_origins("http://localhost:3000, ,https://notes.example"),
            vec!["http://localhost:3000", "https://notes.example"]
        );
    }
}
