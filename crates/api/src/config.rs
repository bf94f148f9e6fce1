//! Application configuration loaded from environment variables.

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Connection settings for the PostgreSQL store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` — `text` or `json` (default: `text`)
/// - `DATABASE_URL` — PostgreSQL connection string
/// - `POSTGRES_USER`, `POSTGRES_PASSWORD`, `POSTGRES_DB`, `POSTGRES_HOST`,
///   `POSTGRES_PORT` — used to build the connection string when
///   `DATABASE_URL` is unset and `POSTGRES_HOST` is set
/// - `DB_MAX_CONNECTIONS` — pool size (default: `5`)
/// - `SEED_DEMO_DATA` — `true` or `1` fills an empty store with demo data
///   at startup (default: off)
///
/// Without any database settings the server runs on the in-memory store.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database: Option<DatabaseConfig>,
    pub seed_demo_data: bool,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match lookup("LOG_FORMAT").as_deref() {
                Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
            database: database_from_lookup(&lookup),
            seed_demo_data: lookup("SEED_DEMO_DATA")
                .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn database_from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Option<DatabaseConfig> {
    let max_connections = lookup("DB_MAX_CONNECTIONS")
        .and_then(|n| n.parse().ok())
        .filter(|n| *n > 0)
        .unwrap_or(5);

    let url = lookup("DATABASE_URL").filter(|u| !u.is_empty()).or_else(|| {
        let host = lookup("POSTGRES_HOST").filter(|h| !h.is_empty())?;
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        Some(format!(
            "postgres://{}:{}@{}:{}/{}",
            var("POSTGRES_USER", "postgres"),
            var("POSTGRES_PASSWORD", "postgres"),
            host,
            var("POSTGRES_PORT", "5432"),
            var("POSTGRES_DB", "postgres"),
        ))
    })?;

    Some(DatabaseConfig {
        url,
        max_connections,
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database: None,
            seed_demo_data: false,
        }
    }
}
