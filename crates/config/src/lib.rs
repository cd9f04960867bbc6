//! Process configuration, read once at startup.

use std::{fmt, path::PathBuf, str::FromStr};

use thiserror::Error;
use url::Url;
use utils::assets::{ASSET_DIR_ENV, asset_dir_from, sqlite_path};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_DB_NAME: &str = "tasks";
pub const DEFAULT_DB_USER: &str = "postgres";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unsupported DB_DRIVER '{0}' (expected postgres or sqlite)")]
    UnsupportedDriver(String),
    #[error("invalid database URL: {0}")]
    InvalidDatabaseUrl(#[from] url::ParseError),
    #[error("database credentials cannot be encoded into the URL")]
    InvalidCredentials,
    #[error("failed to prepare asset directory: {0}")]
    AssetDir(#[from] std::io::Error),
}

#[derive(Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    Url(String),
    Postgres {
        host: String,
        port: u16,
        name: String,
        user: String,
        password: String,
    },
    Sqlite {
        path: PathBuf,
    },
}

impl DatabaseConfig {
    pub fn url(&self) -> Result<String, ConfigError> {
        match self {
            DatabaseConfig::Url(url) => Ok(url.clone()),
            DatabaseConfig::Postgres {
                host,
                port,
                name,
                user,
                password,
            } => {
                let mut url = Url::parse(&format!("postgres://{host}:{port}"))?;
                url.set_path(name);
                url.set_username(user)
                    .map_err(|_| ConfigError::InvalidCredentials)?;
                if !password.is_empty() {
                    url.set_password(Some(password))
                        .map_err(|_| ConfigError::InvalidCredentials)?;
                }
                Ok(url.into())
            }
            DatabaseConfig::Sqlite { path } => {
                Ok(format!("sqlite://{}?mode=rwc", path.to_string_lossy()))
            }
        }
    }
}

/// Never prints credentials.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseConfig::Url(url) => {
                let scheme = url.split("://").next().unwrap_or("unknown");
                write!(f, "{scheme} (DATABASE_URL)")
            }
            DatabaseConfig::Postgres {
                host, port, name, ..
            } => write!(f, "postgres {host}:{port}/{name}"),
            DatabaseConfig::Sqlite { path } => write!(f, "sqlite {}", path.display()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database: DatabaseConfig,
    pub page_size: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from `lookup`, so callers can supply values without
    /// touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = ["BACKEND_PORT", "PORT"]
            .into_iter()
            .find_map(|key| get(key).map(|raw| parse_or_default(key, &raw, DEFAULT_PORT)))
            .unwrap_or(DEFAULT_PORT);
        let page_size = match get("TASK_PAGE_SIZE") {
            Some(raw) => match parse_or_default("TASK_PAGE_SIZE", &raw, DEFAULT_PAGE_SIZE) {
                0 => {
                    tracing::warn!("TASK_PAGE_SIZE must be at least 1; using default");
                    DEFAULT_PAGE_SIZE
                }
                size => size,
            },
            None => DEFAULT_PAGE_SIZE,
        };

        let database = if let Some(url) = get("DATABASE_URL") {
            DatabaseConfig::Url(url)
        } else {
            let db_host = get("DB_HOST");
            let driver = get("DB_DRIVER")
                .map(|d| d.to_ascii_lowercase())
                .unwrap_or_else(|| {
                    if db_host.is_some() { "postgres" } else { "sqlite" }.to_string()
                });
            match driver.as_str() {
                "postgres" | "postgresql" | "pgsql" => DatabaseConfig::Postgres {
                    host: db_host.unwrap_or_else(|| "localhost".to_string()),
                    port: match get("DB_PORT") {
                        Some(raw) => parse_or_default("DB_PORT", &raw, DEFAULT_DB_PORT),
                        None => DEFAULT_DB_PORT,
                    },
                    name: get("DB_NAME").unwrap_or_else(|| DEFAULT_DB_NAME.to_string()),
                    user: get("DB_USER").unwrap_or_else(|| DEFAULT_DB_USER.to_string()),
                    // Passwords keep surrounding whitespace.
                    password: lookup("DB_PASSWORD").unwrap_or_default(),
                },
                "sqlite" => {
                    let dir = asset_dir_from(get(ASSET_DIR_ENV).as_deref())?;
                    DatabaseConfig::Sqlite {
                        path: sqlite_path(&dir),
                    }
                }
                other => return Err(ConfigError::UnsupportedDriver(other.to_string())),
            }
        };

        Ok(Self {
            host,
            port,
            database,
            page_size,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or_default<T>(key: &str, raw: &str, default: T) -> T
where
    T: FromStr + fmt::Display + Copy,
    T::Err: fmt::Display,
{
    match raw.parse::<T>() {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(value = raw, error = %err, "Invalid {key}; using default {default}");
            default
        }
    }
}
