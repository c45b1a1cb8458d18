use crate::errors::{AppError, AppResult};
use crate::redaction::redact_connection_string;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DATABASE_URL: &str = "ROI_DATABASE_URL";
pub const ENV_DB_HOST: &str = "ROI_DB_HOST";
pub const ENV_DB_NAME: &str = "ROI_DB_NAME";
pub const ENV_DB_USER: &str = "ROI_DB_USER";
pub const ENV_DB_PASSWORD: &str = "ROI_DB_PASSWORD";
pub const ENV_DB_PORT: &str = "ROI_DB_PORT";
pub const ENV_BUSY_TIMEOUT_MS: &str = "ROI_DB_BUSY_TIMEOUT_MS";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Clone, PartialEq, Eq)]
pub enum ConnectionTarget {
    /// A single connection string: `sqlite://path`, `sqlite::memory:`, a `file:` URI, or a bare path.
    Url(String),
    /// Discrete parameters. `host` names the data directory and `database` the file stem.
    Discrete {
        host: String,
        database: String,
        user: Option<String>,
        password: Option<String>,
        port: Option<u16>,
    },
}

impl ConnectionTarget {
    pub fn describe(&self) -> String {
        match self {
            Self::Url(url) => redact_connection_string(url),
            Self::Discrete {
                host,
                database,
                user,
                port,
                ..
            } => format!(
                "host={} database={} user={} port={}",
                host,
                database,
                user.as_deref().unwrap_or("-"),
                port.map(|value| value.to_string()).unwrap_or_else(|| "-".to_string())
            ),
        }
    }
}

impl fmt::Debug for ConnectionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Where the database lives once the connection target has been interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    Memory,
    Uri(String),
    File(PathBuf),
}

#[derive(Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub target: ConnectionTarget,
    pub busy_timeout: Duration,
}

impl StoreSettings {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            target: ConnectionTarget::Url(url.into()),
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        }
    }

    pub fn in_memory() -> Self {
        Self::from_url("sqlite::memory:")
    }

    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`; blank values count as absent.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).map(|value| value.trim().to_string()).filter(|value| !value.is_empty());

        let busy_timeout = match read(ENV_BUSY_TIMEOUT_MS) {
            Some(raw) => Duration::from_millis(raw.parse::<u64>().map_err(|_| {
                AppError::Config(format!("{} must be a whole number of milliseconds, got {}", ENV_BUSY_TIMEOUT_MS, raw))
            })?),
            None => Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        };

        if let Some(url) = read(ENV_DATABASE_URL) {
            return Ok(Self {
                target: ConnectionTarget::Url(url),
                busy_timeout,
            });
        }

        let host = read(ENV_DB_HOST);
        let database = read(ENV_DB_NAME);
        let user = read(ENV_DB_USER);
        let password = read(ENV_DB_PASSWORD);
        let port = read(ENV_DB_PORT)
            .map(|raw| {
                raw.parse::<u16>()
                    .map_err(|_| AppError::Config(format!("{} must be a port number, got {}", ENV_DB_PORT, raw)))
            })
            .transpose()?;

        match (host, database) {
            (Some(host), Some(database)) => Ok(Self {
                target: ConnectionTarget::Discrete {
                    host,
                    database,
                    user,
                    password,
                    port,
                },
                busy_timeout,
            }),
            (None, None) if user.is_none() && password.is_none() && port.is_none() => Err(AppError::Config(format!(
                "no database configured; set {} or {} and {}",
                ENV_DATABASE_URL, ENV_DB_HOST, ENV_DB_NAME
            ))),
            (host, _) => Err(AppError::Config(format!(
                "incomplete database parameters; missing {}",
                if host.is_none() { ENV_DB_HOST } else { ENV_DB_NAME }
            ))),
        }
    }

    pub fn location(&self) -> AppResult<DatabaseLocation> {
        match &self.target {
            ConnectionTarget::Url(url) => parse_url(url),
            ConnectionTarget::Discrete { host, database, .. } => {
                let file_name = if database.ends_with(".db") || database.ends_with(".sqlite") {
                    database.clone()
                } else {
                    format!("{}.db", database)
                };
                Ok(DatabaseLocation::File(PathBuf::from(host).join(file_name)))
            }
        }
    }

    /// Log-safe description of the target.
    pub fn describe(&self) -> String {
        self.target.describe()
    }
}

impl fmt::Debug for StoreSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSettings")
            .field("target", &self.describe())
            .field("busy_timeout", &self.busy_timeout)
            .finish()
    }
}

fn parse_url(url: &str) -> AppResult<DatabaseLocation> {
    let url = url.trim();
    if url == ":memory:" || url == "sqlite::memory:" || url == "sqlite://:memory:" {
        return Ok(DatabaseLocation::Memory);
    }
    if url.starts_with("file:") {
        return Ok(DatabaseLocation::Uri(url.to_string()));
    }
    if let Some(rest) = url.strip_prefix("sqlite://").or_else(|| url.strip_prefix("sqlite:")) {
        // Credentials mean nothing to SQLite; drop any userinfo ahead of the path.
        let authority_end = rest.find('/').unwrap_or(rest.len());
        let path = match rest[..authority_end].rfind('@') {
            Some(at) => &rest[at + 1..],
            None => rest,
        };
        if path.is_empty() {
            return Err(AppError::Config("database url has no path".to_string()));
        }
        return Ok(DatabaseLocation::File(PathBuf::from(path)));
    }
    if url.contains("://") {
        return Err(AppError::Config(format!(
            "unsupported database url scheme: {}",
            redact_connection_string(url)
        )));
    }
    Ok(DatabaseLocation::File(PathBuf::from(url)))
}
