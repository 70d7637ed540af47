//! Connection settings for the statistics database

use optidb_core::{OptidbError, Result};
use serde::Deserialize;
use std::fmt;

pub const ENV_HOST: &str = "POSTGRES_HOST";
pub const ENV_PORT: &str = "POSTGRES_PORT";
pub const ENV_DATABASE: &str = "POSTGRES_DB";
pub const ENV_USER: &str = "POSTGRES_USER";
pub const ENV_PASSWORD: &str = "POSTGRES_PASSWORD";
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";

/// Where and as whom to connect.
///
/// A `url` takes precedence over the individual fields when set.
#[derive(Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: Option<String>,
    /// Full connection string, `postgres://...` or `key=value` form
    pub url: Option<String>,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "optidb".to_string(),
            user: "profiler_ro".to_string(),
            password: None,
            url: None,
        }
    }
}

impl fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl PostgresConfig {
    pub fn new(host: impl Into<String>, port: u16, database: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            database: database.into(),
            ..Self::default()
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Defaults overlaid with the `POSTGRES_*` and `DATABASE_URL` variables
    pub fn from_env() -> Result<Self> {
        Self::default().merge_env(|key| std::env::var(key).ok())
    }

    /// Overrides every field whose variable is set and non-empty
    pub fn merge_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(host) = var(ENV_HOST) {
            self.host = host;
        }
        if let Some(port) = var(ENV_PORT) {
            self.port = port.trim().parse().map_err(|_| {
                OptidbError::Configuration(format!("{ENV_PORT} is not a valid port: {port}"))
            })?;
        }
        if let Some(database) = var(ENV_DATABASE) {
            self.database = database;
        }
        if let Some(user) = var(ENV_USER) {
            self.user = user;
        }
        if let Some(password) = var(ENV_PASSWORD) {
            self.password = Some(password);
        }
        if let Some(url) = var(ENV_DATABASE_URL) {
            self.url = Some(url);
        }
        Ok(self)
    }

    /// Builds the driver configuration
    pub fn to_pg_config(&self) -> Result<tokio_postgres::Config> {
        if let Some(url) = &self.url {
            return url.parse::<tokio_postgres::Config>().map_err(|e| {
                OptidbError::Configuration(format!("invalid connection string: {e}"))
            });
        }

        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.database)
            .user(&self.user)
            .application_name("optidb");
        if let Some(password) = &self.password {
            config.password(password);
        }
        Ok(config)
    }

    /// `host:port/database` for log lines; never includes credentials
    pub fn target(&self) -> String {
        match &self.url {
            Some(_) => "<connection string>".to_string(),
            None => format!("{}:{}/{}", self.host, self.port, self.database),
        }
    }
}
