//! Connection configuration
//!
//! An immutable description of one database source, loaded from TOML or built
//! programmatically. Parsing validates the driver id, so everything downstream
//! can assume a known dialect.

use super::database_types::DatabaseType;
use super::error::{DatabaseError, Result};
use serde::Deserialize;
use std::path::Path;

/// Database source description
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfiguration {
    #[serde(alias = "dbms")]
    driver: DatabaseType,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default, alias = "dbname")]
    database: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    charset: Option<String>,
}

#[derive(Deserialize)]
struct ConfigurationFile {
    database: DatabaseConfiguration,
}

impl DatabaseConfiguration {
    /// Start a builder for the given driver
    pub fn builder(driver: DatabaseType) -> ConfigurationBuilder {
        ConfigurationBuilder::new(driver)
    }

    /// Parse the `[database]` table of a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ConfigurationFile =
            toml::from_str(content).map_err(|e| DatabaseError::configuration(e.to_string()))?;
        file.database.validate()?;
        Ok(file.database)
    }

    /// Read and parse a TOML configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check the fields the selected driver needs
    pub fn validate(&self) -> Result<()> {
        if self.driver.is_networked() {
            if self.host.as_deref().map_or(true, str::is_empty) {
                return Err(DatabaseError::configuration(format!(
                    "{} configuration requires a host",
                    self.driver
                )));
            }
            if self.database.is_empty() {
                return Err(DatabaseError::configuration(format!(
                    "{} configuration requires a database name",
                    self.driver
                )));
            }
        }
        if let Some(charset) = &self.charset {
            if charset.is_empty() || !charset.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(DatabaseError::InvalidIdentifier(format!("charset '{}'", charset)));
            }
        }
        Ok(())
    }

    /// Configured driver
    pub fn driver(&self) -> DatabaseType {
        self.driver
    }

    /// Server host
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Configured port, falling back to the driver default
    pub fn port(&self) -> Option<u16> {
        self.port.or_else(|| self.driver.default_port())
    }

    /// Database name, or file path for SQLite
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Login user
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Login password
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Connection character set
    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// Key/value connection string (`host=... port=... dbname=...`)
    ///
    /// Values containing spaces, quotes or backslashes are single-quoted with
    /// backslash escapes. The charset, when present, is forwarded as the
    /// `client_encoding` run-time option.
    pub fn database_source_name(&self) -> String {
        let mut parts = Vec::new();
        if let Some(host) = &self.host {
            parts.push(format!("host={}", quote_dsn_value(host)));
        }
        if let Some(port) = self.port() {
            parts.push(format!("port={}", port));
        }
        if !self.database.is_empty() {
            parts.push(format!("dbname={}", quote_dsn_value(&self.database)));
        }
        if let Some(username) = &self.username {
            parts.push(format!("user={}", quote_dsn_value(username)));
        }
        if let Some(password) = &self.password {
            parts.push(format!("password={}", quote_dsn_value(password)));
        }
        if let Some(charset) = &self.charset {
            parts.push(format!("options='-c client_encoding={}'", charset));
        }
        parts.join(" ")
    }
}

impl std::fmt::Debug for DatabaseConfiguration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfiguration")
            .field("driver", &self.driver)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("charset", &self.charset)
            .finish()
    }
}

fn quote_dsn_value(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || c == '\'' || c == '\\');
    if !needs_quotes {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

/// Programmatic construction of a [`DatabaseConfiguration`]
pub struct ConfigurationBuilder {
    configuration: DatabaseConfiguration,
}

impl ConfigurationBuilder {
    /// Create a new builder for the specified driver
    pub fn new(driver: DatabaseType) -> Self {
        Self {
            configuration: DatabaseConfiguration {
                driver,
                host: None,
                port: None,
                database: String::new(),
                username: None,
                password: None,
                charset: None,
            },
        }
    }

    /// Set the database host
    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.configuration.host = Some(host.into());
        self
    }

    /// Set the database port
    pub fn port(mut self, port: u16) -> Self {
        self.configuration.port = Some(port);
        self
    }

    /// Set the database name (file path for SQLite)
    pub fn database<S: Into<String>>(mut self, database: S) -> Self {
        self.configuration.database = database.into();
        self
    }

    /// Set the username
    pub fn username<S: Into<String>>(mut self, username: S) -> Self {
        self.configuration.username = Some(username.into());
        self
    }

    /// Set the password
    pub fn password<S: Into<String>>(mut self, password: S) -> Self {
        self.configuration.password = Some(password.into());
        self
    }

    /// Set the connection charset
    pub fn charset<S: Into<String>>(mut self, charset: S) -> Self {
        self.configuration.charset = Some(charset.into());
        self
    }

    /// Validate and produce the configuration
    pub fn build(self) -> Result<DatabaseConfiguration> {
        self.configuration.validate()?;
        Ok(self.configuration)
    }
}
