//! Database boundary
//!
//! Guard code never talks to a driver directly. It needs three things from a
//! connection: run a statement, insert a row and get its id, read one scalar.
//! All of them take bound parameters; SQL text is never built from input.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

use crate::crypto::SecretString;
use crate::error::{GuardError, Result};

/// Bound query parameter or scalar result
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// An open database handle
#[async_trait]
pub trait Database: Send + Sync {
    /// Run a statement and return the number of affected rows
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    /// Run an INSERT and return the generated row id
    async fn insert(&self, sql: &str, params: &[SqlValue]) -> Result<i64>;

    /// Return the first column of the first row, if any
    async fn query_scalar(&self, sql: &str, params: &[SqlValue]) -> Result<Option<SqlValue>>;
}

/// Raw driver error, kept opaque to callers
pub type DriverError = Box<dyn std::error::Error + Send + Sync>;

/// Opens connections; implemented on top of a concrete driver
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        settings: &ConnectionSettings,
    ) -> std::result::Result<Arc<dyn Database>, DriverError>;
}

/// Fixed connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionSettings {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: SecretString,
    pub charset: String,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            database: "lms".to_string(),
            username: "lms_app".to_string(),
            password: SecretString::default(),
            charset: "utf8mb4".to_string(),
        }
    }
}

impl ConnectionSettings {
    /// Driver DSN; credentials are passed separately and never appear here
    pub fn dsn(&self) -> String {
        format!(
            "mysql:host={};port={};dbname={};charset={}",
            self.host, self.port, self.database, self.charset
        )
    }
}

/// Builds database handles from fixed settings
pub struct ConnectionProvider {
    connector: Arc<dyn Connector>,
    settings: ConnectionSettings,
}

impl ConnectionProvider {
    pub fn new(connector: Arc<dyn Connector>, settings: ConnectionSettings) -> Self {
        Self {
            connector,
            settings,
        }
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Open a connection
    ///
    /// The driver's error is logged here and replaced with
    /// [`GuardError::ConnectionFailed`], whose message is safe to show users.
    /// No retry is attempted.
    pub async fn connect(&self) -> Result<Arc<dyn Database>> {
        match self.connector.connect(&self.settings).await {
            Ok(db) => {
                debug!("Connected to {}", self.settings.dsn());
                Ok(db)
            }
            Err(e) => {
                error!("Database connection to {} failed: {}", self.settings.dsn(), e);
                Err(GuardError::ConnectionFailed)
            }
        }
    }
}
