//! # guard-core
//!
//! Security helpers for the Campus Guard learning platform:
//! - Argon2id password hashing and a password strength policy
//! - Random tokens and session-bound CSRF tokens
//! - AES-GCM encryption of stored secrets
//! - Input sanitization and email validation
//! - Append-only security event log
//! - Upload validation/storage and the database connection boundary

pub mod audit;
pub mod crypto;
pub mod csrf;
pub mod database;
pub mod error;
pub mod session;
pub mod settings;
pub mod upload;
pub mod validation;
mod toolkit;

pub use audit::{ClientInfo, EventDetails, SecurityEvent, SecurityLog};
pub use crypto::{
    decrypt, decrypt_string, encrypt, encrypt_string, generate_token, hash_password,
    is_password_strong, verify_password, Cipher, EncryptionKey, SecretString,
    DEFAULT_TOKEN_BYTES,
};
pub use csrf::{csrf_token, verify_csrf_token};
pub use database::{ConnectionProvider, ConnectionSettings, Connector, Database, SqlValue};
pub use error::{GuardError, Result};
pub use session::{MemorySession, SessionStore};
pub use settings::{ConfigManager, EncryptionSettings, GuardConfig};
pub use toolkit::SecurityToolkit;
pub use upload::{save_upload_record, IncomingFile, UploadHandler, UploadSettings, UploadedFile};
pub use validation::{is_valid_email, sanitize};
