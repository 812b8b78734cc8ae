//! Cryptographic primitives for credentials, tokens and stored secrets
//!
//! This module provides:
//! - Argon2id password hashing and verification
//! - OS-random tokens, hex encoded
//! - AES-GCM authenticated encryption with length-prefixed blob framing
//! - Key material handling with zeroize

mod encryption;
mod password;
mod secure_memory;
mod token;

pub use encryption::{decrypt, decrypt_string, encrypt, encrypt_string, EncryptedBlob};
pub use password::{hash_password, is_password_strong, verify_password, MIN_PASSWORD_LENGTH};
pub use secure_memory::{Cipher, EncryptionKey, SecretString};
pub use token::{constant_time_eq, fill_random, generate_token, DEFAULT_TOKEN_BYTES};
