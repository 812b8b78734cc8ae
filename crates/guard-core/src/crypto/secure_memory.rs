//! Key material and secret values with automatic zeroization

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{GuardError, Result};

/// Symmetric cipher and mode used for every encryption in the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Cipher {
    #[default]
    #[serde(rename = "aes-256-gcm")]
    Aes256Gcm,
    #[serde(rename = "aes-128-gcm")]
    Aes128Gcm,
}

impl Cipher {
    /// Required key length in bytes
    pub fn key_len(self) -> usize {
        match self {
            Self::Aes256Gcm => 32,
            Self::Aes128Gcm => 16,
        }
    }

    /// Required IV (nonce) length in bytes
    pub fn iv_len(self) -> usize {
        match self {
            Self::Aes256Gcm | Self::Aes128Gcm => 12,
        }
    }

    /// Configuration name, as accepted by `FromStr`
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aes256Gcm => "aes-256-gcm",
            Self::Aes128Gcm => "aes-128-gcm",
        }
    }
}

impl fmt::Display for Cipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Cipher {
    type Err = GuardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "aes-256-gcm" => Ok(Self::Aes256Gcm),
            "aes-128-gcm" => Ok(Self::Aes128Gcm),
            other => Err(GuardError::Config(format!("Unsupported cipher: {}", other))),
        }
    }
}

/// Process-wide encryption key bound to its cipher - zeroed when dropped
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    #[zeroize(skip)]
    cipher: Cipher,
    key: Vec<u8>,
}

impl EncryptionKey {
    /// Create a key from raw bytes; the length must match the cipher
    pub fn new(cipher: Cipher, key: Vec<u8>) -> Result<Self> {
        if key.len() != cipher.key_len() {
            return Err(GuardError::InvalidKey(format!(
                "{} requires a {}-byte key, got {}",
                cipher,
                cipher.key_len(),
                key.len()
            )));
        }
        Ok(Self { cipher, key })
    }

    /// Create a key from its hex encoding
    pub fn from_hex(cipher: Cipher, hex_key: &str) -> Result<Self> {
        let bytes = hex::decode(hex_key.trim())
            .map_err(|e| GuardError::InvalidKey(format!("Invalid key hex: {}", e)))?;
        Self::new(cipher, bytes)
    }

    /// Generate a fresh random key for the cipher
    pub fn generate(cipher: Cipher) -> Result<Self> {
        let mut key = vec![0u8; cipher.key_len()];
        super::fill_random(&mut key)?;
        Ok(Self { cipher, key })
    }

    /// Cipher this key was created for
    pub fn cipher(&self) -> Cipher {
        self.cipher
    }

    /// Get the key bytes (use carefully - avoid copying)
    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    /// Hex encoding of the key, for writing into configuration
    pub fn to_hex(&self) -> SecretString {
        SecretString::new(hex::encode(&self.key))
    }
}

impl Clone for EncryptionKey {
    fn clone(&self) -> Self {
        Self {
            cipher: self.cipher,
            key: self.key.clone(),
        }
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("cipher", &self.cipher)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Secret text value (passwords, keys) - automatically zeroed when dropped
#[derive(Default, Zeroize, ZeroizeOnDrop, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    pub fn new(value: String) -> Self {
        Self { value }
    }

    /// Get the secret value (use carefully)
    pub fn expose(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
        }
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value.to_string())
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}
