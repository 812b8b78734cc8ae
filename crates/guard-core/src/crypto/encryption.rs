//! AES-GCM authenticated encryption
//!
//! Blob format (before base64):
//! `{iv_len: u16 BE}{iv}{ciphertext_len: u32 BE}{ciphertext}`
//! - IV: 12 bytes, fresh for every call
//! - Ciphertext: variable length, GCM auth tag appended
//!
//! Both fields carry their own length, so no byte value in the ciphertext
//! can be mistaken for a separator.

use aes_gcm::{
    aead::{Aead, KeyInit, Nonce},
    Aes128Gcm, Aes256Gcm,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::{fill_random, Cipher, EncryptionKey};
use crate::error::{GuardError, Result};

const IV_PREFIX_LEN: usize = 2;
const CIPHERTEXT_PREFIX_LEN: usize = 4;

/// Ciphertext together with the IV that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBlob {
    /// Initialization vector
    pub iv: Vec<u8>,
    /// Ciphertext with the auth tag appended
    pub ciphertext: Vec<u8>,
}

impl EncryptedBlob {
    /// Frame both fields and base64-encode the result
    pub fn encode(&self) -> Result<String> {
        let iv_len = u16::try_from(self.iv.len())
            .map_err(|_| GuardError::EncryptionFailed("IV too long".to_string()))?;
        let ct_len = u32::try_from(self.ciphertext.len())
            .map_err(|_| GuardError::EncryptionFailed("Ciphertext too long".to_string()))?;

        let mut framed = Vec::with_capacity(
            IV_PREFIX_LEN + self.iv.len() + CIPHERTEXT_PREFIX_LEN + self.ciphertext.len(),
        );
        framed.extend_from_slice(&iv_len.to_be_bytes());
        framed.extend_from_slice(&self.iv);
        framed.extend_from_slice(&ct_len.to_be_bytes());
        framed.extend_from_slice(&self.ciphertext);

        Ok(STANDARD.encode(framed))
    }

    /// Parse the base64 framed format
    pub fn decode(encoded: &str) -> Result<Self> {
        let raw = STANDARD
            .decode(encoded.trim())
            .map_err(|e| GuardError::MalformedBlob(format!("Invalid base64: {}", e)))?;

        let mut rest = raw.as_slice();
        let iv = take_field(&mut rest, IV_PREFIX_LEN, "IV")?.to_vec();
        let ciphertext = take_field(&mut rest, CIPHERTEXT_PREFIX_LEN, "ciphertext")?.to_vec();

        if !rest.is_empty() {
            return Err(GuardError::MalformedBlob(format!(
                "{} trailing bytes after ciphertext",
                rest.len()
            )));
        }

        Ok(Self { iv, ciphertext })
    }
}

/// Split one big-endian length-prefixed field off the front of `rest`
fn take_field<'a>(rest: &mut &'a [u8], prefix_len: usize, name: &str) -> Result<&'a [u8]> {
    if rest.len() < prefix_len {
        return Err(GuardError::MalformedBlob(format!("Missing {} length", name)));
    }
    let (prefix, tail) = rest.split_at(prefix_len);
    let len = prefix
        .iter()
        .fold(0usize, |acc, byte| (acc << 8) | usize::from(*byte));

    if tail.len() < len {
        return Err(GuardError::MalformedBlob(format!(
            "Truncated {}: expected {} bytes, got {}",
            name,
            len,
            tail.len()
        )));
    }
    let (field, tail) = tail.split_at(len);
    *rest = tail;
    Ok(field)
}

fn seal<C: Aead + KeyInit>(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher =
        C::new_from_slice(key).map_err(|e| GuardError::InvalidKey(e.to_string()))?;
    cipher
        .encrypt(Nonce::<C>::from_slice(iv), plaintext)
        .map_err(|e| GuardError::EncryptionFailed(e.to_string()))
}

fn open<C: Aead + KeyInit>(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
    let cipher =
        C::new_from_slice(key).map_err(|e| GuardError::InvalidKey(e.to_string()))?;
    cipher
        .decrypt(Nonce::<C>::from_slice(iv), ciphertext)
        .map_err(|_| GuardError::DecryptionFailed)
}

/// Encrypt plaintext under the configured key and cipher
///
/// # Returns
/// The base64 blob carrying a freshly generated IV and the ciphertext
pub fn encrypt(plaintext: &[u8], key: &EncryptionKey) -> Result<String> {
    let cipher = key.cipher();

    let mut iv = vec![0u8; cipher.iv_len()];
    fill_random(&mut iv)?;

    let ciphertext = match cipher {
        Cipher::Aes256Gcm => seal::<Aes256Gcm>(key.as_bytes(), &iv, plaintext)?,
        Cipher::Aes128Gcm => seal::<Aes128Gcm>(key.as_bytes(), &iv, plaintext)?,
    };

    EncryptedBlob { iv, ciphertext }.encode()
}

/// Encrypt a string and return the blob
pub fn encrypt_string(plaintext: &str, key: &EncryptionKey) -> Result<String> {
    encrypt(plaintext.as_bytes(), key)
}

/// Decrypt a blob produced by [`encrypt`]
///
/// Fails with `MalformedBlob` when the framing is wrong and with
/// `DecryptionFailed` when authentication fails. Never returns partial output.
pub fn decrypt(blob: &str, key: &EncryptionKey) -> Result<Vec<u8>> {
    let cipher = key.cipher();
    let parsed = EncryptedBlob::decode(blob)?;

    if parsed.iv.len() != cipher.iv_len() {
        return Err(GuardError::MalformedBlob(format!(
            "Invalid IV length: expected {}, got {}",
            cipher.iv_len(),
            parsed.iv.len()
        )));
    }

    match cipher {
        Cipher::Aes256Gcm => open::<Aes256Gcm>(key.as_bytes(), &parsed.iv, &parsed.ciphertext),
        Cipher::Aes128Gcm => open::<Aes128Gcm>(key.as_bytes(), &parsed.iv, &parsed.ciphertext),
    }
}

/// Decrypt a blob and return it as a string
pub fn decrypt_string(blob: &str, key: &EncryptionKey) -> Result<String> {
    let plaintext = decrypt(blob, key)?;
    String::from_utf8(plaintext).map_err(|_| GuardError::DecryptionFailed)
}
