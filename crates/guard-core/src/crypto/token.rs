//! Random token generation

use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::error::{GuardError, Result};

/// Default token size: 32 bytes = 64 hex chars
pub const DEFAULT_TOKEN_BYTES: usize = 32;

/// Fill `buf` from the OS random number generator
pub fn fill_random(buf: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| GuardError::EntropyUnavailable(e.to_string()))
}

/// Generate a hex-encoded token from `byte_len` random bytes
///
/// The returned string is `2 * byte_len` characters long.
pub fn generate_token(byte_len: usize) -> Result<String> {
    let mut bytes = vec![0u8; byte_len];
    fill_random(&mut bytes)?;
    Ok(hex::encode(bytes))
}

/// Compare two strings without short-circuiting on the first difference
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
