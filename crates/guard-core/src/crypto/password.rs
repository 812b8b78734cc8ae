//! Password hashing with Argon2id

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use rand::rngs::OsRng;
use tracing::debug;

use crate::error::{GuardError, Result};

/// Minimum number of characters for a strong password
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Largest memory cost (KiB) accepted from a stored hash: 256 MiB
pub const MAX_M_COST: u32 = 256 * 1024;
/// Largest iteration count accepted from a stored hash
pub const MAX_T_COST: u32 = 16;
/// Largest lane count accepted from a stored hash
pub const MAX_P_COST: u32 = 8;

/// Hash a password into a self-describing PHC string
///
/// Uses Argon2id with the crate's default parameters and a fresh random salt,
/// so hashing the same password twice gives two different strings.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| GuardError::Hashing(e.to_string()))?;

    Ok(hash.to_string())
}

/// Check a password against a stored PHC hash
///
/// A malformed hash is reported as a mismatch, never as an error.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!("Rejecting malformed password hash: {}", e);
            return false;
        }
    };

    // The stored hash picks the work factor; refuse anything that could
    // exhaust memory or stall the request.
    match Params::try_from(&parsed) {
        Ok(params)
            if params.m_cost() <= MAX_M_COST
                && params.t_cost() <= MAX_T_COST
                && params.p_cost() <= MAX_P_COST => {}
        Ok(params) => {
            debug!(
                "Rejecting password hash with excessive cost (m={}, t={}, p={})",
                params.m_cost(),
                params.t_cost(),
                params.p_cost()
            );
            return false;
        }
        Err(e) => {
            debug!("Rejecting password hash with invalid parameters: {}", e);
            return false;
        }
    }

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Password policy: at least 8 characters with an uppercase letter,
/// a lowercase letter and a digit (ASCII classes)
pub fn is_password_strong(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LENGTH
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
}
