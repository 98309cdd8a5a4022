//! PIN format rules and salted hashing.
//!
//! PINs are stored as PBKDF2 PHC strings and never in clear text.

use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::{Params, Pbkdf2};

use crate::error::{EngineError, Result};

pub const PIN_LENGTH: usize = 4;

/// PBKDF2-SHA256 rounds for new hashes. Verification reads the rounds from
/// the stored hash.
const ROUNDS: u32 = 10_000;

/// Exactly four ASCII digits.
pub fn is_valid_pin(pin: &str) -> bool {
    pin.len() == PIN_LENGTH && pin.bytes().all(|b| b.is_ascii_digit())
}

/// Hash a PIN with a fresh random salt.
///
/// # Errors
///
/// Returns `EngineError::Pin` if the PIN is malformed or hashing fails.
pub fn hash_pin(pin: &str) -> Result<String> {
    if !is_valid_pin(pin) {
        return Err(EngineError::Pin("pin must be four digits".to_string()));
    }
    let salt = SaltString::encode_b64(&rand::random::<[u8; 16]>())
        .map_err(|e| EngineError::Pin(e.to_string()))?;
    let params = Params {
        rounds: ROUNDS,
        output_length: 32,
    };
    let hash = Pbkdf2
        .hash_password_customized(pin.as_bytes(), None, None, params, &salt)
        .map_err(|e| EngineError::Pin(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check a PIN against a stored hash.
///
/// # Errors
///
/// Returns `EngineError::Pin` if the stored value is not a valid hash.
pub fn verify_pin(pin: &str, stored: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| EngineError::Pin(e.to_string()))?;
    Ok(Pbkdf2.verify_password(pin.as_bytes(), &parsed).is_ok())
}
