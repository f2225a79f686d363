//! # Credential Primitives
//!
//! Salted password hashing, two-factor codes, and generated secrets for the
//! session manager.
//!
//! ## Hashing Scheme
//! ```text
//! register/reset:  salt = 16 random bytes (hex)
//!                  hash = Argon2id(password, salt)   (hex, 32 bytes)
//! verify:          Argon2id(candidate, stored salt) == stored hash
//! ```
//! Plaintext passwords are never stored or compared.
//!
//! ## Two-Factor Codes
//! Six-digit codes derived from the stored secret over a 30 second time
//! window; the previous window is accepted to absorb clock skew.

use argon2::Argon2;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::error::{StoreError, StoreResult};

/// Derived hash length in bytes.
const HASH_LEN: usize = 32;

/// Two-factor time step in seconds.
const TWO_FACTOR_STEP_SECS: i64 = 30;

// =============================================================================
// Password Hashing
// =============================================================================

/// Generates a fresh per-user salt (16 random bytes, hex encoded).
pub fn generate_salt() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    hex::encode(bytes)
}

/// Derives the storage hash for a password with the given salt.
pub fn hash_password(password: &str, salt_hex: &str) -> StoreResult<String> {
    let salt = hex::decode(salt_hex).map_err(|e| StoreError::Hashing(e.to_string()))?;
    let mut out = [0u8; HASH_LEN];
    Argon2::default()
        .hash_password_into(password.as_bytes(), &salt, &mut out)
        .map_err(|e| StoreError::Hashing(e.to_string()))?;
    Ok(hex::encode(out))
}

/// Re-derives the hash for a candidate password and compares it to the
/// stored hash. A hashing failure counts as a mismatch.
pub fn verify_password(password: &str, salt_hex: &str, expected_hash: &str) -> bool {
    match hash_password(password, salt_hex) {
        Ok(derived) => derived == expected_hash,
        Err(_) => false,
    }
}

// =============================================================================
// Two-Factor Codes
// =============================================================================

/// Generates a new two-factor secret.
pub fn generate_two_factor_secret() -> String {
    random_token(16)
}

fn two_factor_code_at(secret: &str, window: i64) -> String {
    let digest = Sha256::digest(format!("{secret}:{window}").as_bytes());
    let value = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    format!("{:06}", value % 1_000_000)
}

/// Verifies a six-digit code against the stored secret at `now`.
///
/// Accepts the current window and the immediately preceding one.
pub fn verify_two_factor(secret: &str, code: &str, now: DateTime<Utc>) -> bool {
    let window = now.timestamp() / TWO_FACTOR_STEP_SECS;
    code == two_factor_code_at(secret, window) || code == two_factor_code_at(secret, window - 1)
}

/// Returns the code a configured authenticator would show at `now`.
/// Exposed for enrollment display and tests.
pub fn current_two_factor_code(secret: &str, now: DateTime<Utc>) -> String {
    two_factor_code_at(secret, now.timestamp() / TWO_FACTOR_STEP_SECS)
}

// =============================================================================
// Generated Codes
// =============================================================================

/// Generates a single-use invite code (8 characters, uppercase).
pub fn generate_invite_code() -> String {
    random_token(8)
}

/// Generates a static recovery code in `XXXX-XXXX` form.
pub fn generate_recovery_code() -> String {
    format!("{}-{}", random_token(4), random_token(4))
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(|c| (c as char).to_ascii_uppercase())
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_password_same_salt_same_hash() {
        let salt = generate_salt();
        let a = hash_password("hunter2", &salt).unwrap();
        let b = hash_password("hunter2", &salt).unwrap();
        assert_eq!(a, b);
        assert!(verify_password("hunter2", &salt, &a));
        assert!(!verify_password("hunter3", &salt, &a));
    }

    #[test]
    fn different_salts_produce_different_hashes() {
        let a = hash_password("hunter2", &generate_salt()).unwrap();
        let b = hash_password("hunter2", &generate_salt()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn two_factor_accepts_current_and_previous_window() {
        let secret = generate_two_factor_secret();
        let now = Utc::now();

        let code = current_two_factor_code(&secret, now);
        assert!(verify_two_factor(&secret, &code, now));

        // Code from the previous step still verifies just after rollover.
        let late = now + chrono::Duration::seconds(TWO_FACTOR_STEP_SECS);
        assert!(verify_two_factor(&secret, &code, late));

        // Two windows later it is rejected.
        let too_late = now + chrono::Duration::seconds(TWO_FACTOR_STEP_SECS * 2);
        assert!(!verify_two_factor(&secret, &code, too_late));
    }

    #[test]
    fn two_factor_rejects_wrong_code() {
        let secret = generate_two_factor_secret();
        assert!(!verify_two_factor(&secret, "000000", Utc::now()));
    }

    #[test]
    fn generated_codes_have_expected_shape() {
        assert_eq!(generate_invite_code().len(), 8);
        let recovery = generate_recovery_code();
        assert_eq!(recovery.len(), 9);
        assert_eq!(recovery.chars().nth(4), Some('-'));
    }
}
