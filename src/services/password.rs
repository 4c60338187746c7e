//! Password and security answer hashing
//!
//! Passwords are hashed with Argon2id and stored as PHC strings with a
//! per-hash random salt. Security answers are compared as exact strings, so
//! they are stored as plain SHA-256 digests instead; answer checks are a
//! digest comparison, never a substring or case-insensitive match.

use anyhow::{Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use data_encoding::HEXLOWER;
use sha2::{Digest, Sha256};

/// Hash a password using Argon2id with secure defaults.
///
/// Returns the hash in PHC string format (algorithm, parameters, salt,
/// and hash).
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))
        .context("Password hashing failed")?;

    Ok(password_hash.to_string())
}

/// Verify a password against a stored PHC hash.
///
/// Returns `false` for a mismatch; errors only on a malformed hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))
        .context("Failed to parse password hash")?;

    let argon2 = Argon2::default();

    match argon2.verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(anyhow::anyhow!("Password verification failed: {}", e))
            .context("Password verification error"),
    }
}

/// SHA-256 digest of a security answer, lowercase hex.
///
/// The answer is hashed exactly as submitted. No trimming or case folding,
/// so "Rex" and "rex" are different answers.
pub fn hash_answer(answer: &str) -> String {
    let digest = Sha256::digest(answer.as_bytes());
    HEXLOWER.encode(&digest)
}
