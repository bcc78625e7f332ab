//! Password hashing and verification using argon2id.
//!
//! Each comparison costs tens of milliseconds and megabytes of RAM. Callers on
//! an async runtime should run [`verify_password`] on the blocking pool.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

pub use argon2::password_hash::Error as PasswordHashError;

/// Hash a password using argon2id with default cost and a random salt.
///
/// Returns a PHC string (`$argon2id$v=19$m=...`) that embeds the parameters,
/// so hashes made with different costs all verify.
pub fn hash_password(password: &str) -> Result<String, PasswordHashError> {
    hash_with(&Argon2::default(), password)
}

/// Hash a password with explicit argon2id cost parameters.
pub fn hash_password_with_params(
    password: &str,
    params: Params,
) -> Result<String, PasswordHashError> {
    hash_with(&Argon2::new(Algorithm::Argon2id, Version::V0x13, params), password)
}

fn hash_with(argon2: &Argon2<'_>, password: &str) -> Result<String, PasswordHashError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC hash.
///
/// Returns `Ok(false)` on mismatch. An `Err` means the stored hash itself
/// could not be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordHashError> {
    let parsed_hash = PasswordHash::new(hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
pub(crate) fn cheap_hash(password: &str) -> String {
    let params = Params::new(1024, 1, 1, None).unwrap();
    hash_password_with_params(password, params).unwrap()
}
