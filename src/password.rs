//! Stored user passwords are argon2id PHC strings; plaintext never reaches
//! the repositories.

use argon2::password_hash::{
    self, rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;

use crate::error::CredentialError;

fn argon2id() -> Argon2<'static> {
    Argon2::default()
}

/// PHC string for `password` under a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    let phc = argon2id()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| CredentialError(format!("hashing a user password failed: {e}")))?;
    Ok(phc.to_string())
}

/// `Ok(false)` on a wrong password. A stored value that is not a PHC string,
/// or any other argon2 failure, is an error rather than a mismatch.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, CredentialError> {
    let phc = PasswordHash::new(stored)
        .map_err(|e| CredentialError(format!("stored password is not a PHC string: {e}")))?;

    match argon2id().verify_password(password.as_bytes(), &phc) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(CredentialError(format!("checking a user password failed: {e}"))),
    }
}
