/// Password hashing and verification using Argon2id
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};

use crate::error::AppError;

/// Hash a password with a per-hash random salt.
/// Returns the PHC hash string suitable for storage in the database.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(rand::thread_rng());
    let argon2 = Argon2::default();

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| AppError::Internal("Failed to hash password".to_string()))?
        .to_string();

    Ok(password_hash)
}

/// Verify a password against a stored hash.
/// The comparison goes through the argon2 crate's constant-time verifier.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash format".to_string()))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = "testpassword";
        let hash = hash_password(password).unwrap();
        assert!(verify_password(password, &hash).is_ok());
    }

    #[test]
    fn test_wrong_password() {
        let hash = hash_password("testpassword").unwrap();
        assert!(verify_password("wrongpassword", &hash).is_err());
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password("testpassword").unwrap();
        let second = hash_password("testpassword").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_invalid_stored_hash_is_not_credentials_error() {
        let err = verify_password("testpassword", "not-a-phc-string").unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
