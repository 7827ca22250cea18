use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::warn;

use crate::error::{Error, Result};

/// Argon2id with the crate's default cost and a fresh salt per call.
pub fn hash_password(plain: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| Error::Hashing(format!("argon2: {e}")))?
        .to_string();
    Ok(hash)
}

/// A mismatch and an unreadable stored hash both come back as `Authentication`.
pub fn verify_password(plain: &str, hash: &str) -> Result<()> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        warn!(error = %e, "argon2 parse hash error");
        Error::Authentication
    })?;
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .map_err(|_| Error::Authentication)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        verify_password(password, &hash).expect("verify should succeed");
    }

    #[test]
    fn hash_is_salted() {
        let a = hash_password("same").unwrap();
        let b = hash_password("same").unwrap();
        assert_ne!(a, b);
        assert!(!a.contains("same"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hash = hash_password("correct-horse-battery-staple").unwrap();
        let err = verify_password("wrong-password", &hash).unwrap_err();
        assert!(matches!(err, Error::Authentication));
    }

    #[test]
    fn verify_rejects_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(matches!(err, Error::Authentication));
    }
}
