use std::fmt::Debug;

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Argon2,
};
use tracing::{error, warn};

/// One-way password hashing.
pub trait PasswordHasher: Send + Sync + Debug {
    /// Salted hash of `plain`, encoded as a PHC string.
    fn hash(&self, plain: &str) -> anyhow::Result<String>;

    /// `true` only if `plain` matches `hash`. A malformed hash never matches.
    fn verify(&self, plain: &str, hash: &str) -> bool;
}

#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher;

impl Argon2Hasher {
    pub fn new() -> Self {
        Self
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    fn verify(&self, plain: &str, hash: &str) -> bool {
        let parsed = match PasswordHash::new(hash) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "argon2 parse hash error");
                return false;
            }
        };
        // digest comparison inside the verifier is constant-time
        Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let hasher = Argon2Hasher::new();
        let hash = hasher.hash("abc12345").expect("hashing should succeed");
        assert!(hasher.verify("abc12345", &hash));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let hasher = Argon2Hasher::new();
        let hash = hasher.hash("old12345").expect("hashing should succeed");
        assert!(!hasher.verify("new12345", &hash));
        assert!(!hasher.verify("", &hash));
    }

    #[test]
    fn hash_is_salted() {
        let hasher = Argon2Hasher::new();
        let first = hasher.hash("abc12345").unwrap();
        let second = hasher.hash("abc12345").unwrap();
        assert_ne!(first, second);
        assert!(!first.contains("abc12345"));
    }

    #[test]
    fn verify_is_false_on_malformed_hash() {
        let hasher = Argon2Hasher::new();
        assert!(!hasher.verify("anything", "not-a-valid-hash"));
    }
}
