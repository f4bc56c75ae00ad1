//! Admin API authentication.

use argon2::password_hash::SaltString;
use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

/// Admin configuration with hashed secret.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// The argon2 hashed admin secret.
    pub secret_hash: String,
}

impl AdminConfig {
    /// Create a new AdminConfig with the given hashed secret.
    pub fn new(secret_hash: String) -> Self {
        Self { secret_hash }
    }

    /// Build from an operator supplied secret. A plaintext secret (anything
    /// not starting with `$argon2`) is hashed; an argon2 PHC string is kept.
    pub fn from_secret(secret: &str) -> Result<Self, argon2::password_hash::Error> {
        if is_argon2_hash(secret) {
            PasswordHash::new(secret)?;
            return Ok(Self::new(secret.to_string()));
        }
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default().hash_password(secret.as_bytes(), &salt)?;
        Ok(Self::new(hash.to_string()))
    }

    /// Verify a plaintext password against the stored hash.
    ///
    /// Returns `true` if the password matches, `false` otherwise.
    pub fn verify_secret(&self, plaintext: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(&self.secret_hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

fn is_argon2_hash(secret: &str) -> bool {
    secret.starts_with("$argon2")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plaintext_secret_is_hashed() {
        let admin_config = AdminConfig::from_secret("test-password").unwrap();

        assert!(is_argon2_hash(&admin_config.secret_hash));
        assert!(admin_config.verify_secret("test-password"));
        assert!(!admin_config.verify_secret("wrong-password"));
    }

    #[test]
    fn test_hashed_secret_is_kept() {
        let hashed = AdminConfig::from_secret("s3cret").unwrap().secret_hash;
        let admin_config = AdminConfig::from_secret(&hashed).unwrap();

        assert_eq!(admin_config.secret_hash, hashed);
        assert!(admin_config.verify_secret("s3cret"));
    }
}
