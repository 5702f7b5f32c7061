use std::fmt;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::errors::InternalError;

type HmacSha256 = Hmac<Sha256>;

/// Compute HMAC-SHA256 for refresh tokens and return as hexadecimal string
pub fn hmac_sha256_token(key: &str, token: &str) -> Result<String, InternalError> {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .map_err(|e| InternalError::crypto("hmac_init", e.to_string()))?;
    mac.update(token.as_bytes());
    Ok(format!("{:x}", mac.finalize().into_bytes()))
}

/// Hex SHA-256 digest, used for sensitive audit fields
pub fn sha256_hex(value: &str) -> String {
    format!("{:x}", Sha256::digest(value.as_bytes()))
}

/// Generate a cryptographically secure random password
///
/// 20 characters drawn from upper/lowercase letters, digits and symbols.
pub fn generate_secure_password() -> String {
    const PASSWORD_LENGTH: usize = 20;
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ\
                             abcdefghijklmnopqrstuvwxyz\
                             0123456789\
                             !@#$%^&*()_+-=[]{}|;:,.<>?";

    let mut rng = rand::rng();
    (0..PASSWORD_LENGTH)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

/// Argon2id password hashing with an optional pepper.
///
/// Holds a hash of a random throwaway password so that verification
/// against a missing user costs the same as against a real one.
pub struct PasswordService {
    pepper: Option<Vec<u8>>,
    params: Params,
    dummy_hash: String,
}

impl PasswordService {
    pub fn new(pepper: Option<&str>) -> Result<Self, InternalError> {
        Self::with_params(pepper, Params::default())
    }

    /// Use explicit Argon2 cost parameters
    pub fn with_params(pepper: Option<&str>, params: Params) -> Result<Self, InternalError> {
        let mut service = Self {
            pepper: pepper.map(|p| p.as_bytes().to_vec()),
            params,
            dummy_hash: String::new(),
        };
        service.dummy_hash = service.hash(&generate_secure_password())?;
        Ok(service)
    }

    fn argon2(&self) -> Result<Argon2<'_>, InternalError> {
        match &self.pepper {
            Some(pepper) => Argon2::new_with_secret(
                pepper,
                Algorithm::Argon2id,
                Version::V0x13,
                self.params.clone(),
            )
            .map_err(|e| InternalError::crypto("argon2_init", e.to_string())),
            None => Ok(Argon2::new(
                Algorithm::Argon2id,
                Version::V0x13,
                self.params.clone(),
            )),
        }
    }

    /// Hash a password into a PHC string carrying its own random salt
    pub fn hash(&self, password: &str) -> Result<String, InternalError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| InternalError::crypto("hash_password", e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Verify `password` against `stored`, or against the dummy hash when
    /// there is no stored hash. The second case always returns false.
    pub fn verify(&self, password: &str, stored: Option<&str>) -> bool {
        let (candidate, real) = match stored {
            Some(hash) => (hash, true),
            None => (self.dummy_hash.as_str(), false),
        };

        let matches = match (PasswordHash::new(candidate), self.argon2()) {
            (Ok(parsed), Ok(argon2)) => argon2.verify_password(password.as_bytes(), &parsed).is_ok(),
            _ => {
                // Unparseable stored hash: still burn one hash so timing stays flat
                let _ = self.argon2().map(|argon2| {
                    PasswordHash::new(&self.dummy_hash)
                        .map(|parsed| argon2.verify_password(password.as_bytes(), &parsed))
                });
                false
            }
        };

        real && matches
    }
}

impl fmt::Debug for PasswordService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordService")
            .field("peppered", &self.pepper.is_some())
            .finish()
    }
}
