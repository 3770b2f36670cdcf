use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordVerifier, Version,
    password_hash::{PasswordHasher as _, SaltString, rand_core::OsRng},
};
use thiserror::Error;

/// Upper bound on a stored hash, matching the `password_hash` column width.
pub const MAX_HASH_LEN: usize = 256;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("invalid argon2 parameters: {0}")]
    Params(String),
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("stored password hash is malformed: {0}")]
    Malformed(String),
}

/// Argon2id hasher with explicit cost parameters.
///
/// `PasswordHasher::default()` uses the argon2 crate's recommended
/// parameters. Verification never depends on the hasher's own parameters:
/// they are read back from the PHC string being checked.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl PasswordHasher {
    /// Build a hasher with custom memory (KiB), iteration and lane costs.
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self, PasswordError> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| PasswordError::Params(e.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash `plaintext` with a fresh random salt into a PHC string.
    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| PasswordError::Hash(e.to_string()))?
            .to_string();

        if hash.len() > MAX_HASH_LEN {
            return Err(PasswordError::Hash(format!(
                "encoded hash is {} bytes, limit is {}",
                hash.len(),
                MAX_HASH_LEN
            )));
        }

        Ok(hash)
    }

    /// Check `candidate` against a stored PHC string.
    ///
    /// `Ok(false)` on mismatch, `Err` only when `stored` cannot be parsed.
    pub fn verify(&self, stored: &str, candidate: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(stored).map_err(|e| PasswordError::Malformed(e.to_string()))?;

        Ok(self
            .argon2
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok())
    }
}

/// Hash with the default parameters.
pub fn hash_password(plaintext: &str) -> Result<String, PasswordError> {
    PasswordHasher::default().hash(plaintext)
}

/// Verify with the parameters encoded in `stored`.
pub fn verify_password(stored: &str, candidate: &str) -> Result<bool, PasswordError> {
    PasswordHasher::default().verify(stored, candidate)
}
