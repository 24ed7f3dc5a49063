//! Password hashing and verification
//!
//! Argon2id with a per-call salt, encoded as a PHC string. Verification
//! treats a mismatch as an ordinary `Ok(false)`; only an undecodable stored
//! hash is an error, so callers can tell "wrong password" apart from
//! "corrupt credential record". The final hash comparison inside argon2 is
//! constant-time.

use argon2::password_hash::{Error as PasswordHashError, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use rand::rngs::OsRng;
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tracing::error;

/// Failures from hashing or verifying a credential
#[derive(Error, Debug)]
pub enum CredentialError {
    /// The stored hash string is not a valid PHC encoding
    #[error("malformed password hash encoding")]
    MalformedHash,

    /// Hashing itself failed (bad parameters, allocation failure)
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

/// Verifies presented passwords against stored Argon2id hashes
#[derive(Clone)]
pub struct CredentialVerifier {
    params: Params,
    // Shared across clones so the filler hash is computed once per verifier,
    // at this verifier's own cost parameters
    dummy_hash: Arc<OnceLock<String>>,
}

impl Default for CredentialVerifier {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl CredentialVerifier {
    /// Create a verifier with explicit cost parameters
    pub fn new(params: Params) -> Self {
        Self {
            params,
            dummy_hash: Arc::new(OnceLock::new()),
        }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a plaintext password with a fresh random salt
    ///
    /// The salt and cost parameters are embedded in the returned PHC string.
    pub fn hash(&self, plaintext: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| CredentialError::Hashing(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Verify a plaintext password against a stored hash
    ///
    /// A mismatch is `Ok(false)`, never an error.
    pub fn verify(&self, hash: &str, plaintext: &str) -> Result<bool, CredentialError> {
        let parsed = PasswordHash::new(hash).map_err(|_| CredentialError::MalformedHash)?;
        match self.argon2().verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(PasswordHashError::Password) => Ok(false),
            Err(_) => Err(CredentialError::MalformedHash),
        }
    }

    /// A valid hash of a throwaway password, used to burn a verification
    /// when the email is unknown so that path costs about as much as a real
    /// password check. Computed once per verifier, at this verifier's cost
    /// parameters.
    pub fn dummy_hash(&self) -> String {
        self.dummy_hash
            .get_or_init(|| match self.hash("timing-equalization-filler") {
                Ok(hash) => hash,
                Err(e) => {
                    error!("Failed to compute timing filler hash: {}", e);
                    String::new()
                }
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_verifier() -> CredentialVerifier {
        // Minimal costs so the suite stays quick
        CredentialVerifier::new(Params::new(1024, 2, 1, None).unwrap())
    }

    #[test]
    fn hash_then_verify_succeeds() {
        let verifier = fast_verifier();
        let hash = verifier.hash("p@ss1234").unwrap();
        assert!(verifier.verify(&hash, "p@ss1234").unwrap());
    }

    #[test]
    fn wrong_password_is_false_not_error() {
        let verifier = fast_verifier();
        let hash = verifier.hash("p@ss1234").unwrap();
        assert!(!verifier.verify(&hash, "wrong").unwrap());
    }

    #[test]
    fn salts_are_unique_per_call() {
        let verifier = fast_verifier();
        let a = verifier.hash("same-password").unwrap();
        let b = verifier.hash("same-password").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_is_a_distinct_error() {
        let verifier = fast_verifier();
        let result = verifier.verify("not-a-phc-string", "anything");
        assert!(matches!(result, Err(CredentialError::MalformedHash)));
    }

    #[test]
    fn dummy_hash_verifies_like_a_real_one() {
        let verifier = fast_verifier();
        let dummy = verifier.dummy_hash();
        assert!(!dummy.is_empty());
        assert!(!verifier.verify(&dummy, "anything-else").unwrap());
    }

    #[test]
    fn dummy_hash_is_cached_per_verifier_at_its_own_cost() {
        let light = CredentialVerifier::new(Params::new(1024, 2, 1, None).unwrap());
        let heavy = CredentialVerifier::new(Params::new(2048, 3, 1, None).unwrap());

        // Each verifier carries its own parameters in its filler hash
        assert!(light.dummy_hash().contains("m=1024,t=2"));
        assert!(heavy.dummy_hash().contains("m=2048,t=3"));

        // Clones share the cached value instead of recomputing
        let clone = light.clone();
        assert_eq!(light.dummy_hash(), clone.dummy_hash());
    }
}
