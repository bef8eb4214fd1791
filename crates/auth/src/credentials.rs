//! Credential verification and password hashing (Argon2id).

use argon2::password_hash::{PasswordHash, PasswordHasher, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::principal::{LookupError, Principal, PrincipalLookup};

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashingCost {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown identifier or wrong secret; deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid hashing parameters: {0}")]
    InvalidCost(String),

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error(transparent)]
    Lookup(#[from] LookupError),
}

/// Checks submitted secrets against stored Argon2 hashes.
pub struct CredentialVerifier {
    argon2: Argon2<'static>,
    /// Verified when the identifier is unknown so both failure paths do the same work.
    dummy_hash: String,
}

impl CredentialVerifier {
    pub fn new(cost: HashingCost) -> Result<Self, AuthError> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| AuthError::InvalidCost(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let dummy_hash = hash_with(&argon2, "forumhub-unknown-principal")?;
        Ok(Self { argon2, dummy_hash })
    }

    /// Salted one-way hash of `plaintext`, as a PHC string.
    pub fn hash_secret(&self, plaintext: &str) -> Result<String, AuthError> {
        hash_with(&self.argon2, plaintext)
    }

    /// Authenticate `identifier`/`plaintext` against the principal store.
    pub async fn authenticate<L>(
        &self,
        lookup: &L,
        identifier: &str,
        plaintext: &str,
    ) -> Result<Principal, AuthError>
    where
        L: PrincipalLookup + ?Sized,
    {
        match lookup.find_by_identifier(identifier).await? {
            Some(principal) if self.matches(plaintext, &principal.secret_hash) => Ok(principal),
            Some(_) => Err(AuthError::InvalidCredentials),
            None => {
                let _ = self.matches(plaintext, &self.dummy_hash);
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    /// Recompute the hash with the stored salt and parameters and compare
    /// outputs in constant time.
    pub fn matches(&self, plaintext: &str, stored: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored) else {
            tracing::debug!("stored secret hash is not a PHC string");
            return false;
        };
        let (Some(salt), Some(expected)) = (parsed.salt, parsed.hash) else {
            return false;
        };
        let Ok(params) = Params::try_from(&parsed) else {
            return false;
        };

        let computed = match self.argon2.hash_password_customized(
            plaintext.as_bytes(),
            Some(parsed.algorithm),
            parsed.version,
            params,
            salt,
        ) {
            Ok(h) => h,
            Err(_) => return false,
        };

        match computed.hash {
            Some(actual) => actual.as_bytes().ct_eq(expected.as_bytes()).into(),
            None => false,
        }
    }
}

fn hash_with(argon2: &Argon2<'_>, plaintext: &str) -> Result<String, AuthError> {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    let salt = SaltString::encode_b64(&bytes).map_err(|e| AuthError::Hashing(e.to_string()))?;

    argon2
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;

    use super::*;

    fn fast() -> HashingCost {
        HashingCost {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        }
    }

    struct Directory(HashMap<String, Principal>);

    #[async_trait]
    impl PrincipalLookup for Directory {
        async fn find_by_identifier(&self, identifier: &str) -> Result<Option<Principal>, LookupError> {
            Ok(self.0.get(identifier).cloned())
        }
    }

    struct Offline;

    #[async_trait]
    impl PrincipalLookup for Offline {
        async fn find_by_identifier(&self, _identifier: &str) -> Result<Option<Principal>, LookupError> {
            Err(LookupError("connection refused".into()))
        }
    }

    fn directory(verifier: &CredentialVerifier) -> Directory {
        let hash = verifier.hash_secret("hunter2").unwrap();
        let principal = Principal::register("Ana", "ana@x.com", hash);
        Directory(HashMap::from([(principal.identifier.clone(), principal)]))
    }

    #[test]
    fn hashes_are_salted() {
        let verifier = CredentialVerifier::new(fast()).unwrap();
        let a = verifier.hash_secret("hunter2").unwrap();
        let b = verifier.hash_secret("hunter2").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2id$"));
        assert!(!a.contains("hunter2"));
        assert!(verifier.matches("hunter2", &a));
        assert!(verifier.matches("hunter2", &b));
        assert!(!verifier.matches("hunter3", &a));
    }

    #[test]
    fn unparsable_hash_never_matches() {
        let verifier = CredentialVerifier::new(fast()).unwrap();
        assert!(!verifier.matches("hunter2", "hunter2"));
        assert!(!verifier.matches("", ""));
    }

    #[test]
    fn hashes_from_other_cost_settings_still_verify() {
        let strong = CredentialVerifier::new(HashingCost {
            memory_kib: 2048,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();
        let hash = strong.hash_secret("hunter2").unwrap();
        let verifier = CredentialVerifier::new(fast()).unwrap();
        assert!(verifier.matches("hunter2", &hash));
    }

    #[test]
    fn invalid_cost_is_rejected() {
        let err = CredentialVerifier::new(HashingCost {
            memory_kib: 1,
            iterations: 1,
            parallelism: 1,
        })
        .err()
        .unwrap();
        assert!(matches!(err, AuthError::InvalidCost(_)));
    }

    #[tokio::test]
    async fn correct_secret_returns_principal_unchanged() {
        let verifier = CredentialVerifier::new(fast()).unwrap();
        let dir = directory(&verifier);
        let expected = dir.0["ana@x.com"].clone();

        let principal = verifier.authenticate(&dir, "ana@x.com", "hunter2").await.unwrap();
        assert_eq!(principal, expected);
    }

    #[tokio::test]
    async fn unknown_identifier_and_wrong_secret_fail_identically() {
        let verifier = CredentialVerifier::new(fast()).unwrap();
        let dir = directory(&verifier);

        let wrong_secret = verifier.authenticate(&dir, "ana@x.com", "nope").await.unwrap_err();
        let unknown = verifier.authenticate(&dir, "bob@x.com", "hunter2").await.unwrap_err();

        assert_eq!(wrong_secret, AuthError::InvalidCredentials);
        assert_eq!(unknown, AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn lookup_failures_are_not_reported_as_bad_credentials() {
        let verifier = CredentialVerifier::new(fast()).unwrap();
        let err = verifier.authenticate(&Offline, "ana@x.com", "hunter2").await.unwrap_err();
        assert!(matches!(err, AuthError::Lookup(_)));
    }
}
