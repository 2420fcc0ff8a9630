//! Salted credential hashing for student and teacher accounts
//!
//! Stored form is `salt$hexdigest` where the digest is
//! SHA-256(salt || password). Reports only ever surface a presence flag,
//! never the stored value.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::error::StoreError;

/// A salted password hash in its decoded form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    salt: String,
    digest: String,
}

impl PasswordHash {
    /// Derive a hash from a plaintext password with a fresh random salt
    pub fn derive(password: &str) -> Self {
        let salt = Uuid::new_v4().simple().to_string();
        let digest = Self::digest_with_salt(&salt, password);
        PasswordHash { salt, digest }
    }

    /// Parse the stored `salt$hexdigest` encoding
    pub fn parse(encoded: &str) -> Result<Self, StoreError> {
        let (salt, digest) = encoded
            .split_once('$')
            .ok_or_else(|| StoreError::MalformedCredential(encoded.to_string()))?;

        if salt.is_empty()
            || digest.len() != 64
            || !digest.chars().all(|c| c.is_ascii_hexdigit())
        {
            return Err(StoreError::MalformedCredential(encoded.to_string()));
        }

        Ok(PasswordHash {
            salt: salt.to_string(),
            digest: digest.to_ascii_lowercase(),
        })
    }

    /// Encode for storage
    pub fn encode(&self) -> String {
        format!("{}${}", self.salt, self.digest)
    }

    /// Check a candidate password against the stored hash
    pub fn verify(&self, password: &str) -> bool {
        Self::digest_with_salt(&self.salt, password) == self.digest
    }

    fn digest_with_salt(salt: &str, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(password.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Presence flag for report rendering ("set" / "none")
pub fn credential_flag(stored: &Option<String>) -> &'static str {
    if stored.is_some() {
        "set"
    } else {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_and_verify() {
        let hash = PasswordHash::derive("s3cret");
        assert!(hash.verify("s3cret"));
        assert!(!hash.verify("guess"));
    }

    #[test]
    fn test_encode_parse_roundtrip() {
        let hash = PasswordHash::derive("hunter2");
        let parsed = PasswordHash::parse(&hash.encode()).unwrap();
        assert_eq!(parsed, hash);
        assert!(parsed.verify("hunter2"));
    }

    #[test]
    fn test_fresh_salt_per_derivation() {
        let a = PasswordHash::derive("same");
        let b = PasswordHash::derive("same");
        assert_ne!(a.encode(), b.encode());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(PasswordHash::parse("no-separator").is_err());
        assert!(PasswordHash::parse("$deadbeef").is_err());
        assert!(PasswordHash::parse("salt$nothex!").is_err());
        assert!(PasswordHash::parse("salt$abc").is_err());
    }

    #[test]
    fn test_credential_flag() {
        assert_eq!(credential_flag(&Some("salt$00".to_string())), "set");
        assert_eq!(credential_flag(&None), "none");
    }
}
