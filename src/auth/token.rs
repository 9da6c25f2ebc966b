use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use rand::RngCore;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::Token;

const ARGON2_MEMORY: u32 = 64 * 1024;
const ARGON2_ITERATIONS: u32 = 1;
const ARGON2_PARALLELISM: u32 = 4;
const ARGON2_OUTPUT_LEN: usize = 32;

const TOKEN_PREFIX: &str = "pantry";
const LOOKUP_LENGTH: usize = 8;
const SECRET_BYTES: usize = 12;
const SECRET_LENGTH: usize = SECRET_BYTES * 2;
const MAX_ISSUE_ATTEMPTS: u32 = 3;

/// Issues and checks bearer tokens of the form `pantry_<lookup>_<secret>`.
///
/// Only the Argon2id hash of a token is stored. The lookup part is kept in
/// clear so a presented token can be found without scanning every hash.
pub struct TokenGenerator {
    argon2: Argon2<'static>,
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenGenerator {
    #[must_use]
    pub fn new() -> Self {
        let params = Params::new(
            ARGON2_MEMORY,
            ARGON2_ITERATIONS,
            ARGON2_PARALLELISM,
            Some(ARGON2_OUTPUT_LEN),
        )
        .unwrap_or_default();

        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Returns (raw_token, lookup, hash).
    pub fn generate(&self) -> Result<(String, String, String)> {
        let lookup = generate_lookup();
        let secret = generate_secret();
        let raw_token = format!("{TOKEN_PREFIX}_{lookup}_{secret}");
        let hash = self.hash(&raw_token)?;
        Ok((raw_token, lookup, hash))
    }

    /// Generates a token and stores it. An admin token is issued when
    /// `user_id` is `None`. Returns the stored row and the raw token, which
    /// is never persisted.
    pub fn issue(
        &self,
        store: &dyn Store,
        user_id: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<(Token, String)> {
        for _ in 0..MAX_ISSUE_ATTEMPTS {
            let (raw_token, lookup, hash) = self.generate()?;
            let token = Token {
                id: Uuid::new_v4().to_string(),
                token_hash: hash,
                token_lookup: lookup,
                is_admin: user_id.is_none(),
                user_id: user_id.map(str::to_string),
                created_at: Utc::now(),
                expires_at,
                last_used_at: None,
            };

            match store.create_token(&token) {
                Ok(()) => return Ok((token, raw_token)),
                Err(Error::TokenLookupCollision) => {
                    tracing::debug!("token lookup collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::TokenLookupCollision)
    }

    pub fn hash(&self, token: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(token.as_bytes(), &salt)
            .map_err(|e| Error::Credential(format!("failed to hash token: {e}")))?;
        Ok(hash.to_string())
    }

    pub fn verify(&self, token: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| Error::Credential(format!("invalid hash format: {e}")))?;

        match self.argon2.verify_password(token.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::Credential(format!("failed to verify token: {e}"))),
        }
    }
}

fn generate_lookup() -> String {
    Uuid::new_v4().simple().to_string()[..LOOKUP_LENGTH].to_string()
}

fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Splits a raw token into (lookup, secret).
pub fn parse_token(token: &str) -> Result<(String, String)> {
    let rest = token
        .strip_prefix(TOKEN_PREFIX)
        .and_then(|r| r.strip_prefix('_'))
        .ok_or(Error::InvalidTokenFormat)?;

    let (lookup, secret) = rest.split_once('_').ok_or(Error::InvalidTokenFormat)?;

    if lookup.len() != LOOKUP_LENGTH || secret.len() != SECRET_LENGTH || secret.contains('_') {
        return Err(Error::InvalidTokenFormat);
    }

    Ok((lookup.to_string(), secret.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_generation_format() {
        let generator = TokenGenerator::new();
        let (token, lookup, _hash) = generator.generate().unwrap();

        assert!(token.starts_with("pantry_"));
        assert_eq!(lookup.len(), 8);

        let parts: Vec<&str> = token.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[1], lookup);
        assert_eq!(parts[2].len(), 24);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_verify_accepts_issued_token_only() {
        let generator = TokenGenerator::new();
        let (token, _, hash) = generator.generate().unwrap();

        assert!(generator.verify(&token, &hash).unwrap());

        let tampered = format!("{}z", &token[..token.len() - 1]);
        assert!(!generator.verify(&tampered, &hash).unwrap());
    }

    #[test]
    fn test_parse_token() {
        let (lookup, secret) = parse_token("pantry_12345678_123456789012345678901234").unwrap();
        assert_eq!(lookup, "12345678");
        assert_eq!(secret, "123456789012345678901234");

        assert!(parse_token("cutlery_12345678_123456789012345678901234").is_err());
        assert!(parse_token("pantry_12345678").is_err());
        assert!(parse_token("pantry_1234_123456789012345678901234").is_err());
    }

    #[test]
    fn test_issue_stores_hash_not_raw_token() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = crate::store::SqliteStore::new(temp.path().join("test.db")).unwrap();
        store.initialize().unwrap();

        let generator = TokenGenerator::new();
        let (token, raw) = generator.issue(&store, None, None).unwrap();
        assert!(token.is_admin);
        assert!(store.has_admin_token().unwrap());

        let (lookup, _) = parse_token(&raw).unwrap();
        let stored = store.get_token_by_lookup(&lookup).unwrap().unwrap();
        assert_ne!(stored.token_hash, raw);
        assert!(generator.verify(&raw, &stored.token_hash).unwrap());
    }

    #[test]
    fn test_hash_is_phc_format() {
        let generator = TokenGenerator::new();
        let (_, _, hash) = generator.generate().unwrap();

        assert!(hash.starts_with("$argon2id$"));
    }
}
