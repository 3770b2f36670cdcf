use std::fmt;

use chrono::{DateTime, Utc};
use microblog_crypto::{PasswordError, PasswordHasher, hash_password, verify_password};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub const MAX_USERNAME_LEN: usize = 64;
pub const MAX_EMAIL_LEN: usize = 120;
pub const MAX_BODY_LEN: usize = 140;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("username must be 1 to 64 characters")]
    Username,
    #[error("email must be 3 to 120 characters and contain '@'")]
    Email,
    #[error("post body must be 1 to 140 characters, got {0}")]
    BodyLength(usize),
}

/// A registered account.
///
/// `id` is `None` until the account has been saved through a
/// [`Repository`](crate::Repository). The password hash is never serialized.
#[derive(Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Option<i64>,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    password_hash: Option<String>,
}

impl Account {
    pub fn new(username: &str, email: &str) -> Result<Self, ModelError> {
        let username = username.trim();
        let email = email.trim();
        validate_username(username)?;
        validate_email(email)?;

        Ok(Self {
            id: None,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: None,
        })
    }

    /// Rebuild an account from stored columns. No validation: the row
    /// already passed through `new` and the schema constraints.
    pub fn from_parts(
        id: i64,
        username: String,
        email: String,
        password_hash: Option<String>,
    ) -> Self {
        Self {
            id: Some(id),
            username,
            email,
            password_hash,
        }
    }

    pub fn password_hash(&self) -> Option<&str> {
        self.password_hash.as_deref()
    }

    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Replace the credential with a freshly salted Argon2id hash.
    /// Only the in-memory record changes; call `Repository::save` to persist.
    pub fn set_password(&mut self, plaintext: &str) -> Result<(), PasswordError> {
        self.password_hash = Some(hash_password(plaintext)?);
        Ok(())
    }

    pub fn set_password_with(
        &mut self,
        hasher: &PasswordHasher,
        plaintext: &str,
    ) -> Result<(), PasswordError> {
        self.password_hash = Some(hasher.hash(plaintext)?);
        Ok(())
    }

    /// True only when a hash is set and `candidate` matches it.
    pub fn check_password(&self, candidate: &str) -> bool {
        let Some(stored) = self.password_hash.as_deref() else {
            return false;
        };

        match verify_password(stored, candidate) {
            Ok(matched) => matched,
            Err(e) => {
                warn!(account = %self, "Rejecting login: {}", e);
                false
            }
        }
    }

    pub fn change_email(&mut self, email: &str) -> Result<(), ModelError> {
        let email = email.trim();
        validate_email(email)?;
        self.email = email.to_string();
        Ok(())
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Account {}>", self.username)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &self.password_hash.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn validate_username(username: &str) -> Result<(), ModelError> {
    let len = username.chars().count();
    if len == 0 || len > MAX_USERNAME_LEN {
        return Err(ModelError::Username);
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ModelError> {
    let len = email.chars().count();
    if !(3..=MAX_EMAIL_LEN).contains(&len) {
        return Err(ModelError::Email);
    }
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(ModelError::Email),
    }
}

/// Validated post text, at most 140 characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PostBody(String);

impl PostBody {
    pub fn new(body: &str) -> Result<Self, ModelError> {
        let len = body.chars().count();
        if len == 0 || len > MAX_BODY_LEN {
            return Err(ModelError::BodyLength(len));
        }
        Ok(Self(body.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PostBody {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<PostBody> for String {
    fn from(body: PostBody) -> Self {
        body.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub author_id: i64,
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Post {}>", self.body)
    }
}

/// One page of an account's posts, newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostQuery {
    pub limit: u32,
    pub offset: u32,
}

impl PostQuery {
    pub const DEFAULT_LIMIT: u32 = 25;
    pub const MAX_LIMIT: u32 = 100;

    pub fn new(limit: u32, offset: u32) -> Self {
        Self {
            limit: limit.clamp(1, Self::MAX_LIMIT),
            offset,
        }
    }

    /// The page following this one.
    pub fn next(self) -> Self {
        Self {
            limit: self.limit,
            offset: self.offset.saturating_add(self.limit),
        }
    }
}

impl Default for PostQuery {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LIMIT, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> PasswordHasher {
        PasswordHasher::with_params(1024, 1, 1).unwrap()
    }

    #[test]
    fn set_then_check_password() {
        let hasher = cheap();
        for password in ["hunter2", "", "pässwörd with spaces", "x"] {
            let mut account = Account::new("alice", "alice@example.com").unwrap();
            account.set_password_with(&hasher, password).unwrap();

            assert!(account.check_password(password));
            assert!(!account.check_password(&format!("{password}x")));
            assert_ne!(account.password_hash(), Some(password));
        }
    }

    #[test]
    fn default_hasher_roundtrip() {
        let mut account = Account::new("gina", "gina@example.com").unwrap();
        account.set_password("default-params").unwrap();

        assert!(account.password_hash().unwrap().starts_with("$argon2id$"));
        assert!(account.check_password("default-params"));
        assert!(!account.check_password("default-paramsx"));
    }

    #[test]
    fn check_password_without_hash_is_false() {
        let account = Account::new("bob", "bob@example.com").unwrap();
        assert!(!account.has_password());
        assert!(!account.check_password(""));
        assert!(!account.check_password("anything"));
    }

    #[test]
    fn set_password_overwrites_previous_hash() {
        let hasher = cheap();
        let mut account = Account::new("carol", "carol@example.com").unwrap();
        account.set_password_with(&hasher, "first").unwrap();
        account.set_password_with(&hasher, "second").unwrap();

        assert!(!account.check_password("first"));
        assert!(account.check_password("second"));
    }

    #[test]
    fn malformed_stored_hash_fails_verification() {
        let account = Account::from_parts(1, "dave".into(), "dave@example.com".into(), Some("garbage".into()));
        assert!(!account.check_password("garbage"));
    }

    #[test]
    fn display_and_debug_hide_hash() {
        let mut account = Account::new("erin", "erin@example.com").unwrap();
        account.set_password_with(&cheap(), "secret").unwrap();

        assert_eq!(account.to_string(), "<Account erin>");
        let debug = format!("{:?}", account);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("argon2"));
        assert!(!serde_json::to_string(&account).unwrap().contains("argon2"));
    }

    #[test]
    fn account_validation() {
        assert_eq!(Account::new("", "a@b.c").unwrap_err(), ModelError::Username);
        assert_eq!(Account::new(&"u".repeat(65), "a@b.c").unwrap_err(), ModelError::Username);
        assert_eq!(Account::new("frank", "no-at-sign").unwrap_err(), ModelError::Email);
        assert_eq!(Account::new("frank", "@example.com").unwrap_err(), ModelError::Email);
        assert!(Account::new(&"u".repeat(64), "f@example.com").is_ok());
    }

    #[test]
    fn post_body_length_is_counted_in_chars() {
        assert!(PostBody::new(&"a".repeat(140)).is_ok());
        assert_eq!(PostBody::new(&"a".repeat(141)), Err(ModelError::BodyLength(141)));
        assert!(PostBody::new(&"é".repeat(140)).is_ok());
        assert_eq!(PostBody::new(""), Err(ModelError::BodyLength(0)));
    }

    #[test]
    fn post_body_deserialization_validates() {
        assert!(serde_json::from_str::<PostBody>("\"hello\"").is_ok());
        let long = format!("\"{}\"", "a".repeat(141));
        assert!(serde_json::from_str::<PostBody>(&long).is_err());
    }

    #[test]
    fn post_query_clamps_and_pages() {
        assert_eq!(PostQuery::new(0, 0).limit, 1);
        assert_eq!(PostQuery::new(1000, 0).limit, PostQuery::MAX_LIMIT);

        let next = PostQuery::default().next();
        assert_eq!(next.offset, PostQuery::DEFAULT_LIMIT);
        assert_eq!(next.limit, PostQuery::DEFAULT_LIMIT);
    }
}
