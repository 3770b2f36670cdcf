use thiserror::Error;

use crate::models::{Account, ModelError, Post, PostBody, PostQuery};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{field} is already taken")]
    Conflict { field: &'static str },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error(transparent)]
    Invalid(#[from] ModelError),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Storage for accounts and their posts.
///
/// Implementations own persistence only. Credential handling and field
/// validation live on [`Account`] and [`PostBody`], so nothing here needs to
/// know how a password is hashed.
pub trait Repository {
    fn find_account_by_id(&self, id: i64) -> Result<Option<Account>, StoreError>;

    fn find_account_by_username(&self, username: &str) -> Result<Option<Account>, StoreError>;

    /// Insert when `account.id` is `None` (assigning the new id), update otherwise.
    fn save(&self, account: &mut Account) -> Result<(), StoreError>;

    /// Remove an account and every post it owns. Returns false if no such account.
    fn delete_account(&self, id: i64) -> Result<bool, StoreError>;

    fn create_post(&self, author_id: i64, body: &PostBody) -> Result<Post, StoreError>;

    /// One page of `account_id`'s posts, newest first.
    fn list_posts_for(&self, account_id: i64, query: PostQuery) -> Result<Vec<Post>, StoreError>;

    fn count_posts_for(&self, account_id: i64) -> Result<u64, StoreError>;

    /// Resolve a session subject to an account.
    ///
    /// Subjects that are not a decimal id resolve to `None`; only store
    /// failures are errors.
    fn load_account(&self, subject: &str) -> Result<Option<Account>, StoreError> {
        match parse_subject(subject) {
            Some(id) => self.find_account_by_id(id),
            None => Ok(None),
        }
    }
}

pub fn parse_subject(subject: &str) -> Option<i64> {
    subject.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_parsing() {
        assert_eq!(parse_subject("42"), Some(42));
        assert_eq!(parse_subject(" 7 "), Some(7));
        assert_eq!(parse_subject(""), None);
        assert_eq!(parse_subject("abc"), None);
        assert_eq!(parse_subject("4.2"), None);
        assert_eq!(parse_subject("99999999999999999999"), None);
    }

    #[test]
    fn conflict_message_names_field() {
        let err = StoreError::Conflict { field: "email" };
        assert_eq!(err.to_string(), "email is already taken");
    }
}
