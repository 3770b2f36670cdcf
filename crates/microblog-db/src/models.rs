//! Database row types. These map directly to SQLite rows and are converted
//! into the storage-independent types from `microblog-types`.
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use microblog_types::{Account, Post};

pub struct AccountRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account::from_parts(row.id, row.username, row.email, row.password_hash)
    }
}

pub struct PostRow {
    pub id: i64,
    pub body: String,
    pub timestamp: String,
    pub author_id: i64,
}

impl TryFrom<PostRow> for Post {
    type Error = anyhow::Error;

    fn try_from(row: PostRow) -> Result<Self> {
        Ok(Post {
            id: row.id,
            body: row.body,
            timestamp: parse_timestamp(&row.timestamp)
                .with_context(|| format!("post {} has a bad timestamp", row.id))?,
            author_id: row.author_id,
        })
    }
}

/// Fixed-width RFC 3339 in UTC, so text order matches time order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}
