use crate::Database;
use crate::models::{AccountRow, PostRow, format_timestamp};
use anyhow::anyhow;
use chrono::Utc;
use microblog_types::{Account, Post, PostBody, PostQuery, Repository, StoreError};
use rusqlite::{Connection, ErrorCode, Row, ffi};
use tracing::debug;

impl Repository for Database {
    // -- Accounts --

    fn find_account_by_id(&self, id: i64) -> Result<Option<Account>, StoreError> {
        self.with_conn(|conn| query_account(conn, "id = ?1", &id))
    }

    fn find_account_by_username(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let username = username.trim();
        self.with_conn(|conn| query_account(conn, "username = ?1", &username))
    }

    fn save(&self, account: &mut Account) -> Result<(), StoreError> {
        self.with_conn(|conn| match account.id {
            None => {
                conn.execute(
                    "INSERT INTO accounts (username, email, password_hash) VALUES (?1, ?2, ?3)",
                    (&account.username, &account.email, account.password_hash()),
                )
                .map_err(map_account_write)?;

                let id = conn.last_insert_rowid();
                account.id = Some(id);
                debug!(id, "Inserted {}", account);
                Ok(())
            }
            Some(id) => {
                let changed = conn
                    .execute(
                        "UPDATE accounts SET username = ?1, email = ?2, password_hash = ?3 WHERE id = ?4",
                        (&account.username, &account.email, account.password_hash(), id),
                    )
                    .map_err(map_account_write)?;

                if changed == 0 {
                    return Err(StoreError::NotFound { entity: "account", id });
                }
                debug!(id, "Updated {}", account);
                Ok(())
            }
        })
    }

    fn delete_account(&self, id: i64) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            // posts go with it via ON DELETE CASCADE
            let removed = conn
                .execute("DELETE FROM accounts WHERE id = ?1", [id])
                .map_err(anyhow::Error::from)?;
            debug!(id, removed, "Deleted account");
            Ok(removed > 0)
        })
    }

    // -- Posts --

    fn create_post(&self, author_id: i64, body: &PostBody) -> Result<Post, StoreError> {
        let timestamp = Utc::now();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (body, timestamp, author_id) VALUES (?1, ?2, ?3)",
                (body.as_str(), format_timestamp(&timestamp), author_id),
            )
            .map_err(|e| {
                let unknown_author = e
                    .sqlite_error()
                    .is_some_and(|err| err.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY);
                if unknown_author {
                    StoreError::NotFound { entity: "account", id: author_id }
                } else {
                    StoreError::Backend(e.into())
                }
            })?;

            let post = Post {
                id: conn.last_insert_rowid(),
                body: body.as_str().to_string(),
                timestamp,
                author_id,
            };
            debug!(post_id = post.id, author_id, "Inserted post");
            Ok(post)
        })
    }

    fn list_posts_for(&self, account_id: i64, query: PostQuery) -> Result<Vec<Post>, StoreError> {
        self.with_conn(|conn| query_posts(conn, account_id, query).map_err(StoreError::from))
    }

    fn count_posts_for(&self, account_id: i64) -> Result<u64, StoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM posts WHERE author_id = ?1",
                    [account_id],
                    |row| row.get(0),
                )
                .map_err(anyhow::Error::from)?;
            Ok(count.max(0) as u64)
        })
    }
}

fn query_account(
    conn: &Connection,
    predicate: &str,
    param: &dyn rusqlite::ToSql,
) -> Result<Option<Account>, StoreError> {
    let sql = format!("SELECT id, username, email, password_hash FROM accounts WHERE {predicate}");
    let mut stmt = conn.prepare(&sql).map_err(anyhow::Error::from)?;

    let row = stmt
        .query_row([param], account_row)
        .optional()?;

    Ok(row.map(Account::from))
}

fn query_posts(conn: &Connection, account_id: i64, query: PostQuery) -> anyhow::Result<Vec<Post>> {
    let mut stmt = conn.prepare(
        "SELECT id, body, timestamp, author_id
         FROM posts
         WHERE author_id = ?1
         ORDER BY timestamp DESC, id DESC
         LIMIT ?2 OFFSET ?3",
    )?;

    let rows = stmt
        .query_map(
            rusqlite::params![account_id, query.limit, query.offset],
            |row| {
                Ok(PostRow {
                    id: row.get(0)?,
                    body: row.get(1)?,
                    timestamp: row.get(2)?,
                    author_id: row.get(3)?,
                })
            },
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    rows.into_iter().map(Post::try_from).collect()
}

fn account_row(row: &Row<'_>) -> rusqlite::Result<AccountRow> {
    Ok(AccountRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
    })
}

/// Unique violations become `Conflict`, naming the offending column.
fn map_account_write(e: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(err, Some(msg)) = &e {
        if err.code == ErrorCode::ConstraintViolation
            && err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
        {
            let field = if msg.contains("accounts.username") {
                "username"
            } else if msg.contains("accounts.email") {
                "email"
            } else {
                "value"
            };
            return StoreError::Conflict { field };
        }
    }
    StoreError::Backend(anyhow!(e))
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, StoreError>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>, StoreError> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Backend(e.into())),
        }
    }
}
