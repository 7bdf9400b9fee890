//! Record writer
//!
//! One shared `PgPool` plus one reusable prepared insert per record kind.
//! Every write is gated by a liveness check because concurrent workers may
//! observe transient disconnects independently.

use crate::config::DatabaseConfig;
use crate::pipeline::RecordSink;
use postboard_common::types::{Comment, Post, RecordKind};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Executor;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Insert statement for the post table; bind order is part of the contract.
pub const INSERT_POST_SQL: &str =
    "INSERT INTO posts (id, user_id, title, body) VALUES ($1, $2, $3, $4)";

/// Insert statement for the comment table; bind order is part of the contract.
pub const INSERT_COMMENT_SQL: &str =
    "INSERT INTO comments (id, post_id, name, email, body) VALUES ($1, $2, $3, $4, $5)";

/// Database operation errors with contextual information
#[derive(Error, Debug)]
pub enum StoreError {
    /// The connection pool could not be established
    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    /// A kind-specific insert statement could not be prepared
    #[error("failed to prepare {kind} insert: {source}")]
    Prepare {
        kind: RecordKind,
        #[source]
        source: sqlx::Error,
    },

    /// The liveness check failed; the write was not attempted
    #[error("database liveness check failed before writing {kind}: {source}")]
    Ping {
        kind: RecordKind,
        #[source]
        source: sqlx::Error,
    },

    /// The backend rejected the write itself
    #[error("failed to persist {kind}: {source}")]
    Write {
        kind: RecordKind,
        #[source]
        source: sqlx::Error,
    },
}

/// Create the shared connection pool from configuration
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .connect(&config.url)
        .await
        .map_err(StoreError::Connect)?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "database connection pool created"
    );

    Ok(pool)
}

/// A reusable, kind-specific insert statement.
///
/// `prepare` validates the statement against the server once; afterwards the
/// statement text is executed through the pool, which caches the prepared
/// form per connection. Safe for concurrent invocation.
#[derive(Debug, Clone)]
pub struct PreparedInsert {
    kind: RecordKind,
    sql: &'static str,
}

impl PreparedInsert {
    pub async fn prepare(
        pool: &PgPool,
        kind: RecordKind,
        sql: &'static str,
    ) -> Result<Self, StoreError> {
        pool.prepare(sql)
            .await
            .map_err(|source| StoreError::Prepare { kind, source })?;

        Ok(Self { kind, sql })
    }
}

/// Writer holding the shared pool and the two prepared inserts.
///
/// Read-only after construction; all concurrent workers share one instance.
pub struct RecordWriter {
    pool: PgPool,
    posts: PreparedInsert,
    comments: PreparedInsert,
}

impl RecordWriter {
    /// Prepare both kind-specific inserts against the given pool
    pub async fn prepare(pool: PgPool) -> Result<Self, StoreError> {
        let posts = PreparedInsert::prepare(&pool, RecordKind::Post, INSERT_POST_SQL).await?;
        let comments =
            PreparedInsert::prepare(&pool, RecordKind::Comment, INSERT_COMMENT_SQL).await?;

        Ok(Self {
            pool,
            posts,
            comments,
        })
    }

    /// Liveness check; must pass immediately before each write
    async fn ping(&self, kind: RecordKind) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|source| StoreError::Ping { kind, source })
    }

    /// Persist one post. Fails fast on a dead connection without attempting
    /// the write.
    pub async fn persist_post(&self, post: &Post) -> Result<(), StoreError> {
        self.ping(self.posts.kind).await?;

        let (id, user_id, title, body) = post_bind_values(post);
        sqlx::query(self.posts.sql)
            .bind(id)
            .bind(user_id)
            .bind(title)
            .bind(body)
            .execute(&self.pool)
            .await
            .map_err(|source| StoreError::Write {
                kind: self.posts.kind,
                source,
            })?;

        Ok(())
    }

    /// Persist one comment. Same liveness gate as [`Self::persist_post`].
    pub async fn persist_comment(&self, comment: &Comment) -> Result<(), StoreError> {
        self.ping(self.comments.kind).await?;

        let (id, post_id, name, email, body) = comment_bind_values(comment);
        sqlx::query(self.comments.sql)
            .bind(id)
            .bind(post_id)
            .bind(name)
            .bind(email)
            .bind(body)
            .execute(&self.pool)
            .await
            .map_err(|source| StoreError::Write {
                kind: self.comments.kind,
                source,
            })?;

        Ok(())
    }
}

impl RecordSink for RecordWriter {
    fn persist_post(&self, post: &Post) -> impl Future<Output = Result<(), StoreError>> + Send {
        RecordWriter::persist_post(self, post)
    }

    fn persist_comment(
        &self,
        comment: &Comment,
    ) -> impl Future<Output = Result<(), StoreError>> + Send {
        RecordWriter::persist_comment(self, comment)
    }
}

/// Positional arguments for [`INSERT_POST_SQL`], in bind order.
fn post_bind_values(post: &Post) -> (i32, i32, &str, &str) {
    (post.id, post.user_id, &post.title, &post.body)
}

/// Positional arguments for [`INSERT_COMMENT_SQL`], in bind order.
fn comment_bind_values(comment: &Comment) -> (i32, i32, &str, &str, &str) {
    (
        comment.id,
        comment.post_id,
        &comment.name,
        &comment.email,
        &comment.body,
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn sample_post() -> Post {
        Post {
            user_id: 7,
            id: 101,
            title: "T".to_string(),
            body: "B".to_string(),
        }
    }

    fn sample_comment() -> Comment {
        Comment {
            post_id: 101,
            id: 501,
            name: "N".to_string(),
            email: "e@example.com".to_string(),
            body: "B".to_string(),
        }
    }

    #[test]
    fn test_post_bind_order() {
        let post = sample_post();
        let (id, user_id, title, body) = post_bind_values(&post);
        assert_eq!((id, user_id, title, body), (101, 7, "T", "B"));
    }

    #[test]
    fn test_comment_bind_order() {
        let comment = sample_comment();
        let (id, post_id, name, email, body) = comment_bind_values(&comment);
        assert_eq!(
            (id, post_id, name, email, body),
            (501, 101, "N", "e@example.com", "B")
        );
    }

    #[test]
    fn test_insert_sql_column_order_matches_bind_order() {
        assert!(INSERT_POST_SQL.contains("(id, user_id, title, body)"));
        assert!(INSERT_COMMENT_SQL.contains("(id, post_id, name, email, body)"));
    }

    fn unreachable_writer() -> RecordWriter {
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_secs(2))
            .connect_lazy("postgresql://postboard@127.0.0.1:9/postboard")
            .unwrap();

        RecordWriter {
            pool,
            posts: PreparedInsert {
                kind: RecordKind::Post,
                sql: INSERT_POST_SQL,
            },
            comments: PreparedInsert {
                kind: RecordKind::Comment,
                sql: INSERT_COMMENT_SQL,
            },
        }
    }

    #[tokio::test]
    async fn test_dead_connection_fails_ping_not_write() {
        let writer = unreachable_writer();

        let err = writer.persist_post(&sample_post()).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Ping {
                kind: RecordKind::Post,
                ..
            }
        ));

        let err = writer.persist_comment(&sample_comment()).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Ping {
                kind: RecordKind::Comment,
                ..
            }
        ));
    }
}
