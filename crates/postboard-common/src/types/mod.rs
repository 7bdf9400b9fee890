//! Common types used across postboard

use serde::{Deserialize, Serialize};

/// A post fetched from the remote API.
///
/// Posts are the parent level of the ingested hierarchy: each post is owned
/// by one user and owns a collection of comments. A post is decoded once,
/// persisted once, and never mutated in between.
///
/// The remote API renders field names in camelCase
/// (`{"userId": 7, "id": 101, "title": "...", "body": "..."}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    /// Identifier of the user owning this post, assigned by the remote source
    pub user_id: i32,

    /// Identifier of the post itself
    pub id: i32,

    /// Opaque title text
    pub title: String,

    /// Opaque body text
    pub body: String,
}

/// A comment fetched from the remote API.
///
/// Comments are the child level: each comment references exactly one post
/// through `post_id`. Same decode-once, persist-once contract as [`Post`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Identifier of the post this comment belongs to
    pub post_id: i32,

    /// Identifier of the comment itself
    pub id: i32,

    /// Commenter display name
    pub name: String,

    /// Commenter email address
    pub email: String,

    /// Opaque body text
    pub body: String,
}

/// Record kind tag carried by writer errors and log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Post,
    Comment,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Post => write!(f, "post"),
            RecordKind::Comment => write!(f, "comment"),
        }
    }
}
