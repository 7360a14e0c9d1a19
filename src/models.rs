use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::repo::{RepoError, RepoResult};

/// Identity and lifecycle timestamps carried by every forum entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Meta {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>, // soft delete marker
}

impl Meta {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self { id: id.into(), created_at: now, updated_at: now, deleted_at: None }
    }

    /// Envelope with a fresh random identity.
    pub fn generated() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Topic {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub meta: Meta,
    #[serde(default)]
    #[sqlx(skip)]
    pub posts: Vec<Post>, // filled by expansion only
}

impl Topic {
    /// Topic identities are chosen by the caller.
    pub fn new(id: impl Into<String>) -> Self {
        Self { meta: Meta::new(id), posts: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Post {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub meta: Meta,
    pub topic_id: String,
    pub title: String,
    pub content: String,
    pub votes: i64,
    #[serde(default)]
    #[sqlx(skip)]
    pub comments: Vec<Comment>, // filled by expansion only
}

impl Post {
    pub fn new(topic_id: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            meta: Meta::generated(),
            topic_id: topic_id.into(),
            title: title.into(),
            content: content.into(),
            votes: 0,
            comments: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.meta.id = id.into();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Comment {
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub meta: Meta,
    pub topic_id: String,
    pub post_id: String,
    pub content: String,
    pub votes: i64,
}

impl Comment {
    pub fn new(topic_id: impl Into<String>, post_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            meta: Meta::generated(),
            topic_id: topic_id.into(),
            post_id: post_id.into(),
            content: content.into(),
            votes: 0,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.meta.id = id.into();
        self
    }
}

// ---------------- Keys ---------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TopicKey {
    pub id: String,
}

impl TopicKey {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PostKey {
    pub topic_id: String,
    pub id: String,
}

impl PostKey {
    pub fn new(topic_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self { topic_id: topic_id.into(), id: id.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommentKey {
    pub topic_id: String,
    pub post_id: String,
    pub id: String,
}

impl CommentKey {
    pub fn new(topic_id: impl Into<String>, post_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self { topic_id: topic_id.into(), post_id: post_id.into(), id: id.into() }
    }
}

// ---------------- Patches ------------------------------------------
// `None` leaves a column untouched; `Some("")` writes an empty string.

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct TopicPatch {}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct PostPatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CommentPatch {
    pub content: Option<String>,
}

// ---------------- Create payloads ----------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewTopic {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewPost {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NewComment {
    pub content: String,
}

/// Hierarchical identifiers as they arrive from a request path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ids {
    pub topic_id: Option<String>,
    pub post_id: Option<String>,
    pub comment_id: Option<String>,
}

impl Ids {
    pub fn topic_key(&self) -> RepoResult<TopicKey> {
        Ok(TopicKey::new(required(&self.topic_id, "topic_id")?))
    }

    pub fn post_key(&self) -> RepoResult<PostKey> {
        Ok(PostKey::new(
            required(&self.topic_id, "topic_id")?,
            required(&self.post_id, "post_id")?,
        ))
    }

    pub fn comment_key(&self) -> RepoResult<CommentKey> {
        Ok(CommentKey::new(
            required(&self.topic_id, "topic_id")?,
            required(&self.post_id, "post_id")?,
            required(&self.comment_id, "comment_id")?,
        ))
    }
}

fn required(value: &Option<String>, name: &str) -> RepoResult<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(RepoError::Validation(format!("missing `{name}`"))),
    }
}
