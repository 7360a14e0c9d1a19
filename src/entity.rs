//! Per-kind storage contract used by the generic repository operations.
//!
//! Each forum entity describes its table, how its composite key maps to
//! columns, which parent must be live before insert and which descendant
//! tables follow it on soft delete. `SqliteRepo` does the rest.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::FromRow;

use crate::models::*;
use crate::repo::{RepoError, RepoResult, SqliteRepo};

/// A bindable column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Timestamp(DateTime<Utc>),
    NullableTimestamp(Option<DateTime<Utc>>),
}

/// Column equalities joined with AND, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyFilter(Vec<(&'static str, String)>);

impl KeyFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &'static str, value: impl Into<String>) -> Self {
        self.0.push((column, value.into()));
        self
    }

    pub fn columns(&self) -> &[(&'static str, String)] {
        &self.0
    }

    /// Rejects filters with a blank component, which would otherwise
    /// address no row at all.
    pub fn ensure_complete(&self) -> RepoResult<()> {
        match self.0.iter().find(|(_, v)| v.trim().is_empty()) {
            Some((column, _)) => Err(RepoError::Validation(format!("`{column}` must not be empty"))),
            None => Ok(()),
        }
    }
}

/// Child collections that `get` can load alongside a parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Posts,
    Comments,
}

impl Relation {
    /// Parses a comma separated list such as `"posts"` or `"Comments, posts"`.
    pub fn parse_list(raw: &str) -> RepoResult<Vec<Relation>> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<Relation>)
            .collect()
    }
}

impl FromStr for Relation {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("posts") {
            Ok(Relation::Posts)
        } else if s.eq_ignore_ascii_case("comments") {
            Ok(Relation::Comments)
        } else {
            Err(RepoError::Validation(format!("unknown relation `{s}`")))
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Posts => f.write_str("posts"),
            Relation::Comments => f.write_str("comments"),
        }
    }
}

#[async_trait]
pub trait Entity: for<'r> FromRow<'r, SqliteRow> + Send + Sync + Unpin + Sized + 'static {
    /// Full composite key addressing exactly one row.
    type Key: Send + Sync;
    /// Ancestor key bounding a `list` call.
    type Scope: Send + Sync;
    type Patch: Send + Sync;

    const TABLE: &'static str;
    const COLUMNS: &'static str;

    fn key(&self) -> Self::Key;
    fn key_filter(key: &Self::Key) -> KeyFilter;
    fn scope_filter(scope: &Self::Scope) -> KeyFilter;

    /// Column/value pairs written on insert.
    fn row(&self) -> Vec<(&'static str, Value)>;

    /// Returns system-owned state to its initial value: live, no votes,
    /// no loaded children.
    fn reset_lifecycle(&mut self);

    /// Columns a patch overwrites; absent fields are left out.
    fn assignments(patch: &Self::Patch) -> Vec<(&'static str, Value)>;

    /// Table and filter of the row that must be live for an insert to land.
    fn parent(&self) -> Option<(&'static str, KeyFilter)> {
        None
    }

    /// Descendant rows soft-deleted together with `key`.
    fn children(_key: &Self::Key) -> Vec<(&'static str, KeyFilter)> {
        Vec::new()
    }

    async fn expand(&mut self, _repo: &SqliteRepo, relation: Relation) -> RepoResult<()> {
        Err(RepoError::Validation(format!("{} cannot expand `{relation}`", Self::TABLE)))
    }
}

/// Entities carrying a `votes` counter.
pub trait Votable: Entity {}

fn meta_row(meta: &Meta) -> Vec<(&'static str, Value)> {
    vec![
        ("id", Value::Text(meta.id.clone())),
        ("created_at", Value::Timestamp(meta.created_at)),
        ("updated_at", Value::Timestamp(meta.updated_at)),
        ("deleted_at", Value::NullableTimestamp(meta.deleted_at)),
    ]
}

fn assign_text(out: &mut Vec<(&'static str, Value)>, column: &'static str, value: &Option<String>) {
    if let Some(v) = value {
        out.push((column, Value::Text(v.clone())));
    }
}

#[async_trait]
impl Entity for Topic {
    type Key = TopicKey;
    type Scope = ();
    type Patch = TopicPatch;

    const TABLE: &'static str = "topics";
    const COLUMNS: &'static str = "id, created_at, updated_at, deleted_at";

    fn key(&self) -> TopicKey {
        TopicKey::new(&self.meta.id)
    }

    fn key_filter(key: &TopicKey) -> KeyFilter {
        KeyFilter::new().with("id", &key.id)
    }

    fn scope_filter(_: &()) -> KeyFilter {
        KeyFilter::new()
    }

    fn row(&self) -> Vec<(&'static str, Value)> {
        meta_row(&self.meta)
    }

    fn reset_lifecycle(&mut self) {
        self.meta.deleted_at = None;
        self.posts.clear();
    }

    fn assignments(_: &TopicPatch) -> Vec<(&'static str, Value)> {
        Vec::new()
    }

    fn children(key: &TopicKey) -> Vec<(&'static str, KeyFilter)> {
        vec![
            (Comment::TABLE, KeyFilter::new().with("topic_id", &key.id)),
            (Post::TABLE, KeyFilter::new().with("topic_id", &key.id)),
        ]
    }

    async fn expand(&mut self, repo: &SqliteRepo, relation: Relation) -> RepoResult<()> {
        match relation {
            Relation::Posts => {
                self.posts = repo.list::<Post>(&self.key()).await?;
                Ok(())
            }
            other => Err(RepoError::Validation(format!("{} cannot expand `{other}`", Self::TABLE))),
        }
    }
}

#[async_trait]
impl Entity for Post {
    type Key = PostKey;
    type Scope = TopicKey;
    type Patch = PostPatch;

    const TABLE: &'static str = "posts";
    const COLUMNS: &'static str = "topic_id, id, title, content, votes, created_at, updated_at, deleted_at";

    fn key(&self) -> PostKey {
        PostKey::new(&self.topic_id, &self.meta.id)
    }

    fn key_filter(key: &PostKey) -> KeyFilter {
        KeyFilter::new().with("topic_id", &key.topic_id).with("id", &key.id)
    }

    fn scope_filter(scope: &TopicKey) -> KeyFilter {
        KeyFilter::new().with("topic_id", &scope.id)
    }

    fn row(&self) -> Vec<(&'static str, Value)> {
        let mut row = meta_row(&self.meta);
        row.extend([
            ("topic_id", Value::Text(self.topic_id.clone())),
            ("title", Value::Text(self.title.clone())),
            ("content", Value::Text(self.content.clone())),
            ("votes", Value::Integer(self.votes)),
        ]);
        row
    }

    fn reset_lifecycle(&mut self) {
        self.meta.deleted_at = None;
        self.votes = 0;
        self.comments.clear();
    }

    fn assignments(patch: &PostPatch) -> Vec<(&'static str, Value)> {
        let mut out = Vec::new();
        assign_text(&mut out, "title", &patch.title);
        assign_text(&mut out, "content", &patch.content);
        out
    }

    fn parent(&self) -> Option<(&'static str, KeyFilter)> {
        Some((Topic::TABLE, Topic::key_filter(&TopicKey::new(&self.topic_id))))
    }

    fn children(key: &PostKey) -> Vec<(&'static str, KeyFilter)> {
        vec![(
            Comment::TABLE,
            KeyFilter::new().with("topic_id", &key.topic_id).with("post_id", &key.id),
        )]
    }

    async fn expand(&mut self, repo: &SqliteRepo, relation: Relation) -> RepoResult<()> {
        match relation {
            Relation::Comments => {
                self.comments = repo.list::<Comment>(&self.key()).await?;
                Ok(())
            }
            other => Err(RepoError::Validation(format!("{} cannot expand `{other}`", Self::TABLE))),
        }
    }
}

#[async_trait]
impl Entity for Comment {
    type Key = CommentKey;
    type Scope = PostKey;
    type Patch = CommentPatch;

    const TABLE: &'static str = "comments";
    const COLUMNS: &'static str = "topic_id, post_id, id, content, votes, created_at, updated_at, deleted_at";

    fn key(&self) -> CommentKey {
        CommentKey::new(&self.topic_id, &self.post_id, &self.meta.id)
    }

    fn key_filter(key: &CommentKey) -> KeyFilter {
        KeyFilter::new()
            .with("topic_id", &key.topic_id)
            .with("post_id", &key.post_id)
            .with("id", &key.id)
    }

    fn scope_filter(scope: &PostKey) -> KeyFilter {
        KeyFilter::new().with("topic_id", &scope.topic_id).with("post_id", &scope.id)
    }

    fn row(&self) -> Vec<(&'static str, Value)> {
        let mut row = meta_row(&self.meta);
        row.extend([
            ("topic_id", Value::Text(self.topic_id.clone())),
            ("post_id", Value::Text(self.post_id.clone())),
            ("content", Value::Text(self.content.clone())),
            ("votes", Value::Integer(self.votes)),
        ]);
        row
    }

    fn reset_lifecycle(&mut self) {
        self.meta.deleted_at = None;
        self.votes = 0;
    }

    fn assignments(patch: &CommentPatch) -> Vec<(&'static str, Value)> {
        let mut out = Vec::new();
        assign_text(&mut out, "content", &patch.content);
        out
    }

    fn parent(&self) -> Option<(&'static str, KeyFilter)> {
        Some((Post::TABLE, Post::key_filter(&PostKey::new(&self.topic_id, &self.post_id))))
    }
}

impl Votable for Post {}
impl Votable for Comment {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_list_parsing() {
        assert_eq!(Relation::parse_list("posts").unwrap(), vec![Relation::Posts]);
        assert_eq!(
            Relation::parse_list(" Comments , POSTS ").unwrap(),
            vec![Relation::Comments, Relation::Posts]
        );
        assert!(Relation::parse_list("").unwrap().is_empty());
        assert!(matches!(Relation::parse_list("posts,authors"), Err(RepoError::Validation(_))));
    }

    #[test]
    fn comment_filter_covers_whole_hierarchy() {
        let filter = Comment::key_filter(&CommentKey::new("t", "p", "c"));
        let cols: Vec<_> = filter.columns().iter().map(|(c, _)| *c).collect();
        assert_eq!(cols, ["topic_id", "post_id", "id"]);
        assert!(filter.ensure_complete().is_ok());
        assert!(Post::key_filter(&PostKey::new("t", "")).ensure_complete().is_err());
    }

    #[test]
    fn patch_assignments_skip_absent_fields() {
        let patch = PostPatch { title: None, content: Some(String::new()) };
        assert_eq!(Post::assignments(&patch), vec![("content", Value::Text(String::new()))]);
        assert!(Post::assignments(&PostPatch::default()).is_empty());
    }
}
