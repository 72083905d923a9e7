use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::mock::now_rfc3339;
use super::types::Comment;
use crate::error::StoreError;

pub const MAX_NAME_CHARS: usize = 80;
pub const MAX_COMMENT_CHARS: usize = 2_000;

#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Newest first.
    async fn list(&self) -> Result<Vec<Comment>, StoreError>;

    async fn prepend(&self, comment: Comment) -> Result<(), StoreError>;
}

#[derive(Default)]
pub struct InMemoryCommentStore {
    comments: RwLock<Vec<Comment>>,
}

impl InMemoryCommentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommentStore for InMemoryCommentStore {
    async fn list(&self) -> Result<Vec<Comment>, StoreError> {
        Ok(self.comments.read().await.clone())
    }

    async fn prepend(&self, comment: Comment) -> Result<(), StoreError> {
        self.comments.write().await.insert(0, comment);
        Ok(())
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommentRejection {
    #[error("Nombre y comentario son requeridos")]
    MissingField,

    #[error("El nombre no puede superar {} caracteres", MAX_NAME_CHARS)]
    NameTooLong,

    #[error("El comentario no puede superar {} caracteres", MAX_COMMENT_CHARS)]
    CommentTooLong,
}

/// Validates and stamps a new comment. Nothing is stored here.
pub fn new_comment(name: &str, text: &str) -> Result<Comment, CommentRejection> {
    let name = name.trim();
    let text = text.trim();
    if name.is_empty() || text.is_empty() {
        return Err(CommentRejection::MissingField);
    }
    if name.chars().count() > MAX_NAME_CHARS {
        return Err(CommentRejection::NameTooLong);
    }
    if text.chars().count() > MAX_COMMENT_CHARS {
        return Err(CommentRejection::CommentTooLong);
    }

    Ok(Comment {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        comment: text.to_string(),
        timestamp: now_rfc3339(),
        likes: 0,
    })
}
