//! Comment service

use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{Comment, CommentWithMeta, CreateCommentInput, User};
use anyhow::Context;
use std::sync::Arc;

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    /// The commented post does not exist
    #[error("Post not found: {0}")]
    PostNotFound(i64),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Comment service
pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    post_repo: Arc<dyn PostRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn CommentRepository>, post_repo: Arc<dyn PostRepository>) -> Self {
        Self { repo, post_repo }
    }

    /// Add a comment to a post as `author`
    pub async fn add(
        &self,
        post_id: i64,
        author: &User,
        input: CreateCommentInput,
    ) -> Result<Comment, CommentServiceError> {
        if self
            .post_repo
            .get_by_id(post_id)
            .await
            .context("Failed to get post")?
            .is_none()
        {
            return Err(CommentServiceError::PostNotFound(post_id));
        }

        if input.text.trim().is_empty() {
            return Err(CommentServiceError::ValidationError(
                "Comment text cannot be empty".to_string(),
            ));
        }

        let comment = self
            .repo
            .create(&Comment::new(post_id, author.id, input.text))
            .await
            .context("Failed to create comment")?;

        tracing::info!("User {} commented on post {}", author.username, post_id);
        Ok(comment)
    }

    /// Comments under a post, oldest first
    pub async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentWithMeta>, CommentServiceError> {
        Ok(self
            .repo
            .list_by_post(post_id)
            .await
            .context("Failed to list comments")?)
    }

    pub async fn count_by_post(&self, post_id: i64) -> Result<i64, CommentServiceError> {
        Ok(self
            .repo
            .count_by_post(post_id)
            .await
            .context("Failed to count comments")?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxCommentRepository, SqlxPostRepository, SqlxUserRepository, UserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::models::Post;

    async fn setup() -> (CommentService, User, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user = SqlxUserRepository::new(pool.clone())
            .create(&User::new("commenter".to_string(), None, "hash".to_string()))
            .await
            .unwrap();
        let posts = SqlxPostRepository::boxed(pool.clone());
        let post = posts
            .create(&Post::new("A post".to_string(), user.id, None, None))
            .await
            .unwrap();

        let service = CommentService::new(SqlxCommentRepository::boxed(pool), posts);
        (service, user, post.id)
    }

    fn text(s: &str) -> CreateCommentInput {
        CreateCommentInput { text: s.to_string() }
    }

    #[tokio::test]
    async fn test_add_comment() {
        let (service, user, post_id) = setup().await;

        let comment = service.add(post_id, &user, text("Nice!")).await.unwrap();
        assert_eq!(comment.author_id, user.id);

        let comments = service.list_by_post(post_id).await.unwrap();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].text, "Nice!");
        assert_eq!(comments[0].author.username, "commenter");
    }

    #[tokio::test]
    async fn test_empty_comment_not_saved() {
        let (service, user, post_id) = setup().await;

        let result = service.add(post_id, &user, text("  \n ")).await;
        assert!(matches!(result, Err(CommentServiceError::ValidationError(_))));
        assert_eq!(service.count_by_post(post_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_comment_on_missing_post() {
        let (service, user, _) = setup().await;

        let result = service.add(404, &user, text("Hello?")).await;
        assert!(matches!(result, Err(CommentServiceError::PostNotFound(404))));
    }
}
