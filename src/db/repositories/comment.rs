//! Comment repository

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{AuthorRef, Comment, CommentWithMeta};

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a new comment
    async fn create(&self, comment: &Comment) -> Result<Comment>;

    /// Comments under a post, oldest first
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentWithMeta>>;

    /// Number of comments under a post
    async fn count_by_post(&self, post_id: i64) -> Result<i64>;
}

/// Comment repository implementation
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

const INSERT_COMMENT: &str =
    "INSERT INTO comments (post_id, author_id, text, created_at) VALUES (?, ?, ?, ?)";

const LIST_BY_POST: &str = r#"
    SELECT c.id, c.post_id, c.text, c.created_at, c.author_id, u.username AS author_username
    FROM comments c
    INNER JOIN users u ON u.id = c.author_id
    WHERE c.post_id = ?
    ORDER BY c.created_at ASC, c.id ASC
"#;

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, comment: &Comment) -> Result<Comment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.sqlite()?, comment).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.mysql()?, comment).await,
        }
    }

    async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentWithMeta>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_by_post_sqlite(self.pool.sqlite()?, post_id).await,
            DatabaseDriver::Mysql => list_by_post_mysql(self.pool.mysql()?, post_id).await,
        }
    }

    async fn count_by_post(&self, post_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS count FROM comments WHERE post_id = ?";
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(post_id)
                .fetch_one(self.pool.sqlite()?)
                .await
                .context("Failed to count comments")?
                .try_get("count")?,
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(post_id)
                .fetch_one(self.pool.mysql()?)
                .await
                .context("Failed to count comments")?
                .try_get("count")?,
        };
        Ok(count)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, comment: &Comment) -> Result<Comment> {
    let result = sqlx::query(INSERT_COMMENT)
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(&comment.text)
        .bind(comment.created_at)
        .execute(pool)
        .await
        .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_rowid(),
        ..comment.clone()
    })
}

async fn list_by_post_sqlite(pool: &SqlitePool, post_id: i64) -> Result<Vec<CommentWithMeta>> {
    let rows = sqlx::query(LIST_BY_POST)
        .bind(post_id)
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    rows.iter()
        .map(|row| {
            Ok(CommentWithMeta {
                id: row.try_get("id")?,
                post_id: row.try_get("post_id")?,
                text: row.try_get("text")?,
                created_at: row.try_get("created_at")?,
                author: AuthorRef {
                    id: row.try_get("author_id")?,
                    username: row.try_get("author_username")?,
                },
            })
        })
        .collect()
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, comment: &Comment) -> Result<Comment> {
    let result = sqlx::query(INSERT_COMMENT)
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(&comment.text)
        .bind(comment.created_at)
        .execute(pool)
        .await
        .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_id() as i64,
        ..comment.clone()
    })
}

async fn list_by_post_mysql(pool: &MySqlPool, post_id: i64) -> Result<Vec<CommentWithMeta>> {
    let rows = sqlx::query(LIST_BY_POST)
        .bind(post_id)
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    rows.iter()
        .map(|row| {
            Ok(CommentWithMeta {
                id: row.try_get("id")?,
                post_id: row.try_get("post_id")?,
                text: row.try_get("text")?,
                created_at: row.try_get("created_at")?,
                author: AuthorRef {
                    id: row.try_get("author_id")?,
                    username: row.try_get("author_username")?,
                },
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{PostRepository, SqlxPostRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Post, User};

    async fn setup() -> (SqlxCommentRepository, i64, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user = SqlxUserRepository::new(pool.clone())
            .create(&User::new("reader".to_string(), None, "hash".to_string()))
            .await
            .unwrap();
        let post = SqlxPostRepository::new(pool.clone())
            .create(&Post::new("Commented".to_string(), user.id, None, None))
            .await
            .unwrap();

        (SqlxCommentRepository::new(pool), post.id, user.id)
    }

    #[tokio::test]
    async fn test_create_and_list_comments() {
        let (repo, post_id, user_id) = setup().await;

        repo.create(&Comment::new(post_id, user_id, "first".to_string()))
            .await
            .unwrap();
        repo.create(&Comment::new(post_id, user_id, "second".to_string()))
            .await
            .unwrap();

        let comments = repo.list_by_post(post_id).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].text, "first");
        assert_eq!(comments[1].text, "second");
        assert_eq!(comments[0].author.username, "reader");
        assert_eq!(repo.count_by_post(post_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_comment_on_missing_post_fails() {
        let (repo, _, user_id) = setup().await;

        let result = repo.create(&Comment::new(999, user_id, "lost".to_string())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_other_posts_comments_not_listed() {
        let (repo, post_id, user_id) = setup().await;
        repo.create(&Comment::new(post_id, user_id, "here".to_string()))
            .await
            .unwrap();

        assert!(repo.list_by_post(post_id + 1).await.unwrap().is_empty());
    }
}
