//! Post repository
//!
//! Listings are read through a join with `users` and `post_groups` so that
//! one query yields everything a post card shows. Order is newest first with
//! ties broken by descending id.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{AuthorRef, GroupRef, ListParams, Post, PostFilter, PostWithMeta};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Insert a new post
    async fn create(&self, post: &Post) -> Result<Post>;

    /// Get the raw post row
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Get a post joined with its author and group
    async fn get_with_meta(&self, id: i64) -> Result<Option<PostWithMeta>>;

    /// Overwrite text, group and image of an existing post.
    ///
    /// Returns `None` when the post no longer exists.
    async fn update(&self, post: &Post) -> Result<Option<Post>>;

    /// One page of posts matching `filter`
    async fn list(&self, filter: PostFilter, params: &ListParams) -> Result<Vec<PostWithMeta>>;

    /// Number of posts matching `filter`
    async fn count(&self, filter: PostFilter) -> Result<i64>;
}

/// SQLx-based post repository implementation
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

const POST_COLUMNS: &str = "id, text, author_id, group_id, image, created_at";

const META_SELECT: &str = r#"
    SELECT p.id, p.text, p.image, p.created_at,
           p.author_id, u.username AS author_username,
           p.group_id, g.title AS group_title, g.slug AS group_slug
    FROM posts p
    INNER JOIN users u ON u.id = p.author_id
    LEFT JOIN post_groups g ON g.id = p.group_id
"#;

/// WHERE clause and its bound value for a listing filter
fn filter_clause(filter: PostFilter) -> (&'static str, Option<i64>) {
    match filter {
        PostFilter::All => ("", None),
        PostFilter::Group(id) => ("WHERE p.group_id = ?", Some(id)),
        PostFilter::Author(id) => ("WHERE p.author_id = ?", Some(id)),
    }
}

fn list_sql(filter: PostFilter) -> (String, Option<i64>) {
    let (clause, value) = filter_clause(filter);
    (
        format!(
            "{META_SELECT} {clause} ORDER BY p.created_at DESC, p.id DESC LIMIT ? OFFSET ?"
        ),
        value,
    )
}

fn count_sql(filter: PostFilter) -> (String, Option<i64>) {
    let (clause, value) = filter_clause(filter);
    (format!("SELECT COUNT(*) AS count FROM posts p {clause}"), value)
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, post: &Post) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_post_sqlite(self.pool.sqlite()?, post).await,
            DatabaseDriver::Mysql => create_post_mysql(self.pool.mysql()?, post).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?");
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.sqlite()?)
                .await
                .context("Failed to get post by ID")?
                .as_ref()
                .map(row_to_post_sqlite)
                .transpose(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.mysql()?)
                .await
                .context("Failed to get post by ID")?
                .as_ref()
                .map(row_to_post_mysql)
                .transpose(),
        }
    }

    async fn get_with_meta(&self, id: i64) -> Result<Option<PostWithMeta>> {
        let sql = format!("{META_SELECT} WHERE p.id = ?");
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.sqlite()?)
                .await
                .context("Failed to get post detail")?
                .as_ref()
                .map(row_to_meta_sqlite)
                .transpose(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.mysql()?)
                .await
                .context("Failed to get post detail")?
                .as_ref()
                .map(row_to_meta_mysql)
                .transpose(),
        }
    }

    async fn update(&self, post: &Post) -> Result<Option<Post>> {
        let sql = "UPDATE posts SET text = ?, group_id = ?, image = ? WHERE id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(&post.text)
                .bind(post.group_id)
                .bind(&post.image)
                .bind(post.id)
                .execute(self.pool.sqlite()?)
                .await
                .context("Failed to update post")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(&post.text)
                .bind(post.group_id)
                .bind(&post.image)
                .bind(post.id)
                .execute(self.pool.mysql()?)
                .await
                .context("Failed to update post")?
                .rows_affected(),
        };

        // MySQL reports 0 for an unchanged row, so confirm the post is gone
        if affected == 0 && self.get_by_id(post.id).await?.is_none() {
            return Ok(None);
        }
        Ok(Some(post.clone()))
    }

    async fn list(&self, filter: PostFilter, params: &ListParams) -> Result<Vec<PostWithMeta>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_posts_sqlite(self.pool.sqlite()?, filter, params).await,
            DatabaseDriver::Mysql => list_posts_mysql(self.pool.mysql()?, filter, params).await,
        }
    }

    async fn count(&self, filter: PostFilter) -> Result<i64> {
        let (sql, value) = count_sql(filter);
        let count: i64 = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                let mut query = sqlx::query(&sql);
                if let Some(value) = value {
                    query = query.bind(value);
                }
                query
                    .fetch_one(self.pool.sqlite()?)
                    .await
                    .context("Failed to count posts")?
                    .try_get("count")?
            }
            DatabaseDriver::Mysql => {
                let mut query = sqlx::query(&sql);
                if let Some(value) = value {
                    query = query.bind(value);
                }
                query
                    .fetch_one(self.pool.mysql()?)
                    .await
                    .context("Failed to count posts")?
                    .try_get("count")?
            }
        };
        Ok(count)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, post: &Post) -> Result<Post> {
    let result = sqlx::query(
        r#"
        INSERT INTO posts (text, author_id, group_id, image, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.text)
    .bind(post.author_id)
    .bind(post.group_id)
    .bind(&post.image)
    .bind(post.created_at)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_rowid(),
        ..post.clone()
    })
}

async fn list_posts_sqlite(
    pool: &SqlitePool,
    filter: PostFilter,
    params: &ListParams,
) -> Result<Vec<PostWithMeta>> {
    let (sql, value) = list_sql(filter);
    let mut query = sqlx::query(&sql);
    if let Some(value) = value {
        query = query.bind(value);
    }
    let rows = query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    rows.iter().map(row_to_meta_sqlite).collect()
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    Ok(Post {
        id: row.try_get("id")?,
        text: row.try_get("text")?,
        author_id: row.try_get("author_id")?,
        group_id: row.try_get("group_id")?,
        image: row.try_get("image")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_meta_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<PostWithMeta> {
    let group_id: Option<i64> = row.try_get("group_id")?;
    let group = match group_id {
        Some(id) => Some(GroupRef {
            id,
            title: row.try_get("group_title")?,
            slug: row.try_get("group_slug")?,
        }),
        None => None,
    };

    Ok(PostWithMeta {
        id: row.try_get("id")?,
        text: row.try_get("text")?,
        image: row.try_get("image")?,
        created_at: row.try_get("created_at")?,
        author: AuthorRef {
            id: row.try_get("author_id")?,
            username: row.try_get("author_username")?,
        },
        group,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, post: &Post) -> Result<Post> {
    let result = sqlx::query(
        r#"
        INSERT INTO posts (text, author_id, group_id, image, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&post.text)
    .bind(post.author_id)
    .bind(post.group_id)
    .bind(&post.image)
    .bind(post.created_at)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(Post {
        id: result.last_insert_id() as i64,
        ..post.clone()
    })
}

async fn list_posts_mysql(
    pool: &MySqlPool,
    filter: PostFilter,
    params: &ListParams,
) -> Result<Vec<PostWithMeta>> {
    let (sql, value) = list_sql(filter);
    let mut query = sqlx::query(&sql);
    if let Some(value) = value {
        query = query.bind(value);
    }
    let rows = query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    rows.iter().map(row_to_meta_mysql).collect()
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Post> {
    Ok(Post {
        id: row.try_get("id")?,
        text: row.try_get("text")?,
        author_id: row.try_get("author_id")?,
        group_id: row.try_get("group_id")?,
        image: row.try_get("image")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_meta_mysql(row: &sqlx::mysql::MySqlRow) -> Result<PostWithMeta> {
    let group_id: Option<i64> = row.try_get("group_id")?;
    let group = match group_id {
        Some(id) => Some(GroupRef {
            id,
            title: row.try_get("group_title")?,
            slug: row.try_get("group_slug")?,
        }),
        None => None,
    };

    Ok(PostWithMeta {
        id: row.try_get("id")?,
        text: row.try_get("text")?,
        image: row.try_get("image")?,
        created_at: row.try_get("created_at")?,
        author: AuthorRef {
            id: row.try_get("author_id")?,
            username: row.try_get("author_username")?,
        },
        group,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{GroupRepository, SqlxGroupRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::{Group, User};
    use chrono::{Duration, Utc};

    struct Fixture {
        repo: SqlxPostRepository,
        author: User,
        other: User,
        group: Group,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let author = users
            .create(&User::new("author".to_string(), None, "hash".to_string()))
            .await
            .unwrap();
        let other = users
            .create(&User::new("other".to_string(), None, "hash".to_string()))
            .await
            .unwrap();
        let group = SqlxGroupRepository::new(pool.clone())
            .create(&Group::new("Cats".to_string(), "cats".to_string(), String::new()))
            .await
            .unwrap();

        Fixture {
            repo: SqlxPostRepository::new(pool),
            author,
            other,
            group,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_post() {
        let fx = setup().await;

        let post = Post::new("Hello".to_string(), fx.author.id, Some(fx.group.id), None);
        let created = fx.repo.create(&post).await.unwrap();
        assert!(created.id > 0);

        let found = fx.repo.get_by_id(created.id).await.unwrap().expect("Post not found");
        assert_eq!(found.text, "Hello");
        assert_eq!(found.group_id, Some(fx.group.id));

        let meta = fx.repo.get_with_meta(created.id).await.unwrap().expect("Post not found");
        assert_eq!(meta.author.username, "author");
        assert_eq!(meta.group.as_ref().map(|g| g.slug.as_str()), Some("cats"));
    }

    #[tokio::test]
    async fn test_post_without_group_has_no_group_meta() {
        let fx = setup().await;

        let created = fx
            .repo
            .create(&Post::new("Loose".to_string(), fx.author.id, None, None))
            .await
            .unwrap();

        let meta = fx.repo.get_with_meta(created.id).await.unwrap().unwrap();
        assert!(meta.group.is_none());
    }

    #[tokio::test]
    async fn test_update_keeps_author_and_date() {
        let fx = setup().await;
        let created = fx
            .repo
            .create(&Post::new("Before".to_string(), fx.author.id, None, None))
            .await
            .unwrap();

        let mut changed = created.clone();
        changed.text = "After".to_string();
        changed.group_id = Some(fx.group.id);
        changed.image = Some("posts/pic.png".to_string());
        let updated = fx.repo.update(&changed).await.unwrap();
        assert_eq!(updated.map(|p| p.text), Some("After".to_string()));

        let found = fx.repo.get_by_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.text, "After");
        assert_eq!(found.group_id, Some(fx.group.id));
        assert_eq!(found.image.as_deref(), Some("posts/pic.png"));
        assert_eq!(found.author_id, fx.author.id);
        assert_eq!(found.created_at, created.created_at);
        assert_eq!(fx.repo.count(PostFilter::All).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update_missing_post_reports_none() {
        let fx = setup().await;

        let mut ghost = Post::new("Gone".to_string(), fx.author.id, None, None);
        ghost.id = 4242;

        assert!(fx.repo.update(&ghost).await.unwrap().is_none());
        assert_eq!(fx.repo.count(PostFilter::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_is_newest_first() {
        let fx = setup().await;
        let base = Utc::now();

        for (i, text) in ["oldest", "middle", "newest"].iter().enumerate() {
            let mut post = Post::new(text.to_string(), fx.author.id, None, None);
            post.created_at = base + Duration::minutes(i as i64);
            fx.repo.create(&post).await.unwrap();
        }

        let posts = fx.repo.list(PostFilter::All, &ListParams::new(1, 10)).await.unwrap();
        let texts: Vec<&str> = posts.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["newest", "middle", "oldest"]);
    }

    #[tokio::test]
    async fn test_same_timestamp_orders_by_id() {
        let fx = setup().await;
        let now = Utc::now();

        for text in ["first", "second"] {
            let mut post = Post::new(text.to_string(), fx.author.id, None, None);
            post.created_at = now;
            fx.repo.create(&post).await.unwrap();
        }

        let posts = fx.repo.list(PostFilter::All, &ListParams::new(1, 10)).await.unwrap();
        assert_eq!(posts[0].text, "second");
        assert_eq!(posts[1].text, "first");
    }

    #[tokio::test]
    async fn test_filters_and_counts() {
        let fx = setup().await;

        fx.repo
            .create(&Post::new("grouped".to_string(), fx.author.id, Some(fx.group.id), None))
            .await
            .unwrap();
        fx.repo
            .create(&Post::new("mine".to_string(), fx.author.id, None, None))
            .await
            .unwrap();
        fx.repo
            .create(&Post::new("theirs".to_string(), fx.other.id, None, None))
            .await
            .unwrap();

        let params = ListParams::new(1, 10);

        let grouped = fx.repo.list(PostFilter::Group(fx.group.id), &params).await.unwrap();
        assert_eq!(grouped.len(), 1);
        assert!(grouped.iter().all(|p| p.group.as_ref().map(|g| g.id) == Some(fx.group.id)));

        let by_other = fx.repo.list(PostFilter::Author(fx.other.id), &params).await.unwrap();
        assert_eq!(by_other.len(), 1);
        assert!(by_other.iter().all(|p| p.author.id == fx.other.id));

        assert_eq!(fx.repo.count(PostFilter::All).await.unwrap(), 3);
        assert_eq!(fx.repo.count(PostFilter::Author(fx.author.id)).await.unwrap(), 2);
        assert_eq!(fx.repo.count(PostFilter::Group(fx.group.id)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_pages() {
        let fx = setup().await;
        for i in 0..13 {
            fx.repo
                .create(&Post::new(format!("post {}", i), fx.author.id, None, None))
                .await
                .unwrap();
        }

        let first = fx.repo.list(PostFilter::All, &ListParams::new(1, 10)).await.unwrap();
        let second = fx.repo.list(PostFilter::All, &ListParams::new(2, 10)).await.unwrap();

        assert_eq!(first.len(), 10);
        assert_eq!(second.len(), 3);
    }
}
