//! Group repository
//!
//! Database operations for post groups (table `post_groups`).

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Group;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Group repository trait
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Create a new group
    async fn create(&self, group: &Group) -> Result<Group>;

    /// Get group by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Group>>;

    /// Get group by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Group>>;

    /// List all groups ordered by title
    async fn list(&self) -> Result<Vec<Group>>;

    /// Check if a slug is already used
    async fn exists_by_slug(&self, slug: &str) -> Result<bool>;
}

/// SQLx-based group repository implementation
pub struct SqlxGroupRepository {
    pool: DynDatabasePool,
}

impl SqlxGroupRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn GroupRepository> {
        Arc::new(Self::new(pool))
    }
}

const GROUP_COLUMNS: &str = "id, title, slug, description, created_at";

#[async_trait]
impl GroupRepository for SqlxGroupRepository {
    async fn create(&self, group: &Group) -> Result<Group> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_group_sqlite(self.pool.sqlite()?, group).await,
            DatabaseDriver::Mysql => create_group_mysql(self.pool.mysql()?, group).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Group>> {
        let sql = format!("SELECT {GROUP_COLUMNS} FROM post_groups WHERE id = ?");
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.sqlite()?)
                .await
                .context("Failed to get group by ID")?
                .as_ref()
                .map(row_to_group_sqlite)
                .transpose(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(id)
                .fetch_optional(self.pool.mysql()?)
                .await
                .context("Failed to get group by ID")?
                .as_ref()
                .map(row_to_group_mysql)
                .transpose(),
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Group>> {
        let sql = format!("SELECT {GROUP_COLUMNS} FROM post_groups WHERE slug = ?");
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .bind(slug)
                .fetch_optional(self.pool.sqlite()?)
                .await
                .context("Failed to get group by slug")?
                .as_ref()
                .map(row_to_group_sqlite)
                .transpose(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .bind(slug)
                .fetch_optional(self.pool.mysql()?)
                .await
                .context("Failed to get group by slug")?
                .as_ref()
                .map(row_to_group_mysql)
                .transpose(),
        }
    }

    async fn list(&self) -> Result<Vec<Group>> {
        let sql = format!("SELECT {GROUP_COLUMNS} FROM post_groups ORDER BY title, id");
        match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(&sql)
                .fetch_all(self.pool.sqlite()?)
                .await
                .context("Failed to list groups")?
                .iter()
                .map(row_to_group_sqlite)
                .collect(),
            DatabaseDriver::Mysql => sqlx::query(&sql)
                .fetch_all(self.pool.mysql()?)
                .await
                .context("Failed to list groups")?
                .iter()
                .map(row_to_group_mysql)
                .collect(),
        }
    }

    async fn exists_by_slug(&self, slug: &str) -> Result<bool> {
        Ok(self.get_by_slug(slug).await?.is_some())
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_group_sqlite(pool: &SqlitePool, group: &Group) -> Result<Group> {
    let result = sqlx::query(
        r#"
        INSERT INTO post_groups (title, slug, description, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&group.title)
    .bind(&group.slug)
    .bind(&group.description)
    .bind(group.created_at)
    .execute(pool)
    .await
    .context("Failed to create group")?;

    Ok(Group {
        id: result.last_insert_rowid(),
        ..group.clone()
    })
}

fn row_to_group_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Group> {
    Ok(Group {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_group_mysql(pool: &MySqlPool, group: &Group) -> Result<Group> {
    let result = sqlx::query(
        r#"
        INSERT INTO post_groups (title, slug, description, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&group.title)
    .bind(&group.slug)
    .bind(&group.description)
    .bind(group.created_at)
    .execute(pool)
    .await
    .context("Failed to create group")?;

    Ok(Group {
        id: result.last_insert_id() as i64,
        ..group.clone()
    })
}

fn row_to_group_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Group> {
    Ok(Group {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_repo() -> SqlxGroupRepository {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SqlxGroupRepository::new(pool)
    }

    fn group(title: &str, slug: &str) -> Group {
        Group::new(title.to_string(), slug.to_string(), format!("About {}", title))
    }

    #[tokio::test]
    async fn test_create_and_lookup_group() {
        let repo = setup_test_repo().await;

        let created = repo.create(&group("Cats", "cats")).await.unwrap();
        assert!(created.id > 0);

        let by_slug = repo.get_by_slug("cats").await.unwrap().expect("Group not found");
        assert_eq!(by_slug.id, created.id);
        assert_eq!(by_slug.description, "About Cats");

        let by_id = repo.get_by_id(created.id).await.unwrap().expect("Group not found");
        assert_eq!(by_id.slug, "cats");
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let repo = setup_test_repo().await;

        repo.create(&group("Cats", "cats")).await.unwrap();
        assert!(repo.create(&group("More cats", "cats")).await.is_err());
        assert!(repo.exists_by_slug("cats").await.unwrap());
        assert!(!repo.exists_by_slug("dogs").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_groups_by_title() {
        let repo = setup_test_repo().await;

        repo.create(&group("Zebras", "zebras")).await.unwrap();
        repo.create(&group("Ants", "ants")).await.unwrap();

        let titles: Vec<String> = repo.list().await.unwrap().into_iter().map(|g| g.title).collect();
        assert_eq!(titles, vec!["Ants", "Zebras"]);
    }
}
