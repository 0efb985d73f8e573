//! Group service
//!
//! Groups are created administratively and read on almost every page that
//! shows a post form or a group listing, so lookups and the full list go
//! through the in-process cache. Creating a group drops every cached entry.

use crate::cache::{CacheLayer, MemoryCache};
use crate::db::repositories::GroupRepository;
use crate::models::{CreateGroupInput, Group};
use anyhow::Context;
use std::sync::Arc;

/// Longest accepted group title
pub const MAX_TITLE_LENGTH: usize = 200;

/// Cache key prefixes
const CACHE_KEY_PREFIX: &str = "groups:";
const CACHE_KEY_GROUP_BY_ID: &str = "groups:id:";
const CACHE_KEY_GROUP_BY_SLUG: &str = "groups:slug:";
const CACHE_KEY_GROUP_LIST: &str = "groups:list";

/// Error types for group service operations
#[derive(Debug, thiserror::Error)]
pub enum GroupServiceError {
    /// Group slug already exists
    #[error("Group slug already exists: {0}")]
    DuplicateSlug(String),

    /// Group not found
    #[error("Group not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Group service for managing post groups
pub struct GroupService {
    repo: Arc<dyn GroupRepository>,
    cache: Arc<MemoryCache>,
}

impl GroupService {
    pub fn new(repo: Arc<dyn GroupRepository>, cache: Arc<MemoryCache>) -> Self {
        Self { repo, cache }
    }

    /// Create a new group.
    ///
    /// # Errors
    /// - `ValidationError` for an empty title or a malformed slug
    /// - `DuplicateSlug` if another group already uses the slug
    pub async fn create(&self, input: CreateGroupInput) -> Result<Group, GroupServiceError> {
        let title = input.title.trim().to_string();
        let slug = input.slug.trim().to_string();
        validate_title(&title)?;
        validate_slug(&slug)?;

        if self
            .repo
            .exists_by_slug(&slug)
            .await
            .context("Failed to check slug uniqueness")?
        {
            return Err(GroupServiceError::DuplicateSlug(slug));
        }

        let created = self
            .repo
            .create(&Group::new(title, slug, input.description))
            .await
            .context("Failed to create group")?;

        self.invalidate_cache().await;
        tracing::info!("Created group {} ({})", created.title, created.slug);

        Ok(created)
    }

    /// Get group by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Group>, GroupServiceError> {
        let cache_key = format!("{}{}", CACHE_KEY_GROUP_BY_ID, id);
        if let Some(group) = self.cache.get::<Group>(&cache_key).await.ok().flatten() {
            return Ok(Some(group));
        }

        let group = self
            .repo
            .get_by_id(id)
            .await
            .context("Failed to get group by ID")?;

        if let Some(ref g) = group {
            let _ = self.cache.set(&cache_key, g).await;
        }

        Ok(group)
    }

    /// Get group by slug
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Group>, GroupServiceError> {
        let cache_key = format!("{}{}", CACHE_KEY_GROUP_BY_SLUG, slug);
        if let Some(group) = self.cache.get::<Group>(&cache_key).await.ok().flatten() {
            return Ok(Some(group));
        }

        let group = self
            .repo
            .get_by_slug(slug)
            .await
            .context("Failed to get group by slug")?;

        if let Some(ref g) = group {
            let _ = self.cache.set(&cache_key, g).await;
        }

        Ok(group)
    }

    /// Get group by slug, failing with `NotFound` when it does not exist
    pub async fn require_by_slug(&self, slug: &str) -> Result<Group, GroupServiceError> {
        self.get_by_slug(slug)
            .await?
            .ok_or_else(|| GroupServiceError::NotFound(slug.to_string()))
    }

    /// All groups ordered by title
    pub async fn list(&self) -> Result<Vec<Group>, GroupServiceError> {
        if let Some(list) = self
            .cache
            .get::<Vec<Group>>(CACHE_KEY_GROUP_LIST)
            .await
            .ok()
            .flatten()
        {
            return Ok(list);
        }

        let list = self.repo.list().await.context("Failed to list groups")?;
        let _ = self.cache.set(CACHE_KEY_GROUP_LIST, &list).await;

        Ok(list)
    }

    async fn invalidate_cache(&self) {
        if let Err(e) = self.cache.delete_prefix(CACHE_KEY_PREFIX).await {
            tracing::warn!("Failed to invalidate group cache: {}", e);
        }
    }
}

fn validate_title(title: &str) -> Result<(), GroupServiceError> {
    if title.is_empty() {
        return Err(GroupServiceError::ValidationError(
            "Group title cannot be empty".to_string(),
        ));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(GroupServiceError::ValidationError(format!(
            "Group title cannot exceed {} characters",
            MAX_TITLE_LENGTH
        )));
    }
    Ok(())
}

/// Slugs are non-empty and made of letters, digits, `-` and `_`
pub fn validate_slug(slug: &str) -> Result<(), GroupServiceError> {
    if slug.is_empty() {
        return Err(GroupServiceError::ValidationError(
            "Group slug cannot be empty".to_string(),
        ));
    }
    if !slug
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(GroupServiceError::ValidationError(format!(
            "Invalid slug '{}': use letters, numbers, hyphens or underscores",
            slug
        )));
    }
    Ok(())
}
