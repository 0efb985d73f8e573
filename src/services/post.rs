//! Post service
//!
//! Listings, post detail, and authoring. Listing never fails because of the
//! requested page: the raw `page` value is resolved against the current
//! post count before the page is fetched.

use crate::db::repositories::{GroupRepository, PostRepository};
use crate::models::{
    CreatePostInput, ListParams, PagedResult, Post, PostFilter, PostWithMeta, UpdatePostInput,
    User,
};
use anyhow::Context;
use std::sync::Arc;

/// Default number of posts per listing page
pub const DEFAULT_POSTS_PER_PAGE: u32 = 10;

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// Post not found
    #[error("Post not found: {0}")]
    NotFound(i64),

    /// The user is not the author of the post
    #[error("User {user_id} may not edit post {post_id}")]
    Forbidden { post_id: i64, user_id: i64 },

    /// A submitted field is invalid
    #[error("Invalid {field}: {message}")]
    ValidationError { field: &'static str, message: String },

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Post service for listing and authoring posts
pub struct PostService {
    repo: Arc<dyn PostRepository>,
    group_repo: Arc<dyn GroupRepository>,
    per_page: u32,
}

impl PostService {
    pub fn new(repo: Arc<dyn PostRepository>, group_repo: Arc<dyn GroupRepository>) -> Self {
        Self::with_page_size(repo, group_repo, DEFAULT_POSTS_PER_PAGE)
    }

    pub fn with_page_size(
        repo: Arc<dyn PostRepository>,
        group_repo: Arc<dyn GroupRepository>,
        per_page: u32,
    ) -> Self {
        Self {
            repo,
            group_repo,
            per_page: per_page.max(1),
        }
    }

    /// One page of posts matching `filter`, newest first.
    ///
    /// `raw_page` is the unparsed `page` query value.
    pub async fn list(
        &self,
        filter: PostFilter,
        raw_page: Option<&str>,
    ) -> Result<PagedResult<PostWithMeta>, PostServiceError> {
        let total = self.repo.count(filter).await.context("Failed to count posts")?;
        let params = ListParams::resolve(raw_page, self.per_page, total);

        let posts = self
            .repo
            .list(filter, &params)
            .await
            .context("Failed to list posts")?;

        Ok(PagedResult::new(posts, total, &params))
    }

    /// Number of posts written by a user
    pub async fn count_by_author(&self, author_id: i64) -> Result<i64, PostServiceError> {
        Ok(self
            .repo
            .count(PostFilter::Author(author_id))
            .await
            .context("Failed to count author posts")?)
    }

    /// Total number of posts
    pub async fn count(&self) -> Result<i64, PostServiceError> {
        Ok(self
            .repo
            .count(PostFilter::All)
            .await
            .context("Failed to count posts")?)
    }

    /// Get a post by ID
    pub async fn get(&self, id: i64) -> Result<Post, PostServiceError> {
        self.repo
            .get_by_id(id)
            .await
            .context("Failed to get post")?
            .ok_or(PostServiceError::NotFound(id))
    }

    /// Get a post with its author and group for display
    pub async fn get_detail(&self, id: i64) -> Result<PostWithMeta, PostServiceError> {
        self.repo
            .get_with_meta(id)
            .await
            .context("Failed to get post detail")?
            .ok_or(PostServiceError::NotFound(id))
    }

    /// Publish a new post as `author`
    pub async fn create(&self, author: &User, input: CreatePostInput) -> Result<Post, PostServiceError> {
        self.validate_group(input.group_id).await?;
        let text = validate_text(&input.text)?;

        let post = Post::new(text, author.id, input.group_id, input.image);
        let created = self.repo.create(&post).await.context("Failed to create post")?;

        tracing::info!("User {} published post {}", author.username, created.id);
        Ok(created)
    }

    /// Edit an existing post.
    ///
    /// Only the author may edit. Author and creation time never change, and
    /// the image is replaced only when a new one is given.
    pub async fn update(
        &self,
        editor: &User,
        post_id: i64,
        input: UpdatePostInput,
    ) -> Result<Post, PostServiceError> {
        let mut post = self.get(post_id).await?;
        ensure_author(editor, &post)?;

        self.validate_group(input.group_id).await?;
        post.text = validate_text(&input.text)?;
        post.group_id = input.group_id;
        if input.image.is_some() {
            post.image = input.image;
        }

        let updated = self
            .repo
            .update(&post)
            .await
            .context("Failed to update post")?
            .ok_or(PostServiceError::NotFound(post_id))?;

        tracing::info!("User {} edited post {}", editor.username, post_id);
        Ok(updated)
    }

    async fn validate_group(&self, group_id: Option<i64>) -> Result<(), PostServiceError> {
        if let Some(id) = group_id {
            if self
                .group_repo
                .get_by_id(id)
                .await
                .context("Failed to check group")?
                .is_none()
            {
                return Err(PostServiceError::ValidationError {
                    field: "group",
                    message: "Select a valid choice. That choice is not one of the available choices."
                        .to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Fail with `Forbidden` unless `user` wrote `post`
pub fn ensure_author(user: &User, post: &Post) -> Result<(), PostServiceError> {
    if user.is_author_of(post.author_id) {
        Ok(())
    } else {
        Err(PostServiceError::Forbidden {
            post_id: post.id,
            user_id: user.id,
        })
    }
}

fn validate_text(text: &str) -> Result<String, PostServiceError> {
    if text.trim().is_empty() {
        return Err(PostServiceError::ValidationError {
            field: "text",
            message: "This field is required.".to_string(),
        });
    }
    Ok(text.to_string())
}
