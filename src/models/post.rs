//! Post model
//!
//! `Post` mirrors the `posts` table. Listings and the detail page work with
//! [`PostWithMeta`], which carries the author and group summaries joined in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{AuthorRef, GroupRef};

/// Number of characters of the text used as the post's display form
pub const POST_TITLE_CHARS: usize = 15;

/// Post entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    /// Unique identifier
    pub id: i64,
    /// Body text
    pub text: String,
    /// Author user ID
    pub author_id: i64,
    /// Group this post belongs to, if any
    pub group_id: Option<i64>,
    /// Image path relative to the media root
    pub image: Option<String>,
    /// Publication timestamp; never changed by edits
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// Create a new Post. The ID is assigned by the database.
    pub fn new(text: String, author_id: i64, group_id: Option<i64>, image: Option<String>) -> Self {
        Self {
            id: 0,
            text,
            author_id,
            group_id,
            image,
            created_at: Utc::now(),
        }
    }

    /// Short display form: the first characters of the text
    pub fn title(&self) -> String {
        self.text.chars().take(POST_TITLE_CHARS).collect()
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title())
    }
}

/// Post joined with its author and group, as shown in listings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostWithMeta {
    pub id: i64,
    pub text: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author: AuthorRef,
    pub group: Option<GroupRef>,
}

impl PostWithMeta {
    pub fn title(&self) -> String {
        self.text.chars().take(POST_TITLE_CHARS).collect()
    }
}

/// Which posts a listing covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    /// Every post
    All,
    /// Posts in one group
    Group(i64),
    /// Posts by one author
    Author(i64),
}

/// Validated input for creating a post
#[derive(Debug, Clone, Default)]
pub struct CreatePostInput {
    pub text: String,
    pub group_id: Option<i64>,
    /// Stored image path, relative to the media root
    pub image: Option<String>,
}

/// Validated input for editing a post
#[derive(Debug, Clone, Default)]
pub struct UpdatePostInput {
    pub text: String,
    pub group_id: Option<i64>,
    /// Replacement image; `None` keeps the current one
    pub image: Option<String>,
}
