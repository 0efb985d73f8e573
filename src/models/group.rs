//! Group model
//!
//! A group is a themed community that posts can optionally belong to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Group entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Group {
    /// Unique identifier
    pub id: i64,
    /// Display title
    pub title: String,
    /// URL-friendly slug (unique)
    pub slug: String,
    /// Free-form description shown on the group page
    pub description: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Group {
    /// Create a new Group. The ID is assigned by the database.
    pub fn new(title: String, slug: String, description: String) -> Self {
        Self {
            id: 0,
            title,
            slug,
            description,
            created_at: Utc::now(),
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

/// Group summary attached to posts in listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
    pub id: i64,
    pub title: String,
    pub slug: String,
}

impl From<&Group> for GroupRef {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id,
            title: group.title.clone(),
            slug: group.slug.clone(),
        }
    }
}

/// Input for creating a group
#[derive(Debug, Clone, Deserialize)]
pub struct CreateGroupInput {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}
