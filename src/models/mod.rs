//! Data models
//!
//! Database entities (User, Session, Group, Post, Comment), joined read models
//! for display, service inputs and pagination types.

mod comment;
mod group;
mod pagination;
mod post;
mod session;
mod user;

pub use comment::{Comment, CommentWithMeta, CreateCommentInput};
pub use group::{CreateGroupInput, Group, GroupRef};
pub use pagination::{num_pages, ListParams, PageObj, PagedResult};
pub use post::{CreatePostInput, Post, PostFilter, PostWithMeta, UpdatePostInput, POST_TITLE_CHARS};
pub use session::Session;
pub use user::{AuthorRef, CreateUserInput, User};
