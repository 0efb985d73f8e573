//! Services layer - Business logic
//!
//! Services sit between the web handlers and the repositories. They own
//! validation and access rules and coordinate the cache.

pub mod comment;
pub mod group;
pub mod password;
pub mod post;
pub mod user;

pub use comment::{CommentService, CommentServiceError};
pub use group::{GroupService, GroupServiceError};
pub use password::{hash_password, verify_password};
pub use post::{ensure_author, PostService, PostServiceError};
pub use user::{UserService, UserServiceError};
