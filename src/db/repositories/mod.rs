//! Database repositories
//!
//! One repository trait per entity, each with a SQLx implementation that
//! dispatches on the configured driver.

pub mod comment;
pub mod group;
pub mod post;
pub mod session;
pub mod user;

pub use comment::{CommentRepository, SqlxCommentRepository};
pub use group::{GroupRepository, SqlxGroupRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};
