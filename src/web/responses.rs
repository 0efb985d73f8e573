//! Page and error responses
//!
//! Handlers build a [`Page`] (template name plus context) and render it, or
//! fail with a [`WebError`]. Error responses carry an [`ErrorPage`] marker
//! that the error-page middleware turns into the 404/500 templates.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Serialize;
use tera::Context as TeraContext;

use crate::models::User;
use crate::services::{CommentServiceError, GroupServiceError, PostServiceError, UserServiceError};
use crate::templates::{TemplateEngine, TemplateError};

/// Marker left on error responses for the error-page middleware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPage(pub StatusCode);

/// Errors surfaced to the browser
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl WebError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            WebError::NotFound(_) => StatusCode::NOT_FOUND,
            WebError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            WebError::NotFound(what) => tracing::debug!("Not found: {}", what),
            WebError::Internal(e) => tracing::error!("Internal error: {:#}", e),
        }

        let mut response = status.into_response();
        response.extensions_mut().insert(ErrorPage(status));
        response
    }
}

impl From<TemplateError> for WebError {
    fn from(e: TemplateError) -> Self {
        WebError::Internal(e.into())
    }
}

impl From<PostServiceError> for WebError {
    fn from(e: PostServiceError) -> Self {
        match e {
            PostServiceError::NotFound(id) => WebError::NotFound(format!("post {}", id)),
            PostServiceError::InternalError(e) => WebError::Internal(e),
            other => WebError::Internal(other.into()),
        }
    }
}

impl From<GroupServiceError> for WebError {
    fn from(e: GroupServiceError) -> Self {
        match e {
            GroupServiceError::NotFound(slug) => WebError::NotFound(format!("group {}", slug)),
            GroupServiceError::InternalError(e) => WebError::Internal(e),
            other => WebError::Internal(other.into()),
        }
    }
}

impl From<CommentServiceError> for WebError {
    fn from(e: CommentServiceError) -> Self {
        match e {
            CommentServiceError::PostNotFound(id) => WebError::NotFound(format!("post {}", id)),
            CommentServiceError::InternalError(e) => WebError::Internal(e),
            other => WebError::Internal(other.into()),
        }
    }
}

impl From<UserServiceError> for WebError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::InternalError(e) => WebError::Internal(e),
            other => WebError::Internal(other.into()),
        }
    }
}

/// A template to render with its context
pub struct Page {
    template: &'static str,
    context: TeraContext,
    status: StatusCode,
}

impl Page {
    pub fn new(template: &'static str) -> Self {
        Self {
            template,
            context: TeraContext::new(),
            status: StatusCode::OK,
        }
    }

    pub fn insert<T: Serialize + ?Sized>(mut self, key: &str, value: &T) -> Self {
        self.context.insert(key, value);
        self
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn template(&self) -> &'static str {
        self.template
    }

    /// Render with the viewer and template name added to the context
    pub fn render(mut self, engine: &TemplateEngine, user: Option<&User>) -> Result<Response, WebError> {
        self.context.insert("template_name", self.template);
        self.context.insert("user", &user);
        self.context.insert("is_authenticated", &user.is_some());

        let html = engine.render(self.template, &self.context)?;
        Ok((self.status, Html(html)).into_response())
    }
}
