//! Web middleware
//!
//! Contains middleware for:
//! - Resolving the session token to the current user
//! - Sending guests to the login page from protected routes
//! - Rendering error pages for handler errors

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::UploadConfig;
use crate::models::User;
use crate::services::{CommentService, GroupService, PostService, UserService};
use crate::templates::TemplateEngine;
use crate::web::responses::{ErrorPage, Page};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Path of the login page
pub const LOGIN_URL: &str = "/auth/login/";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: crate::db::DynDatabasePool,
    pub user_service: Arc<UserService>,
    pub group_service: Arc<GroupService>,
    pub post_service: Arc<PostService>,
    pub comment_service: Arc<CommentService>,
    pub templates: Arc<TemplateEngine>,
    pub upload_config: Arc<UploadConfig>,
    pub session_days: i64,
}

/// Logged-in user, present in request extensions once the session is validated
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// The logged-in user if any; never rejects
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<User>);

impl CurrentUser {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| login_redirect(&next_path(parts.uri.path(), parts.uri.query())))
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(CurrentUser(
            parts.extensions.get::<AuthenticatedUser>().map(|au| au.0.clone()),
        ))
    }
}

/// Extract session token from request headers.
///
/// A bearer token wins over the session cookie.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    let prefix = format!("{}=", SESSION_COOKIE);
    for cookie_header in headers.get_all(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                if let Some(token) = cookie.trim().strip_prefix(&prefix) {
                    if !token.is_empty() {
                        return Some(token.to_string());
                    }
                }
            }
        }
    }

    None
}

/// Attach the current user to the request when the session is valid.
///
/// Unknown and expired tokens leave the request anonymous.
pub async fn optional_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = extract_session_token(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            Ok(None) => {}
            Err(e) => tracing::error!("Session validation failed: {}", e),
        }
    }
    next.run(request).await
}

/// Send guests to the login page, remembering where they were going
pub async fn require_login(request: Request, next: Next) -> Response {
    if request.extensions().get::<AuthenticatedUser>().is_none() {
        let uri = request.uri();
        tracing::debug!("Guest sent to login from {}", uri.path());
        return login_redirect(&next_path(uri.path(), uri.query())).into_response();
    }

    next.run(request).await
}

/// Render the 404/500 page for responses marked by `WebError`
pub async fn render_error_pages(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .map(|au| au.0.clone());
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    match response.extensions().get::<ErrorPage>().copied() {
        Some(ErrorPage(status)) => error_page(&state, status, &path, user.as_ref()),
        None => response,
    }
}

/// Render the error page for `status`
pub fn error_page(state: &AppState, status: StatusCode, path: &str, user: Option<&User>) -> Response {
    let template = if status == StatusCode::NOT_FOUND {
        "core/404.html"
    } else {
        "core/500.html"
    };

    let page = Page::new(template).status(status).insert("path", path);
    match page.render(&state.templates, user) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("Failed to render error page {}: {}", template, e);
            let html = state
                .templates
                .render_with_fallback(template, &tera::Context::new());
            (status, axum::response::Html(html)).into_response()
        }
    }
}

/// Path plus query, used as the `next` target after login
fn next_path(path: &str, query: Option<&str>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("{}?{}", path, q),
        _ => path.to_string(),
    }
}

/// Redirect to the login page with `next` set
pub fn login_redirect(next: &str) -> Redirect {
    let encoded = urlencoding::encode(next).replace("%2F", "/");
    Redirect::to(&format!("{}?next={}", LOGIN_URL, encoded))
}

/// Whether `next` is a safe local redirect target
pub fn is_safe_next(next: &str) -> bool {
    next.starts_with('/')
        && !next.starts_with("//")
        && !next.contains('\\')
        && !next.chars().any(char::is_control)
}

/// `Set-Cookie` value that stores the session token
pub fn session_cookie(token: &str, days: i64) -> Option<HeaderValue> {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        days * 24 * 60 * 60
    );
    HeaderValue::from_str(&cookie).ok()
}

/// `Set-Cookie` value that removes the session cookie
pub fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_static("session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}
