//! Web layer - HTML pages and routing
//!
//! Every page is rendered server-side from a named template. Sessions are
//! resolved for every request; authoring routes additionally require a
//! logged-in user and send guests to the login page.

pub mod auth;
pub mod common;
pub mod middleware;
pub mod posts;
pub mod responses;
pub mod upload;


use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::cache::create_cache;
use crate::config::Config;
use crate::db::repositories::{
    SqlxCommentRepository, SqlxGroupRepository, SqlxPostRepository, SqlxSessionRepository,
    SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::services::{CommentService, GroupService, PostService, UserService};
use crate::templates::TemplateEngine;

pub use middleware::{AppState, AuthenticatedUser, CurrentUser};
pub use responses::{Page, WebError};

/// Room for form fields next to the largest accepted image
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Wire repositories, services and templates into the shared state
pub fn build_state(pool: DynDatabasePool, config: &Config) -> anyhow::Result<AppState> {
    let cache = create_cache(&config.cache);

    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let group_repo = SqlxGroupRepository::boxed(pool.clone());
    let post_repo = SqlxPostRepository::boxed(pool.clone());
    let comment_repo = SqlxCommentRepository::boxed(pool.clone());

    let templates = TemplateEngine::new().context("Failed to load templates")?;

    Ok(AppState {
        pool,
        user_service: Arc::new(UserService::with_session_expiration(
            user_repo,
            session_repo,
            config.session.expiration_days,
        )),
        group_service: Arc::new(GroupService::new(group_repo.clone(), cache)),
        post_service: Arc::new(PostService::with_page_size(
            post_repo.clone(),
            group_repo,
            config.pagination.posts_per_page,
        )),
        comment_service: Arc::new(CommentService::new(comment_repo, post_repo)),
        templates: Arc::new(templates),
        upload_config: Arc::new(config.upload.clone()),
        session_days: config.session.expiration_days,
    })
}

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    // Authoring routes (need a logged-in user)
    let protected_routes = Router::new()
        .route("/create/", get(posts::post_create_form).post(posts::post_create))
        .route(
            "/posts/{post_id}/edit/",
            get(posts::post_edit_form).post(posts::post_edit),
        )
        .route("/posts/{post_id}/comment/", post(posts::add_comment))
        .route_layer(axum_middleware::from_fn(middleware::require_login));

    let body_limit = state.upload_config.max_file_size as usize + FORM_OVERHEAD_BYTES;
    let media = ServeDir::new(&state.upload_config.media_root);

    Router::new()
        .route("/", get(posts::index))
        .route("/group/{slug}/", get(posts::group_posts))
        .route("/profile/{username}/", get(posts::profile))
        .route("/posts/{post_id}/", get(posts::post_detail))
        .route("/auth/signup/", get(auth::signup_form).post(auth::signup))
        .route("/auth/login/", get(auth::login_form).post(auth::login))
        .route("/auth/logout/", get(auth::logout).post(auth::logout))
        .merge(protected_routes)
        .nest_service("/media", media)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::render_error_pages,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found(uri: axum::http::Uri) -> WebError {
    WebError::not_found(uri.path().to_string())
}
