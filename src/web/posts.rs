//! Post pages: listings, detail, create/edit forms and comments

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};

use crate::forms::{CleanedPost, CommentForm, Form, FormData, PostForm};
use crate::models::{CreateCommentInput, CreatePostInput, Post, PostFilter, UpdatePostInput, User};
use crate::services::{CommentServiceError, PostServiceError};
use crate::web::common::{parse_id, post_url, profile_url, PageQuery};
use crate::web::middleware::{AppState, AuthenticatedUser, CurrentUser};
use crate::web::responses::{Page, WebError};
use crate::web::upload::{discard_post_image, save_post_image};

/// GET / - all posts, newest first
pub async fn index(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<Response, WebError> {
    let page = state
        .post_service
        .list(PostFilter::All, query.page.as_deref())
        .await?;

    Page::new("posts/index.html")
        .insert("page_obj", &page.page_obj())
        .render(&state.templates, current.user())
}

/// GET /group/{slug}/ - posts of one group
pub async fn group_posts(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, WebError> {
    let group = state.group_service.require_by_slug(&slug).await?;
    let page = state
        .post_service
        .list(PostFilter::Group(group.id), query.page.as_deref())
        .await?;

    Page::new("posts/group_list.html")
        .insert("group", &group)
        .insert("page_obj", &page.page_obj())
        .render(&state.templates, current.user())
}

/// GET /profile/{username}/ - posts of one author
pub async fn profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Response, WebError> {
    let author = state
        .user_service
        .get_by_username(&username)
        .await?
        .ok_or_else(|| WebError::not_found(format!("user {}", username)))?;
    let page = state
        .post_service
        .list(PostFilter::Author(author.id), query.page.as_deref())
        .await?;

    Page::new("posts/profile.html")
        .insert("author", &author)
        .insert("posts_count", &page.total)
        .insert("page_obj", &page.page_obj())
        .render(&state.templates, current.user())
}

/// GET /posts/{post_id}/ - one post with its comments
pub async fn post_detail(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(raw_id): Path<String>,
) -> Result<Response, WebError> {
    let post_id = parse_id(&raw_id)?;
    let post = state.post_service.get_detail(post_id).await?;
    let posts_count = state.post_service.count_by_author(post.author.id).await?;
    let comments = state.comment_service.list_by_post(post_id).await?;
    let can_edit = current
        .user()
        .is_some_and(|u| u.is_author_of(post.author.id));

    Page::new("posts/post_detail.html")
        .insert("post", &post)
        .insert("posts", &post)
        .insert("posts_count", &posts_count)
        .insert("comments", &comments)
        .insert("form", &CommentForm::unbound())
        .insert("can_edit", &can_edit)
        .render(&state.templates, current.user())
}

/// GET /create/
pub async fn post_create_form(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<Response, WebError> {
    let groups = state.group_service.list().await?;
    render_post_form(&state, &user, PostForm::unbound(&groups), None)
}

/// POST /create/
pub async fn post_create(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    data: FormData,
) -> Result<Response, WebError> {
    let groups = state.group_service.list().await?;
    let cleaned = match PostForm::bind(&groups, &data, &state.upload_config) {
        Ok(cleaned) => cleaned,
        Err(form) => {
            tracing::warn!("Rejected new post from {}: {:?}", user.username, form.errors());
            return render_post_form(&state, &user, form, None);
        }
    };

    let CleanedPost { text, group_id, image } = cleaned;
    let image = store_image(&state, image).await?;
    let input = CreatePostInput {
        text,
        group_id,
        image: image.clone(),
    };

    match state.post_service.create(&user, input).await {
        Ok(_) => Ok(Redirect::to(&profile_url(&user.username)).into_response()),
        Err(e) => {
            if let Some(ref path) = image {
                discard_post_image(&state.upload_config.media_root, path).await;
            }
            match e {
                PostServiceError::ValidationError { field, message } => {
                    let mut form = PostForm::unbound(&groups);
                    form.bind(&data);
                    form.add_error(field, message);
                    render_post_form(&state, &user, form, None)
                }
                other => Err(other.into()),
            }
        }
    }
}

/// GET /posts/{post_id}/edit/
pub async fn post_edit_form(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(raw_id): Path<String>,
) -> Result<Response, WebError> {
    let post = editable_post(&state, &user, &raw_id).await?;
    let post = match post {
        Ok(post) => post,
        Err(redirect) => return Ok(redirect),
    };

    let groups = state.group_service.list().await?;
    render_post_form(&state, &user, PostForm::initial(&groups, &post), Some(post.id))
}

/// POST /posts/{post_id}/edit/
pub async fn post_edit(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(raw_id): Path<String>,
    data: FormData,
) -> Result<Response, WebError> {
    let post = match editable_post(&state, &user, &raw_id).await? {
        Ok(post) => post,
        Err(redirect) => return Ok(redirect),
    };

    let groups = state.group_service.list().await?;
    let cleaned = match PostForm::bind(&groups, &data, &state.upload_config) {
        Ok(cleaned) => cleaned,
        Err(form) => return render_post_form(&state, &user, form, Some(post.id)),
    };

    let CleanedPost { text, group_id, image } = cleaned;
    let image = store_image(&state, image).await?;
    let input = UpdatePostInput {
        text,
        group_id,
        image: image.clone(),
    };

    match state.post_service.update(&user, post.id, input).await {
        Ok(updated) => Ok(Redirect::to(&post_url(updated.id)).into_response()),
        Err(e) => {
            if let Some(ref path) = image {
                discard_post_image(&state.upload_config.media_root, path).await;
            }
            match e {
                PostServiceError::ValidationError { field, message } => {
                    let mut form = PostForm::unbound(&groups);
                    form.bind(&data);
                    form.add_error(field, message);
                    render_post_form(&state, &user, form, Some(post.id))
                }
                PostServiceError::Forbidden { .. } => Ok(Redirect::to(&post_url(post.id)).into_response()),
                other => Err(other.into()),
            }
        }
    }
}

/// POST /posts/{post_id}/comment/
///
/// Valid or not, the reader goes back to the post.
pub async fn add_comment(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Path(raw_id): Path<String>,
    data: FormData,
) -> Result<Response, WebError> {
    let post_id = parse_id(&raw_id)?;
    state.post_service.get(post_id).await?;

    if let Ok(text) = CommentForm::bind(&data) {
        match state
            .comment_service
            .add(post_id, &user, CreateCommentInput { text })
            .await
        {
            Ok(_) => {}
            Err(CommentServiceError::ValidationError(message)) => {
                tracing::warn!("Rejected comment on post {}: {}", post_id, message)
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(Redirect::to(&post_url(post_id)).into_response())
}

/// Load a post for editing. Non-authors get a redirect to the post instead.
async fn editable_post(
    state: &AppState,
    user: &User,
    raw_id: &str,
) -> Result<Result<Post, Response>, WebError> {
    let post_id = parse_id(raw_id)?;
    let post = state.post_service.get(post_id).await?;

    if !user.is_author_of(post.author_id) {
        tracing::warn!("User {} tried to edit post {} of another author", user.username, post_id);
        return Ok(Err(Redirect::to(&post_url(post_id)).into_response()));
    }
    Ok(Ok(post))
}

async fn store_image(
    state: &AppState,
    image: Option<(crate::forms::UploadedFile, &'static str)>,
) -> Result<Option<String>, WebError> {
    match image {
        Some((file, ext)) => Ok(Some(
            save_post_image(&state.upload_config.media_root, &file, ext).await?,
        )),
        None => Ok(None),
    }
}

fn render_post_form(
    state: &AppState,
    user: &User,
    form: Form,
    post_id: Option<i64>,
) -> Result<Response, WebError> {
    Page::new("posts/create_post.html")
        .insert("form", &form)
        .insert("is_edit", &post_id.is_some())
        .insert("post_id", &post_id)
        .render(&state.templates, Some(user))
}
