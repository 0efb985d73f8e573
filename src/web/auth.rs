//! Authentication pages: signup, login and logout

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
};

use crate::forms::{Form, FormData, LoginForm, SignupForm};
use crate::models::Session;
use crate::services::UserServiceError;
use crate::web::common::NextQuery;
use crate::web::middleware::{
    clear_session_cookie, extract_session_token, is_safe_next, session_cookie, AppState,
    CurrentUser,
};
use crate::web::responses::{Page, WebError};

const BAD_CREDENTIALS: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// GET /auth/signup/
pub async fn signup_form(State(state): State<AppState>, current: CurrentUser) -> Result<Response, WebError> {
    render_signup(&state, &current, SignupForm::unbound())
}

/// POST /auth/signup/ - register and log the new user in
pub async fn signup(
    State(state): State<AppState>,
    current: CurrentUser,
    data: FormData,
) -> Result<Response, WebError> {
    let input = match SignupForm::bind(&data) {
        Ok(input) => input,
        Err(form) => return render_signup(&state, &current, form),
    };

    let user = match state.user_service.register(input).await {
        Ok(user) => user,
        Err(e) => {
            let mut form = SignupForm::unbound();
            form.bind(&data);
            match e {
                UserServiceError::ValidationError { field, message } => form.add_error(field, message),
                UserServiceError::UserExists(_) => {
                    form.add_error("username", "A user with that username already exists.")
                }
                other => return Err(other.into()),
            }
            return render_signup(&state, &current, form);
        }
    };

    let session = state.user_service.create_session(user.id).await?;
    Ok(logged_in_redirect(&state, &session, "/"))
}

/// GET /auth/login/
pub async fn login_form(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<NextQuery>,
) -> Result<Response, WebError> {
    render_login(&state, &current, LoginForm::unbound(), query.next.as_deref())
}

/// POST /auth/login/ - check credentials, then go to `next` or the main page
pub async fn login(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<NextQuery>,
    data: FormData,
) -> Result<Response, WebError> {
    let next = data
        .get("next")
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .or(query.next);

    let (username, password) = match LoginForm::bind(&data) {
        Ok(credentials) => credentials,
        Err(form) => return render_login(&state, &current, form, next.as_deref()),
    };

    match state.user_service.login(&username, &password).await {
        Ok((user, session)) => {
            tracing::info!("User {} logged in", user.username);
            let target = next.as_deref().filter(|n| is_safe_next(n)).unwrap_or("/");
            Ok(logged_in_redirect(&state, &session, target))
        }
        Err(UserServiceError::AuthenticationError(_)) => {
            let form = LoginForm::failed(&data, BAD_CREDENTIALS);
            render_login(&state, &current, form, next.as_deref())
        }
        Err(e) => Err(e.into()),
    }
}

/// GET|POST /auth/logout/
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, WebError> {
    if let Some(token) = extract_session_token(&headers) {
        state.user_service.logout(&token).await?;
    }

    let mut response = Page::new("users/logged_out.html").render(&state.templates, None)?;
    response
        .headers_mut()
        .insert(header::SET_COOKIE, clear_session_cookie());
    Ok(response)
}

fn logged_in_redirect(state: &AppState, session: &Session, target: &str) -> Response {
    let mut response = Redirect::to(target).into_response();
    match session_cookie(&session.id, state.session_days) {
        Some(cookie) => {
            response.headers_mut().insert(header::SET_COOKIE, cookie);
        }
        None => tracing::error!("Session token is not a valid cookie value"),
    }
    response
}

fn render_signup(state: &AppState, current: &CurrentUser, form: Form) -> Result<Response, WebError> {
    Page::new("users/signup.html")
        .insert("form", &form)
        .render(&state.templates, current.user())
}

fn render_login(
    state: &AppState,
    current: &CurrentUser,
    form: Form,
    next: Option<&str>,
) -> Result<Response, WebError> {
    Page::new("users/login.html")
        .insert("form", &form)
        .insert("next", next.unwrap_or(""))
        .render(&state.templates, current.user())
}
