//! Common web utilities and shared types

use serde::Deserialize;

use crate::web::responses::WebError;

/// `?page=` of listing pages, kept raw so any value resolves to a page
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// `?next=` of the login page
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// Parse a numeric path segment; anything else is a missing page
pub fn parse_id(raw: &str) -> Result<i64, WebError> {
    raw.parse::<i64>()
        .map_err(|_| WebError::not_found(format!("id {}", raw)))
}

/// Profile URL of a user
pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

/// Detail URL of a post
pub fn post_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert!(matches!(parse_id("abc"), Err(WebError::NotFound(_))));
    }

    #[test]
    fn test_urls() {
        assert_eq!(profile_url("leo"), "/profile/leo/");
        assert_eq!(profile_url("leo+cat@x"), "/profile/leo%2Bcat%40x/");
        assert_eq!(post_url(7), "/posts/7/");
    }
}
