//! Form submissions and image storage
//!
//! Post forms arrive either urlencoded or as multipart/form-data when they
//! carry an image. Both are read into the same [`FormData`].

use anyhow::{Context, Result};
use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header,
    response::{IntoResponse, Response},
    Form,
};
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

use crate::forms::{FormData, UploadedFile};

/// Sub-directory of the media root holding post images
pub const POST_IMAGE_DIR: &str = "posts";

impl<S> FromRequest<S> for FormData
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if !is_multipart {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return Ok(FormData::from_pairs(pairs));
        }

        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let mut data = FormData::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(IntoResponse::into_response)?
        {
            let name = field.name().unwrap_or("").to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map_err(IntoResponse::into_response)?;
                    data.insert_file(
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            data: bytes.to_vec(),
                        },
                    );
                }
                None => {
                    let text = field.text().await.map_err(IntoResponse::into_response)?;
                    data.insert(name, text);
                }
            }
        }

        Ok(data)
    }
}

/// Store a validated post image, returning its path relative to the media root
pub async fn save_post_image(media_root: &Path, file: &UploadedFile, ext: &str) -> Result<String> {
    let dir = media_root.join(POST_IMAGE_DIR);
    fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("Failed to create media directory {:?}", dir))?;

    let file_name = format!("{}.{}", Uuid::new_v4(), ext);
    let path = dir.join(&file_name);
    fs::write(&path, &file.data)
        .await
        .with_context(|| format!("Failed to save image {:?}", path))?;

    tracing::info!("Saved image {} ({} bytes)", file_name, file.data.len());
    Ok(format!("{}/{}", POST_IMAGE_DIR, file_name))
}

/// Remove an image stored by `save_post_image` whose post was never saved
pub async fn discard_post_image(media_root: &Path, relative: &str) {
    if let Err(e) = fs::remove_file(media_root.join(relative)).await {
        tracing::warn!("Failed to remove orphaned image {}: {}", relative, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_and_discard_image() {
        let media = TempDir::new().unwrap();
        let file = UploadedFile {
            file_name: "cat.gif".to_string(),
            content_type: Some("image/gif".to_string()),
            data: b"GIF89a-bytes".to_vec(),
        };

        let relative = save_post_image(media.path(), &file, "gif").await.unwrap();
        assert!(relative.starts_with("posts/"));
        assert!(relative.ends_with(".gif"));

        let stored = media.path().join(&relative);
        assert_eq!(std::fs::read(&stored).unwrap(), b"GIF89a-bytes");

        discard_post_image(media.path(), &relative).await;
        assert!(!stored.exists());
    }
}
