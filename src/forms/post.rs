//! Post and comment forms

use super::{Choice, Form, FormData, FormField, UploadedFile, Widget};
use crate::config::UploadConfig;
use crate::models::{Group, Post};

const INVALID_CHOICE: &str = "Select a valid choice. That choice is not one of the available choices.";
const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

/// Values of a valid post submission
#[derive(Debug, Clone)]
pub struct CleanedPost {
    pub text: String,
    pub group_id: Option<i64>,
    /// New image with its file extension, when one was uploaded
    pub image: Option<(UploadedFile, &'static str)>,
}

/// Form for creating and editing posts
pub struct PostForm;

impl PostForm {
    /// Empty form with one choice per group plus the blank choice
    pub fn unbound(groups: &[Group]) -> Form {
        let mut choices = vec![Choice::new("", "---------")];
        choices.extend(groups.iter().map(|g| Choice::new(g.id.to_string(), g.title.clone())));

        Form::new(vec![
            FormField::char("text", "Post text")
                .widget(Widget::Textarea)
                .help("Text of the new post")
                .required(),
            FormField::choice("group", "Group", choices)
                .help("Group the post will belong to"),
            FormField::image("image", "Image"),
        ])
    }

    /// Form pre-filled from an existing post
    pub fn initial(groups: &[Group], post: &Post) -> Form {
        let mut form = Self::unbound(groups);
        form.set_value("text", post.text.clone());
        form.set_value("group", post.group_id.map(|id| id.to_string()).unwrap_or_default());
        if let Some(ref image) = post.image {
            form.set_value("image", image.clone());
        }
        form
    }

    /// Validate a submission against the current groups and upload limits.
    ///
    /// On failure the bound form is returned with its errors.
    pub fn bind(groups: &[Group], data: &FormData, upload: &UploadConfig) -> Result<CleanedPost, Form> {
        let mut form = Self::unbound(groups);
        form.bind(data);
        form.check_required(data);

        let group_id = match data.value("group").trim() {
            "" => None,
            raw => match raw.parse::<i64>() {
                Ok(id) if groups.iter().any(|g| g.id == id) => Some(id),
                _ => {
                    form.add_error("group", INVALID_CHOICE);
                    None
                }
            },
        };

        let image = match data.file("image") {
            None => None,
            Some(file) => match validate_image(file, upload) {
                Ok(ext) => Some((file.clone(), ext)),
                Err(message) => {
                    form.add_error("image", message);
                    None
                }
            },
        };

        if !form.is_valid() {
            return Err(form);
        }

        Ok(CleanedPost {
            text: data.value("text").to_string(),
            group_id,
            image,
        })
    }
}

/// Check an uploaded image, returning the extension to store it under.
///
/// The declared content type must be allowed and the bytes must look like
/// that kind of image.
pub fn validate_image(file: &UploadedFile, upload: &UploadConfig) -> Result<&'static str, String> {
    if file.data.is_empty() {
        return Err("The submitted file is empty.".to_string());
    }
    if file.size() > upload.max_file_size {
        return Err(format!(
            "File too large. Maximum size: {} MB",
            upload.max_file_size / 1024 / 1024
        ));
    }

    let sniffed = sniff_image_type(&file.data).ok_or_else(|| INVALID_IMAGE.to_string())?;
    let declared = file
        .content_type
        .as_deref()
        .filter(|ct| *ct != "application/octet-stream")
        .unwrap_or(sniffed);
    if declared != sniffed || !upload.is_type_allowed(sniffed) {
        return Err(format!("File type {} is not allowed.", declared));
    }

    Ok(upload.get_extension(sniffed))
}

/// Detect an image MIME type from its leading bytes
fn sniff_image_type(data: &[u8]) -> Option<&'static str> {
    match data {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => Some("image/png"),
        [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        _ => None,
    }
}

/// Form for adding a comment under a post
pub struct CommentForm;

impl CommentForm {
    pub fn unbound() -> Form {
        Form::new(vec![FormField::char("text", "Comment text")
            .widget(Widget::Textarea)
            .required()])
    }

    pub fn bind(data: &FormData) -> Result<String, Form> {
        let mut form = Self::unbound();
        form.bind(data);
        form.check_required(data);

        if form.is_valid() {
            Ok(data.value("text").to_string())
        } else {
            Err(form)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::FieldKind;

    /// Smallest valid GIF
    const GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x21, 0xF9,
        0x04, 0x01, 0x0A, 0x00, 0x01, 0x00, 0x2C, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00,
        0x00, 0x02, 0x02, 0x4C, 0x01, 0x00, 0x3B,
    ];

    fn groups() -> Vec<Group> {
        let mut cats = Group::new("Cats".to_string(), "cats".to_string(), String::new());
        cats.id = 1;
        let mut dogs = Group::new("Dogs".to_string(), "dogs".to_string(), String::new());
        dogs.id = 2;
        vec![cats, dogs]
    }

    fn gif(name: &str, content_type: &str) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: Some(content_type.to_string()),
            data: GIF.to_vec(),
        }
    }

    #[test]
    fn test_field_kinds() {
        let form = PostForm::unbound(&groups());

        assert_eq!(form.field("text").unwrap().kind, FieldKind::CharField);
        assert_eq!(form.field("group").unwrap().kind, FieldKind::ChoiceField);
        assert_eq!(form.field("image").unwrap().kind, FieldKind::ImageField);

        let choices = &form.field("group").unwrap().choices;
        assert_eq!(choices.len(), 3);
        assert_eq!(choices[0].value, "");
        assert_eq!(choices[2].label, "Dogs");
    }

    #[test]
    fn test_initial_values_from_post() {
        let post = Post::new("Existing".to_string(), 1, Some(2), None);
        let form = PostForm::initial(&groups(), &post);

        assert_eq!(form.field("text").unwrap().value, "Existing");
        assert_eq!(form.field("group").unwrap().value, "2");
        assert!(!form.is_bound());
    }

    #[test]
    fn test_valid_submission() {
        let data = FormData::from_pairs([("text", "Hello"), ("group", "1")]);
        let cleaned = PostForm::bind(&groups(), &data, &UploadConfig::default()).unwrap();

        assert_eq!(cleaned.text, "Hello");
        assert_eq!(cleaned.group_id, Some(1));
        assert!(cleaned.image.is_none());
    }

    #[test]
    fn test_blank_group_means_none() {
        let data = FormData::from_pairs([("text", "Hello"), ("group", "")]);
        let cleaned = PostForm::bind(&groups(), &data, &UploadConfig::default()).unwrap();
        assert_eq!(cleaned.group_id, None);
    }

    #[test]
    fn test_missing_text_and_bad_group() {
        let data = FormData::from_pairs([("text", ""), ("group", "99")]);
        let form = PostForm::bind(&groups(), &data, &UploadConfig::default()).unwrap_err();

        let errors = form.errors();
        assert_eq!(errors["text"], vec![crate::forms::REQUIRED.to_string()]);
        assert_eq!(errors["group"], vec![INVALID_CHOICE.to_string()]);
        assert_eq!(form.field("group").unwrap().value, "99");
    }

    #[test]
    fn test_image_accepted() {
        let mut data = FormData::from_pairs([("text", "Pic")]);
        data.insert_file("image", gif("small.gif", "image/gif"));

        let cleaned = PostForm::bind(&groups(), &data, &UploadConfig::default()).unwrap();
        let (file, ext) = cleaned.image.unwrap();
        assert_eq!(ext, "gif");
        assert_eq!(file.data, GIF);
    }

    #[test]
    fn test_image_rejections() {
        let upload = UploadConfig::default();

        let text_file = UploadedFile {
            file_name: "notes.txt".to_string(),
            content_type: Some("text/plain".to_string()),
            data: b"just text".to_vec(),
        };
        assert!(validate_image(&text_file, &upload).is_err());

        let mislabeled = gif("small.png", "image/png");
        assert!(validate_image(&mislabeled, &upload).is_err());

        let small_limit = UploadConfig {
            max_file_size: 10,
            ..UploadConfig::default()
        };
        assert!(validate_image(&gif("small.gif", "image/gif"), &small_limit).is_err());

        let gif_disallowed = UploadConfig {
            allowed_types: vec!["image/png".to_string()],
            ..UploadConfig::default()
        };
        assert!(validate_image(&gif("small.gif", "image/gif"), &gif_disallowed).is_err());
    }

    #[test]
    fn test_sniff_image_types() {
        assert_eq!(sniff_image_type(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(
            sniff_image_type(b"\x89PNG\r\n\x1a\n rest"),
            Some("image/png")
        );
        assert_eq!(sniff_image_type(b"RIFF\0\0\0\0WEBPVP8 "), Some("image/webp"));
        assert_eq!(sniff_image_type(b"GIF87a"), Some("image/gif"));
        assert_eq!(sniff_image_type(b"hello"), None);
    }

    #[test]
    fn test_comment_form() {
        assert_eq!(
            CommentForm::bind(&FormData::from_pairs([("text", "Nice")])).unwrap(),
            "Nice"
        );
        assert!(CommentForm::bind(&FormData::from_pairs([("text", " ")])).is_err());
    }
}
