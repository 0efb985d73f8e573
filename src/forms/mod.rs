//! HTML forms
//!
//! A [`Form`] is a list of typed fields that can be rendered by templates
//! (label, widget, current value, choices, errors) and bound to submitted
//! [`FormData`]. Binding a concrete form either yields cleaned values or
//! hands the form back with per-field errors for re-rendering.

pub mod auth;
pub mod post;

use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};

pub use auth::{LoginForm, SignupForm};
pub use post::{CleanedPost, CommentForm, PostForm};

/// Error message for a missing required value
pub const REQUIRED: &str = "This field is required.";

/// A file part of a multipart submission
#[derive(Debug, Clone, Default)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Submitted form values, from an urlencoded or multipart body
#[derive(Debug, Clone, Default)]
pub struct FormData {
    values: HashMap<String, String>,
    files: HashMap<String, UploadedFile>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            files: HashMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Attach a file; empty file inputs (no name and no content) are dropped
    pub fn insert_file(&mut self, name: impl Into<String>, file: UploadedFile) {
        if file.file_name.is_empty() && file.data.is_empty() {
            return;
        }
        self.files.insert(name.into(), file);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Value of `name`, or the empty string when absent
    pub fn value(&self, name: &str) -> &str {
        self.get(name).unwrap_or("")
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name)
    }
}

/// Field type, as a form library would name its field classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldKind {
    CharField,
    ChoiceField,
    ImageField,
    EmailField,
}

/// How a field is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Widget {
    TextInput,
    Textarea,
    PasswordInput,
    EmailInput,
    Select,
    FileInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// One form field with everything a template needs to render it
#[derive(Debug, Clone, Serialize)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub widget: Widget,
    pub required: bool,
    pub help_text: &'static str,
    pub value: String,
    pub choices: Vec<Choice>,
    pub errors: Vec<String>,
}

impl FormField {
    fn new(name: &'static str, label: &'static str, kind: FieldKind, widget: Widget) -> Self {
        Self {
            name,
            label,
            kind,
            widget,
            required: false,
            help_text: "",
            value: String::new(),
            choices: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn char(name: &'static str, label: &'static str) -> Self {
        Self::new(name, label, FieldKind::CharField, Widget::TextInput)
    }

    pub fn choice(name: &'static str, label: &'static str, choices: Vec<Choice>) -> Self {
        let mut field = Self::new(name, label, FieldKind::ChoiceField, Widget::Select);
        field.choices = choices;
        field
    }

    pub fn image(name: &'static str, label: &'static str) -> Self {
        Self::new(name, label, FieldKind::ImageField, Widget::FileInput)
    }

    pub fn email(name: &'static str, label: &'static str) -> Self {
        Self::new(name, label, FieldKind::EmailField, Widget::EmailInput)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn widget(mut self, widget: Widget) -> Self {
        self.widget = widget;
        self
    }

    pub fn help(mut self, help_text: &'static str) -> Self {
        self.help_text = help_text;
        self
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// An ordered set of fields plus errors not tied to a single field
#[derive(Debug, Clone, Default)]
pub struct Form {
    fields: Vec<FormField>,
    non_field_errors: Vec<String>,
    bound: bool,
}

impl Form {
    pub fn new(fields: Vec<FormField>) -> Self {
        Self {
            fields,
            non_field_errors: Vec::new(),
            bound: false,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn field_mut(&mut self, name: &str) -> Option<&mut FormField> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn set_value(&mut self, name: &str, value: impl Into<String>) {
        if let Some(field) = self.field_mut(name) {
            field.value = value.into();
        }
    }

    /// Copy submitted values into the fields. Password fields are not echoed back.
    pub fn bind(&mut self, data: &FormData) {
        for field in &mut self.fields {
            if field.widget != Widget::PasswordInput && field.widget != Widget::FileInput {
                field.value = data.value(field.name).to_string();
            }
        }
        self.bound = true;
    }

    /// Record an error against `name`; unknown names become non-field errors
    pub fn add_error(&mut self, name: &str, message: impl Into<String>) {
        let message = message.into();
        match self.field_mut(name) {
            Some(field) => field.errors.push(message),
            None => self.non_field_errors.push(message),
        }
    }

    pub fn add_non_field_error(&mut self, message: impl Into<String>) {
        self.non_field_errors.push(message.into());
    }

    /// Flag every required text or choice field left empty in `data`.
    ///
    /// Reads the submission rather than the bound values, which omit passwords.
    pub fn check_required(&mut self, data: &FormData) {
        for field in &mut self.fields {
            if field.required
                && field.widget != Widget::FileInput
                && data.value(field.name).trim().is_empty()
            {
                field.errors.push(REQUIRED.to_string());
            }
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn is_valid(&self) -> bool {
        self.non_field_errors.is_empty() && self.fields.iter().all(FormField::is_valid)
    }

    /// Field errors keyed by field name
    pub fn errors(&self) -> BTreeMap<&'static str, Vec<String>> {
        self.fields
            .iter()
            .filter(|f| !f.errors.is_empty())
            .map(|f| (f.name, f.errors.clone()))
            .collect()
    }

    pub fn non_field_errors(&self) -> &[String] {
        &self.non_field_errors
    }
}

#[derive(Serialize)]
struct FormView<'a> {
    fields: BTreeMap<&'static str, &'a FormField>,
    field_order: Vec<&'static str>,
    errors: BTreeMap<&'static str, Vec<String>>,
    non_field_errors: &'a [String],
    is_bound: bool,
    is_valid: bool,
}

impl Serialize for Form {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        FormView {
            fields: self.fields.iter().map(|f| (f.name, f)).collect(),
            field_order: self.fields.iter().map(|f| f.name).collect(),
            errors: self.errors(),
            non_field_errors: &self.non_field_errors,
            is_bound: self.bound,
            is_valid: self.is_valid(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Form {
        Form::new(vec![
            FormField::char("text", "Text").widget(Widget::Textarea).required(),
            FormField::char("password", "Password").widget(Widget::PasswordInput),
            FormField::choice("group", "Group", vec![Choice::new("", "---------")]),
        ])
    }

    #[test]
    fn test_bind_copies_values_but_not_passwords() {
        let mut form = sample();
        form.bind(&FormData::from_pairs([("text", "hi"), ("password", "secret")]));

        assert!(form.is_bound());
        assert_eq!(form.field("text").unwrap().value, "hi");
        assert_eq!(form.field("password").unwrap().value, "");
    }

    #[test]
    fn test_required_and_errors() {
        let mut form = sample();
        let data = FormData::from_pairs([("text", "   ")]);
        form.bind(&data);
        form.check_required(&data);

        assert!(!form.is_valid());
        assert_eq!(form.errors()["text"], vec![REQUIRED.to_string()]);

        form.add_error("nonexistent", "Something else");
        assert_eq!(form.non_field_errors(), ["Something else".to_string()]);
    }

    #[test]
    fn test_required_password_counts_when_submitted() {
        let mut form = Form::new(vec![FormField::char("password", "Password")
            .widget(Widget::PasswordInput)
            .required()]);
        let data = FormData::from_pairs([("password", "password123")]);
        form.bind(&data);
        form.check_required(&data);

        assert!(form.is_valid());
        assert_eq!(form.field("password").unwrap().value, "");

        let mut empty = form.clone();
        empty.check_required(&FormData::new());
        assert_eq!(empty.errors()["password"], vec![REQUIRED.to_string()]);
    }

    #[test]
    fn test_serialized_shape() {
        let form = sample();
        let json = serde_json::to_value(&form).unwrap();

        assert_eq!(json["fields"]["text"]["kind"], "CharField");
        assert_eq!(json["fields"]["text"]["widget"], "textarea");
        assert_eq!(json["fields"]["group"]["kind"], "ChoiceField");
        assert_eq!(json["field_order"][0], "text");
        assert_eq!(json["is_valid"], true);
    }

    #[test]
    fn test_empty_file_input_is_ignored() {
        let mut data = FormData::new();
        data.insert_file("image", UploadedFile::default());
        assert!(data.file("image").is_none());
    }
}
