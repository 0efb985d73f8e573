//! Template engine error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    /// No template registered under this name
    #[error("Template not found: {0}")]
    NotFound(String),

    /// A template failed to parse or its inheritance chain is broken
    #[error("Failed to load template {name}: {message}")]
    LoadError { name: String, message: String },

    /// Rendering failed, usually a missing context variable
    #[error("Template error: {0}")]
    RenderError(String),
}
