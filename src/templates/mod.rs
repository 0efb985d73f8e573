//! Template engine
//!
//! Page templates live in the `templates/` directory and are embedded into
//! the binary at build time. They are parsed once at startup; base templates
//! are registered first so inheritance chains resolve.

use rust_embed::RustEmbed;
use std::error::Error as StdError;
use tera::{Context as TeraContext, Tera};

mod error;

pub use error::TemplateError;

/// Embedded page templates
#[derive(RustEmbed)]
#[folder = "templates/"]
#[include = "*.html"]
struct TemplateAssets;

/// Renders named templates with Tera
pub struct TemplateEngine {
    tera: Tera,
}

impl std::fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateEngine")
            .field("templates", &self.template_names())
            .finish()
    }
}

impl TemplateEngine {
    /// Load the embedded templates
    pub fn new() -> Result<Self, TemplateError> {
        let mut templates = Vec::new();
        for name in TemplateAssets::iter() {
            let file = TemplateAssets::get(&name)
                .ok_or_else(|| TemplateError::NotFound(name.to_string()))?;
            let content = String::from_utf8(file.data.into_owned()).map_err(|e| {
                TemplateError::LoadError {
                    name: name.to_string(),
                    message: e.to_string(),
                }
            })?;
            templates.push((name.replace('\\', "/"), content));
        }

        let engine = Self::from_sources(templates)?;
        tracing::debug!("Loaded {} templates", engine.tera.get_template_names().count());
        Ok(engine)
    }

    /// Build an engine from `(name, source)` pairs
    pub fn from_sources<I, N, S>(templates: I) -> Result<Self, TemplateError>
    where
        I: IntoIterator<Item = (N, S)>,
        N: Into<String>,
        S: Into<String>,
    {
        let mut templates: Vec<(String, String)> = templates
            .into_iter()
            .map(|(name, source)| (name.into(), source.into()))
            .collect();

        // Base templates first
        templates.sort_by(|a, b| {
            let a_is_base = a.0 == "base.html" || a.0.ends_with("/base.html");
            let b_is_base = b.0 == "base.html" || b.0.ends_with("/base.html");
            b_is_base.cmp(&a_is_base).then_with(|| a.0.cmp(&b.0))
        });

        let mut tera = Tera::default();
        tera.add_raw_templates(templates.iter().map(|(n, s)| (n.as_str(), s.as_str())))
            .map_err(|e| TemplateError::LoadError {
                name: "templates".to_string(),
                message: error_chain(&e),
            })?;

        Ok(Self { tera })
    }

    /// Render a template with context
    pub fn render(&self, template: &str, context: &TeraContext) -> Result<String, TemplateError> {
        if !self.has_template(template) {
            return Err(TemplateError::NotFound(template.to_string()));
        }

        self.tera
            .render(template, context)
            .map_err(|e| TemplateError::RenderError(format!("Failed to render '{}': {}", template, error_chain(&e))))
    }

    /// Render a template, falling back to a bare error page when it fails.
    ///
    /// The failure is logged; the returned page never shows its details.
    pub fn render_with_fallback(&self, template: &str, context: &TeraContext) -> String {
        match self.render(template, context) {
            Ok(html) => html,
            Err(e) => {
                tracing::error!("{}", e);
                simple_error_page()
            }
        }
    }

    pub fn has_template(&self, template: &str) -> bool {
        self.tera.get_template_names().any(|name| name == template)
    }

    /// Names of all registered templates, sorted
    pub fn template_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tera.get_template_names().map(String::from).collect();
        names.sort();
        names
    }
}

fn error_chain(e: &tera::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(s) = source {
        message.push_str(&format!("\n  Caused by: {}", s));
        source = s.source();
    }
    message
}

/// Last-resort page when even the error template cannot be rendered
fn simple_error_page() -> String {
    r#"<!DOCTYPE html>
<html lang="ru">
<head>
    <meta charset="UTF-8">
    <title>Server error</title>
</head>
<body>
    <h1>Server error</h1>
    <p>Something went wrong. Please try again later.</p>
</body>
</html>"#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGES: [&str; 10] = [
        "posts/index.html",
        "posts/group_list.html",
        "posts/profile.html",
        "posts/post_detail.html",
        "posts/create_post.html",
        "users/login.html",
        "users/signup.html",
        "users/logged_out.html",
        "core/404.html",
        "core/500.html",
    ];

    #[test]
    fn test_embedded_templates_load() {
        let engine = TemplateEngine::new().unwrap();
        for page in PAGES {
            assert!(engine.has_template(page), "missing template {}", page);
        }
        assert!(engine.has_template("base.html"));
    }

    #[test]
    fn test_body_names_the_page_unescaped() {
        let engine = TemplateEngine::new().unwrap();
        let mut ctx = TeraContext::new();
        ctx.insert("template_name", "core/404.html");
        ctx.insert("is_authenticated", &false);
        ctx.insert("path", "/nowhere/");

        let html = engine.render("core/404.html", &ctx).unwrap();
        assert!(html.contains(r#"<body data-page="core/404.html">"#));
    }

    #[test]
    fn test_inheritance_resolves_regardless_of_order() {
        let engine = TemplateEngine::from_sources(vec![
            ("child.html", r#"{% extends "base.html" %}{% block body %}<p>{{ name }}</p>{% endblock %}"#),
            ("base.html", "<main>{% block body %}{% endblock %}</main>"),
        ])
        .unwrap();

        let mut ctx = TeraContext::new();
        ctx.insert("name", "Leo");
        assert_eq!(engine.render("child.html", &ctx).unwrap(), "<main><p>Leo</p></main>");
    }

    #[test]
    fn test_render_escapes_html() {
        let engine = TemplateEngine::from_sources(vec![("t.html", "{{ text }}")]).unwrap();
        let mut ctx = TeraContext::new();
        ctx.insert("text", "<script>");

        assert_eq!(engine.render("t.html", &ctx).unwrap(), "&lt;script&gt;");
    }

    #[test]
    fn test_unknown_template() {
        let engine = TemplateEngine::from_sources(Vec::<(String, String)>::new()).unwrap();
        assert!(matches!(
            engine.render("nope.html", &TeraContext::new()),
            Err(TemplateError::NotFound(_))
        ));
    }

    #[test]
    fn test_fallback_hides_render_error() {
        let engine = TemplateEngine::from_sources(vec![("t.html", "{{ missing.field }}")]).unwrap();

        let html = engine.render_with_fallback("t.html", &TeraContext::new());
        assert!(html.contains("Server error"));
        assert!(!html.contains("missing"));
    }

    #[test]
    fn test_broken_template_fails_to_load() {
        let result = TemplateEngine::from_sources(vec![("bad.html", "{% if %}")]);
        assert!(matches!(result, Err(TemplateError::LoadError { .. })));
    }
}
