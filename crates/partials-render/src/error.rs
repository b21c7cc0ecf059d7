//! Error types for partial rendering.
//!
//! This module provides [`RenderError`], the error type for every fallible
//! operation in the crate. Template failures keep the original
//! [`minijinja::Error`] so callers can inspect its kind, line and source.

use thiserror::Error;

/// Error type for partial rendering operations.
///
/// Template resolution and evaluation failures are not interpreted: the
/// engine's error is carried unchanged, only classified by kind.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The template reference does not resolve to a template.
    #[error("template not found: {0}")]
    TemplateNotFound(#[source] minijinja::Error),

    /// Template syntax error or failure while evaluating the template.
    #[error("template error: {0}")]
    Template(#[source] minijinja::Error),

    /// The render context is not a mapping or contains an invalid name.
    #[error("invalid render context: {0}")]
    Context(String),

    /// Invalid configuration (bad YAML, zero workers, bad function name).
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error (e.g., reading a config file or a template directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The render worker pool could not start or lost a job.
    #[error("render worker error: {0}")]
    Worker(String),
}

impl RenderError {
    /// Returns the underlying engine error for template failures.
    pub fn template_error(&self) -> Option<&minijinja::Error> {
        match self {
            RenderError::TemplateNotFound(err) | RenderError::Template(err) => Some(err),
            _ => None,
        }
    }

    /// Whether this error is a template resolution failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RenderError::TemplateNotFound(_))
    }
}

impl From<minijinja::Error> for RenderError {
    fn from(err: minijinja::Error) -> Self {
        match err.kind() {
            minijinja::ErrorKind::TemplateNotFound => RenderError::TemplateNotFound(err),
            _ => RenderError::Template(err),
        }
    }
}

impl From<serde_yaml::Error> for RenderError {
    fn from(err: serde_yaml::Error) -> Self {
        RenderError::Config(err.to_string())
    }
}
