//! Error and diagnostic types

use std::fmt;
use std::path::PathBuf;

use ariadne::{Config, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// A human-readable message returned in place of rendered output.
///
/// Once a stage produces a diagnostic the pipeline stops and hands it back
/// to the caller unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic(String);

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Diagnostic {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for Diagnostic {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

impl From<Diagnostic> for String {
    fn from(diagnostic: Diagnostic) -> Self {
        diagnostic.0
    }
}

impl PartialEq<&str> for Diagnostic {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Pick the hook's message when it produced a non-empty one
pub(crate) fn non_empty(message: Option<String>) -> Option<String> {
    message.filter(|m| !m.is_empty())
}

/// Errors raised while importing a template module
#[derive(Debug, Error)]
pub enum ImportError {
    /// No module is known under the locator
    #[error("module not found: {locator}")]
    NotFound { locator: String },

    /// The locator points outside of the loader's module root
    #[error("locator escapes module root: {locator}")]
    OutsideRoot { locator: String },

    /// Error reading the module file
    #[error("error reading module file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The module file is not valid TOML
    #[error("invalid module file: {0}")]
    Toml(#[from] toml::de::Error),

    /// A text template inside the module does not parse
    #[error("template {name}: {error}")]
    Syntax {
        name: String,
        text: String,
        #[source]
        error: TemplateSyntaxError,
    },
}

impl ImportError {
    /// Describe the error, with source context for template syntax errors
    pub fn report(&self, locator: &str) -> String {
        match self {
            Self::Syntax { name, text, error } => error.format(text, &format!("{}#{}", locator, name)),
            other => other.to_string(),
        }
    }
}

/// Errors raised by a producer while rendering
#[derive(Debug, Error)]
pub enum ProduceError {
    #[error("{0}")]
    Message(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProduceError {
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

/// A text template that does not parse
#[derive(Debug, Clone, Error)]
#[error("template syntax error at {span:?}: {message}")]
pub struct TemplateSyntaxError {
    pub span: Span,
    pub message: String,
}

impl TemplateSyntaxError {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }

    /// Format the error with source context using ariadne
    ///
    /// Output is uncolored so it can be embedded in diagnostics.
    pub fn format(&self, source: &str, filename: &str) -> String {
        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, self.span.start)
            .with_config(Config::default().with_color(false))
            .with_message(&self.message)
            .with_label(Label::new((filename, self.span.clone())).with_message(&self.message))
            .finish()
            .write((filename, Source::from(source)), &mut buf);
        if written.is_err() {
            return self.to_string();
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}
