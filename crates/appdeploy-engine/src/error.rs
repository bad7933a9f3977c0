//! Engine error types with source-annotated diagnostics

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Main engine error type
#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Rendered output is not a manifest with both kind and metadata.name
    #[error("not a valid manifest: {reason}")]
    InvalidManifest { name: String, reason: String },
}

impl EngineError {
    pub fn invalid_manifest(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidManifest {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Error kind for categorizing template errors
///
/// Note: This enum is non-exhaustive - new variants may be added in future versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TemplateErrorKind {
    UndefinedVariable,
    UnknownFilter,
    UnknownFunction,
    SyntaxError,
    TypeError,
    InvalidOperation,
    Other,
}

/// Template-specific error with source information
#[derive(Error, Debug, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(code(appdeploy::template::render))]
pub struct TemplateError {
    /// Template (source item) name
    pub template: String,

    /// Error message
    pub message: String,

    /// Error kind for categorization
    pub kind: TemplateErrorKind,

    /// Template source code
    #[source_code]
    pub src: NamedSource<String>,

    /// Error location in source
    #[label("error occurred here")]
    pub span: Option<SourceSpan>,

    /// Suggestion for fixing the error
    #[help]
    pub suggestion: Option<String>,
}

impl TemplateError {
    /// Create a new template error from a MiniJinja error
    pub fn from_minijinja(err: minijinja::Error, template_name: &str, template_source: &str) -> Self {
        let kind = categorize(&err);
        let message = clean_message(&err);
        let span = err
            .line()
            .and_then(|line_num| calculate_span(template_source, line_num));

        Self {
            template: template_name.to_string(),
            message,
            kind,
            src: NamedSource::new(template_name, template_source.to_string()),
            span,
            suggestion: suggestion_for(kind),
        }
    }

    /// Create a simple error without source mapping
    pub fn simple(template_name: &str, message: impl Into<String>) -> Self {
        Self {
            template: template_name.to_string(),
            message: message.into(),
            kind: TemplateErrorKind::Other,
            src: NamedSource::new(template_name, String::new()),
            span: None,
            suggestion: None,
        }
    }

    /// Get the error kind
    pub fn kind(&self) -> TemplateErrorKind {
        self.kind
    }
}

/// Categorize a MiniJinja error into our error kinds
fn categorize(err: &minijinja::Error) -> TemplateErrorKind {
    match err.kind() {
        minijinja::ErrorKind::UndefinedError => TemplateErrorKind::UndefinedVariable,
        minijinja::ErrorKind::UnknownFilter => TemplateErrorKind::UnknownFilter,
        minijinja::ErrorKind::UnknownFunction => TemplateErrorKind::UnknownFunction,
        minijinja::ErrorKind::SyntaxError => TemplateErrorKind::SyntaxError,
        minijinja::ErrorKind::InvalidOperation => TemplateErrorKind::InvalidOperation,
        minijinja::ErrorKind::NonPrimitive | minijinja::ErrorKind::NonKey => {
            TemplateErrorKind::TypeError
        }
        _ => TemplateErrorKind::Other,
    }
}

fn clean_message(err: &minijinja::Error) -> String {
    let msg = match err.detail() {
        Some(detail) => format!("{}: {}", err.kind(), detail),
        None => err.kind().to_string(),
    };
    msg.replace("undefined value", "undefined variable")
}

/// Calculate the source span for a given line number
fn calculate_span(source: &str, line_num: usize) -> Option<miette::SourceSpan> {
    let mut offset = 0;

    for (index, line) in source.lines().enumerate() {
        if index + 1 == line_num {
            return Some(SourceSpan::new(offset.into(), line.len()));
        }
        offset += line.len() + 1;
    }

    None
}

fn suggestion_for(kind: TemplateErrorKind) -> Option<String> {
    match kind {
        TemplateErrorKind::UndefinedVariable => Some(
            "declare it in variables.yaml, pass it with --var key=value, or use variable(\"key\", default)"
                .to_string(),
        ),
        TemplateErrorKind::UnknownFilter => Some(
            "available filters: toyaml, tojson, b64encode, b64decode, quote, indent, nindent, required"
                .to_string(),
        ),
        TemplateErrorKind::UnknownFunction => Some(
            "available functions: variable, fail, list, dict, coalesce, ternary".to_string(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_span() {
        let source = "line one\nline two\nline three";
        let span = calculate_span(source, 2).unwrap();
        assert_eq!(span.offset(), 9);
        assert_eq!(span.len(), 8);
        assert!(calculate_span(source, 10).is_none());
    }

    #[test]
    fn test_invalid_manifest_display() {
        let err = EngineError::invalid_manifest("web.yaml", "missing kind");
        assert_eq!(err.to_string(), "not a valid manifest: missing kind");
        assert!(matches!(err, EngineError::InvalidManifest { ref name, .. } if name == "web.yaml"));
    }
}
