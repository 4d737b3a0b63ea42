use serde::Serialize;

use crate::ast::SourceSpan;
use crate::lexer::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub level: DiagnosticLevel,
    pub span: Option<SourceSpan>,
    /// File the diagnostic points into; differs from the compiled file for `uses` units.
    pub file: Option<String>,
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn push_in_file<S: Into<String>>(&mut self, file: &str, message: S, span: SourceSpan) {
        self.entries.push(Diagnostic {
            message: message.into(),
            level: DiagnosticLevel::Error,
            span: Some(span),
            file: Some(file.to_string()),
        });
    }

    pub fn push_token_error<S: Into<String>>(&mut self, token: &Token, message: S) {
        self.push_in_file(&token.file, message, token.span());
    }

    pub fn push_token_warning<S: Into<String>>(&mut self, token: &Token, message: S) {
        self.entries.push(Diagnostic {
            message: message.into(),
            level: DiagnosticLevel::Warning,
            span: Some(token.span()),
            file: Some(token.file.to_string()),
        });
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|diagnostic| diagnostic.level == DiagnosticLevel::Error)
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
