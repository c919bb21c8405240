//! Runtime error type shared by the interpreter, orchestrator glue and
//! standard library.
//!
//! A [`RuntimeError`] carries an optional source location. Locations are
//! attached at the innermost frame that knows one and survive wrapping:
//! [`RuntimeError::at`] never overwrites an existing span.

use lml_language::{Diagnostic, Span};

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeError {
    pub message: String,
    pub span: Option<Span>,
    pub hint: Option<String>,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: None,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Attaches a location unless one is already present.
    pub fn at(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    /// Converts into a renderable diagnostic.
    pub fn into_diagnostic(self) -> Diagnostic {
        let mut diag = Diagnostic::new(self.message, self.span.unwrap_or_default());
        diag.hint = self.hint;
        diag
    }
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.span {
            Some(span) => write!(f, "{} at {}", self.message, span.start),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for RuntimeError {}

#[cfg(test)]
mod tests {
    use super::*;
    use lml_language::Pos;

    #[test]
    fn at_does_not_overwrite_inner_location() {
        let inner = Span::new(Pos::new(3, 1), Pos::new(3, 5));
        let outer = Span::new(Pos::new(9, 1), Pos::new(9, 5));
        let err = RuntimeError::new("boom").at(inner).at(outer);
        assert_eq!(err.span, Some(inner));
    }
}
