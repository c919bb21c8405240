//! Structured diagnostics with source-anchored rendering.
//!
//! A [`Diagnostic`] carries a message, the source range it points at, and an
//! optional hint. Rendering produces a multi-line block:
//!
//! ```text
//! Error: Type Mismatch: Expected 'dbl', got 'int'
//!  --> 2:9
//!   |
//! 2 | dbl b = a / 3;
//!   |         ^^^^^
//!   = hint: Use double() conversion.
//! ```
//!
//! Each part of the block has a fixed color role (header, gutter, caret,
//! hint label); [`strip_ansi`] removes the escapes for log files and for
//! deterministic comparison in tests.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::token::Span;

static ANSI_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new("\x1b\\[[0-9;]*m").expect("valid ansi pattern"));

/// Removes ANSI color escapes from rendered output.
pub fn strip_ansi(text: &str) -> String {
    ANSI_PATTERN.replace_all(text, "").into_owned()
}

// Color roles of the rendered block. The palette is fixed: the `Error:`
// header is bold red, the message bold, the gutter blue, the caret
// underline red, the hint label cyan.
const RESET: &str = "\x1b[0m";

fn header(text: &str) -> String {
    format!("\x1b[1m\x1b[31m{}{}", text, RESET)
}

fn emphasis(text: &str) -> String {
    format!("\x1b[1m{}{}", text, RESET)
}

fn gutter(text: &str) -> String {
    format!("\x1b[34m{}{}", text, RESET)
}

fn caret(text: &str) -> String {
    format!("\x1b[31m{}{}", text, RESET)
}

fn hint_label(text: &str) -> String {
    format!("\x1b[36m{}{}", text, RESET)
}

/// A structured error with a message, source location and optional hint.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub message: String,
    pub span: Span,
    pub hint: Option<String>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Renders the diagnostic against the source it was produced from.
    ///
    /// The caret underline spans the diagnostic's columns on its start line;
    /// ranges that continue past the line end are clamped to it.
    pub fn render(&self, source: &str) -> String {
        let line_no = self.span.start.line as usize;
        let col = self.span.start.col as usize;
        let source_line = source.lines().nth(line_no.saturating_sub(1)).unwrap_or("");

        let line_label = line_no.to_string();
        let pad = " ".repeat(line_label.len());

        let line_chars = source_line.chars().count();
        let caret_len = if self.span.end.line == self.span.start.line {
            (self.span.end.col as usize).saturating_sub(col).max(1)
        } else {
            (line_chars + 1).saturating_sub(col).max(1)
        };
        let caret_len = caret_len.min((line_chars + 1).saturating_sub(col).max(1));

        let mut out = String::new();
        out.push_str(&format!(
            "{} {}\n",
            header("Error:"),
            emphasis(&self.message)
        ));
        out.push_str(&format!(
            "{}{} {}\n",
            pad,
            gutter("-->"),
            self.span.start
        ));
        out.push_str(&format!("{} {}\n", pad, gutter("|")));
        out.push_str(&format!(
            "{} {} {}\n",
            gutter(&line_label),
            gutter("|"),
            source_line
        ));
        out.push_str(&format!(
            "{} {} {}{}\n",
            pad,
            gutter("|"),
            " ".repeat(col.saturating_sub(1)),
            caret(&"^".repeat(caret_len))
        ));
        if let Some(hint) = &self.hint {
            out.push_str(&format!(
                "{} {} {}\n",
                pad,
                hint_label("= hint:"),
                hint
            ));
        }
        out
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.message, self.span.start)
    }
}

impl std::error::Error for Diagnostic {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Pos;

    #[test]
    fn render_points_at_offending_range() {
        let source = "int a = 10;\ndbl b = a / 3;\n";
        let diag = Diagnostic::new(
            "Type Mismatch: Expected 'dbl', got 'int'",
            Span::new(Pos::new(2, 9), Pos::new(2, 14)),
        )
        .with_hint("Use double() conversion.");

        let plain = strip_ansi(&diag.render(source));
        let lines: Vec<&str> = plain.lines().collect();
        assert_eq!(lines[0], "Error: Type Mismatch: Expected 'dbl', got 'int'");
        assert_eq!(lines[1], " --> 2:9");
        assert_eq!(lines[3], "2 | dbl b = a / 3;");
        assert_eq!(lines[4], "  |         ^^^^^");
        assert_eq!(lines[5], " = hint: Use double() conversion.");
    }

    #[test]
    fn render_colors_by_role_and_strips_for_logs() {
        let source = "int a = nope;";
        let diag = Diagnostic::new(
            "Unknown Identifier: 'nope' is not defined",
            Span::new(Pos::new(1, 9), Pos::new(1, 13)),
        )
        .with_hint("Declare it first.");

        let colored = diag.render(source);
        // Header red, gutter blue, hint label cyan; the source line itself
        // stays unpainted.
        assert!(colored.contains("\x1b[31mError:"));
        assert!(colored.contains("\x1b[34m-->"));
        assert!(colored.contains("\x1b[36m= hint:"));
        assert!(colored.contains("int a = nope;"));
        assert!(!colored.contains("\x1b[31mint a"));

        let plain = strip_ansi(&colored);
        assert!(!plain.contains('\x1b'));
    }

    #[test]
    fn render_clamps_caret_to_line_end() {
        let source = "int x = 1;";
        let diag = Diagnostic::new(
            "Unexpected token",
            Span::new(Pos::new(1, 9), Pos::new(3, 2)),
        );
        let plain = strip_ansi(diag.render(source).as_str());
        // 1-based col 9 on a 10-char line leaves room for two carets.
        assert!(plain.contains("\n  |         ^^\n"));
    }

    #[test]
    fn hint_line_is_omitted_without_a_hint() {
        let source = "int x = 1;";
        let diag = Diagnostic::new("Unexpected token", Span::new(Pos::new(1, 1), Pos::new(1, 4)));
        let plain = strip_ansi(&diag.render(source));
        assert!(!plain.contains("= hint:"));
        assert_eq!(plain.lines().count(), 5);
    }
}
