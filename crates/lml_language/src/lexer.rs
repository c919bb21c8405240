//! Stateful lexer for LML source text.
//!
//! The lexer transforms a UTF-8 source string into a finite token sequence
//! terminated by `Eof`. Most of it is a conventional cursor scanner; the
//! distinguishing part is the explicit state machine that recognizes
//! embedded-code blocks:
//!
//! ```text
//!            '<' followed by letter or '_'
//! Normal ───────────────────────────────► TagHeader
//!    ▲                                        │
//!    │                                        │ '>' closing the opener
//!    │  matching '</name>' found              ▼
//!    └──────────────────────────────────── TagBody
//! ```
//!
//! In `TagBody` the lexer emits one `TagBody` token holding the raw slice
//! between the opener's `>` and the matching `</name>`, copied verbatim
//! including whitespace and nested `<`/`>` characters. The closing tag
//! itself is then lexed as ordinary tokens for the parser to check.
//!
//! `<` and `>` double as comparison operators; the current state, the next
//! character's class and (for `array<T>` types) the previous token decide
//! which meaning applies.

use crate::diagnostic::Diagnostic;
use crate::token::{Pos, Span, Token, TokenKind};

/// Lexer states for embedded-code recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
    Normal,
    TagHeader,
    TagBody,
}

/// Cursor-based scanner producing [`Token`]s with 1-based positions.
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    col: u32,
    state: LexState,
    /// Name of the tag whose header or body is being lexed.
    tag_name: String,
    /// True between the tag's `<` and its name identifier.
    awaiting_tag_name: bool,
    /// Brace nesting inside a tag header; `>` only closes at depth 0.
    brace_depth: usize,
    /// Kind of the previously emitted token. `array<T>` reuses `<`, so a
    /// `<` right after the `array` keyword never opens a tag.
    prev_kind: Option<TokenKind>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            state: LexState::Normal,
            tag_name: String::new(),
            awaiting_tag_name: false,
            brace_depth: 0,
            prev_kind: None,
        }
    }

    /// Tokenizes the whole input, failing on the first lexical error.
    pub fn tokenize(source: &str) -> Result<Vec<Token>, Diagnostic> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token()?;
            lexer.prev_kind = Some(token.kind);
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn position(&self) -> Pos {
        Pos::new(self.line, self.col)
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.advance();
        }
    }

    fn next_token(&mut self) -> Result<Token, Diagnostic> {
        if self.state == LexState::TagBody {
            return Ok(self.lex_tag_body());
        }

        self.skip_whitespace();
        let start = self.position();

        let Some(ch) = self.peek() else {
            return Ok(Token::new(TokenKind::Eof, "", Span::at(start)));
        };

        if ch.is_ascii_alphabetic() || ch == '_' {
            return Ok(self.lex_word(start));
        }
        if ch.is_ascii_digit() {
            return Ok(self.lex_number(start));
        }
        if ch == '"' || ch == '\'' {
            return self.lex_string(start);
        }
        self.lex_operator(start)
    }

    /// Identifier, keyword or boolean literal.
    fn lex_word(&mut self, start: Pos) -> Token {
        let mut word = String::new();
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            word.push(self.advance().unwrap());
        }
        let span = Span::new(start, self.position());

        if self.state == LexState::TagHeader && self.awaiting_tag_name {
            self.tag_name = word.clone();
            self.awaiting_tag_name = false;
            return Token::new(TokenKind::Ident, word, span);
        }

        match TokenKind::keyword(&word) {
            Some(kind) => Token::new(kind, word, span),
            None => Token::new(TokenKind::Ident, word, span),
        }
    }

    /// Integer or double literal; a `.` followed by a digit makes a double.
    fn lex_number(&mut self, start: Pos) -> Token {
        let mut text = String::new();
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            text.push(self.advance().unwrap());
        }
        let is_double = self.peek() == Some('.')
            && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit());
        if is_double {
            text.push(self.advance().unwrap());
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                text.push(self.advance().unwrap());
            }
        }
        let kind = if is_double { TokenKind::Dbl } else { TokenKind::Int };
        Token::new(kind, text, Span::new(start, self.position()))
    }

    /// Quoted string; characters pass through verbatim, no escape handling.
    fn lex_string(&mut self, start: Pos) -> Result<Token, Diagnostic> {
        let quote = self.advance().unwrap();
        let mut text = String::new();
        loop {
            match self.advance() {
                Some(c) if c == quote => break,
                Some(c) => text.push(c),
                None => {
                    return Err(Diagnostic::new(
                        "Unterminated string literal",
                        Span::new(start, self.position()),
                    ));
                }
            }
        }
        Ok(Token::new(
            TokenKind::Str,
            text,
            Span::new(start, self.position()),
        ))
    }

    fn lex_operator(&mut self, start: Pos) -> Result<Token, Diagnostic> {
        let ch = self.advance().unwrap();
        let kind = match ch {
            '{' => {
                if self.state == LexState::TagHeader {
                    self.brace_depth += 1;
                }
                TokenKind::LBrace
            }
            '}' => {
                if self.state == LexState::TagHeader {
                    self.brace_depth = self.brace_depth.saturating_sub(1);
                }
                TokenKind::RBrace
            }
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '.' => TokenKind::Dot,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semi,
            ':' => TokenKind::Colon,
            '~' => TokenKind::Tilde,
            '%' => TokenKind::Percent,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '+' => {
                if self.peek() == Some('+') {
                    self.advance();
                    TokenKind::PlusPlus
                } else {
                    TokenKind::Plus
                }
            }
            '-' => {
                if self.peek() == Some('-') {
                    self.advance();
                    TokenKind::MinusMinus
                } else {
                    TokenKind::Minus
                }
            }
            '=' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::EqEq
                } else if self.peek() == Some('>') {
                    self.advance();
                    TokenKind::Arrow
                } else {
                    TokenKind::Assign
                }
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                }
            }
            '&' => {
                if self.peek() == Some('&') {
                    self.advance();
                    TokenKind::AndAnd
                } else {
                    return Err(self.unexpected(ch, start));
                }
            }
            '|' => {
                if self.peek() == Some('|') {
                    self.advance();
                    TokenKind::OrOr
                } else {
                    return Err(self.unexpected(ch, start));
                }
            }
            '<' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::LtEq
                } else if self.state == LexState::Normal
                    && self.prev_kind != Some(TokenKind::TyArray)
                    && matches!(self.peek(), Some(c) if c.is_ascii_alphabetic() || c == '_')
                {
                    self.state = LexState::TagHeader;
                    self.awaiting_tag_name = true;
                    self.brace_depth = 0;
                    TokenKind::Lt
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.state == LexState::TagHeader && self.brace_depth == 0 {
                    self.state = LexState::TagBody;
                    TokenKind::Gt
                } else if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            other => return Err(self.unexpected(other, start)),
        };
        Ok(Token::new(kind, self.slice_from(start), Span::new(start, self.position())))
    }

    /// Raw body of the current tag, up to (not including) its `</name>`.
    ///
    /// The closing sequence is left in the input so the parser sees it as
    /// ordinary tokens. An unterminated body consumes to end of input.
    fn lex_tag_body(&mut self) -> Token {
        let start = self.position();
        let closing: Vec<char> = format!("</{}>", self.tag_name).chars().collect();
        let mut body = String::new();
        let mut end = self.position();

        loop {
            if self.lookahead_matches(&closing) {
                self.state = LexState::Normal;
                break;
            }
            match self.advance() {
                Some(c) => {
                    body.push(c);
                    end = self.position();
                }
                None => {
                    // Unterminated body: emit what accumulated.
                    self.state = LexState::Normal;
                    break;
                }
            }
        }
        Token::new(TokenKind::TagBody, body, Span::new(start, end))
    }

    fn lookahead_matches(&self, expected: &[char]) -> bool {
        for (i, &c) in expected.iter().enumerate() {
            if self.peek_at(i) != Some(c) {
                return false;
            }
        }
        true
    }

    /// Reconstructs the lexeme between `start` and the cursor.
    ///
    /// Operators never span lines, so the column distance is the length.
    fn slice_from(&self, start: Pos) -> String {
        let len = (self.col - start.col) as usize;
        self.chars[self.pos - len..self.pos].iter().collect()
    }

    fn unexpected(&self, ch: char, start: Pos) -> Diagnostic {
        Diagnostic::new(
            format!("Unexpected character '{}'", ch),
            Span::new(start, self.position()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source)
            .expect("lexes")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_declaration_tokens() {
        assert_eq!(
            kinds("int a = 10;"),
            vec![
                TokenKind::TyInt,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Int,
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn distinguishes_int_from_double() {
        let tokens = Lexer::tokenize("1 2.5 3. 0.25").expect("lexes");
        assert_eq!(tokens[0].kind, TokenKind::Int);
        assert_eq!(tokens[1].kind, TokenKind::Dbl);
        assert_eq!(tokens[1].lexeme, "2.5");
        // "3." is an int followed by a dot.
        assert_eq!(tokens[2].kind, TokenKind::Int);
        assert_eq!(tokens[3].kind, TokenKind::Dot);
        assert_eq!(tokens[4].kind, TokenKind::Dbl);
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = Lexer::tokenize("int a;\n  dbl b;").expect("lexes");
        assert_eq!(tokens[0].span.start, Pos::new(1, 1));
        assert_eq!(tokens[0].span.end, Pos::new(1, 4));
        assert_eq!(tokens[3].span.start, Pos::new(2, 3));
    }

    #[test]
    fn lexes_compound_operators() {
        assert_eq!(
            kinds("== != <= >= && || ++ -- => ~"),
            vec![
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::Arrow,
                TokenKind::Tilde,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn string_literals_pass_through() {
        let tokens = Lexer::tokenize("\"a 'quoted' text\" 'single'").expect("lexes");
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(tokens[0].lexeme, "a 'quoted' text");
        assert_eq!(tokens[1].lexeme, "single");
    }

    #[test]
    fn unterminated_string_reports_position() {
        let err = Lexer::tokenize("str s = \"abc").expect_err("should fail");
        assert!(err.message.contains("Unterminated string"));
        assert_eq!(err.span.start, Pos::new(1, 9));
    }

    #[test]
    fn unexpected_character_reports_position() {
        let err = Lexer::tokenize("int a = @;").expect_err("should fail");
        assert!(err.message.contains("Unexpected character '@'"));
        assert_eq!(err.span.start, Pos::new(1, 9));
    }

    #[test]
    fn tag_body_is_verbatim() {
        let tokens = Lexer::tokenize("<py>return 1 < 2</py>;").expect("lexes");
        let body = tokens
            .iter()
            .find(|t| t.kind == TokenKind::TagBody)
            .expect("has body");
        assert_eq!(body.lexeme, "return 1 < 2");
        // Closing tag is lexed as ordinary tokens.
        let tail: Vec<TokenKind> = tokens
            .iter()
            .skip_while(|t| t.kind != TokenKind::TagBody)
            .skip(1)
            .map(|t| t.kind)
            .collect();
        assert_eq!(
            tail,
            vec![
                TokenKind::Lt,
                TokenKind::Slash,
                TokenKind::Ident,
                TokenKind::Gt,
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tag_body_keeps_whitespace_and_angles() {
        let source = "<sh>\n  if [ 1 -lt 2 ]; then\n    echo \"<ok>\"\n  fi\n</sh>;";
        let tokens = Lexer::tokenize(source).expect("lexes");
        let body = tokens
            .iter()
            .find(|t| t.kind == TokenKind::TagBody)
            .expect("has body");
        assert_eq!(body.lexeme, "\n  if [ 1 -lt 2 ]; then\n    echo \"<ok>\"\n  fi\n");
    }

    #[test]
    fn tag_attributes_lex_inside_header() {
        let tokens = Lexer::tokenize("<py timeout={3 > 2}>x</py>;").expect("lexes");
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        // The `>` inside the attribute braces is a comparison, not the
        // header close; only the depth-0 `>` starts the body.
        assert_eq!(
            &kinds[..11],
            &[
                TokenKind::Lt,
                TokenKind::Ident,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::LBrace,
                TokenKind::Int,
                TokenKind::Gt,
                TokenKind::Int,
                TokenKind::RBrace,
                TokenKind::Gt,
                TokenKind::TagBody,
            ]
        );
        let body = &tokens[10];
        assert_eq!(body.lexeme, "x");
    }

    #[test]
    fn unterminated_tag_body_consumes_to_eof() {
        let tokens = Lexer::tokenize("<py>return 1").expect("lexes");
        let body = tokens
            .iter()
            .find(|t| t.kind == TokenKind::TagBody)
            .expect("has body");
        assert_eq!(body.lexeme, "return 1");
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn comparison_with_space_stays_normal() {
        assert_eq!(
            kinds("a < b;"),
            vec![
                TokenKind::Ident,
                TokenKind::Lt,
                TokenKind::Ident,
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn array_type_angles_do_not_open_a_tag() {
        assert_eq!(
            kinds("array<int> xs = [];"),
            vec![
                TokenKind::TyArray,
                TokenKind::Lt,
                TokenKind::TyInt,
                TokenKind::Gt,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::Semi,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn nested_closing_of_other_tag_stays_in_body() {
        let tokens = Lexer::tokenize("<py>a</px></py>;").expect("lexes");
        let body = tokens
            .iter()
            .find(|t| t.kind == TokenKind::TagBody)
            .expect("has body");
        assert_eq!(body.lexeme, "a</px>");
    }
}
