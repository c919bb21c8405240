//! Lexer, parser, AST and diagnostics for the LML language.
//!
//! LML is a small statically-typed scripting language whose programs can
//! embed verbatim foreign-language code blocks as first-class expressions:
//!
//! ```text
//! int limit = 10;
//! str out = <py count={limit}>return "x" * count</py>;
//! print(out);
//! ```
//!
//! This crate covers the front half of the pipeline:
//!
//! ```text
//! source text ──► Lexer ──► tokens ──► Parser ──► AST
//! ```
//!
//! Static analysis and execution live in `lml-runtime`; this crate also
//! defines the type descriptors, function signatures and diagnostics those
//! stages share.

pub mod ast;
pub mod diagnostic;
pub mod lexer;
pub mod parser;
pub mod signature;
pub mod token;
pub mod types;

pub use ast::Program;
pub use diagnostic::{strip_ansi, Diagnostic};
pub use lexer::Lexer;
pub use parser::parse;
pub use signature::{Param, Signature};
pub use token::{Pos, Span, Token, TokenKind};
pub use types::Type;
