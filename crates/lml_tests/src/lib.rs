//! Integration tests for the LML pipeline.
//!
//! The suites live under `tests/`; each drives the real lexer → parser →
//! scanner → interpreter path over literal LML sources. This library
//! target exists only to anchor the crate.
