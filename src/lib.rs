//! # Egg
//!
//! Egg is a parser generator for Parsing Expression Grammars (PEGs). It
//! reads a grammar describing a PEG — rules, matchers, semantic actions,
//! typed return values — and emits a self-contained Rust module providing
//! one matching function per grammar rule.
//!
//! The pipeline: an input stream feeds the [`parse`] runtime buffer, the
//! [`compiler`] reads it into an [`ast::Grammar`] (optionally normalized in
//! place), and the [`generators`] walk the tree to emit either the Rust
//! parser or the grammar back in Egg syntax. The [`parse`] module doubles as
//! the runtime that generated parsers link against.

pub mod ast;
pub mod compiler;
pub mod generators;
pub mod parse;
