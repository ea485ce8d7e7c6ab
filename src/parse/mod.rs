//! # Egg's Parser Runtime
//!
//! This module is the substrate both for egg's own grammar parser and for the
//! parsers it generates: a stream-backed [`ParseState`] buffer with
//! forward-only retention, and the primitive matchers everything else is
//! built from.
//!
//! Generated parsers reference this module as `egg::parse` and nothing else.

mod buffer;
mod matchers;

pub use buffer::*;
pub use matchers::*;
