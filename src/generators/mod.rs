//! # Egg's Generators
//!
//! Back ends over the grammar tree: [`rust`] emits the self-contained Rust
//! parser module for a grammar, and [`egg`] prints a grammar back in Egg
//! syntax for debugging.

pub mod egg;
pub mod rust;
