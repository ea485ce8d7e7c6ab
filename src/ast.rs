//! # Egg's Grammar Tree
//!
//! Data model for parsed grammars: matcher nodes, rules, and the grammar
//! itself. The tree is built by the [compiler](`crate::compiler`), optionally
//! rewritten in place by its normalizer, then traversed read-only by the
//! [generators](`crate::generators`).
//!
//! Matchers form a strict tree with owned children; rules refer to each other
//! by name through the grammar's index, never by node reference.

use std::collections::HashMap;

/// An inclusive byte range inside a character class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharRange {
    /// First byte in the range
    pub from: u8,
    /// Last byte in the range; equal to `from` for a single byte
    pub to: u8,
}

impl CharRange {
    /// Create a range covering `from..=to`.
    pub fn new(from: u8, to: u8) -> Self {
        Self { from, to }
    }

    /// Create a range covering exactly one byte.
    pub fn single(c: u8) -> Self {
        Self { from: c, to: c }
    }

    /// Does the range cover exactly one byte?
    pub fn is_single(&self) -> bool {
        self.from == self.to
    }
}

/// A node of the grammar tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Matcher {
    /// Match one byte equal to the payload
    Char(u8),
    /// Match the payload byte-for-byte
    Str(Vec<u8>),
    /// Match one byte in the union of the ranges, tested in order
    Range(Vec<CharRange>),
    /// Invoke a named rule, optionally binding its return value
    Rule {
        /// Name of the rule to invoke
        name: String,
        /// Variable to bind the rule's return to, if any
        binding: Option<String>,
    },
    /// Match any one byte except end-of-input
    Any,
    /// Match without consuming
    Empty,
    /// Verbatim target-language code; not a matcher in the parsing sense
    Action(String),
    /// Zero-or-one
    Opt(Box<Matcher>),
    /// Zero-or-more, greedy
    Many(Box<Matcher>),
    /// One-or-more, greedy
    Some(Box<Matcher>),
    /// Concatenation
    Seq(Vec<Matcher>),
    /// Ordered choice
    Alt(Vec<Matcher>),
    /// Positive lookahead; zero-width
    Look(Box<Matcher>),
    /// Negative lookahead; zero-width
    Not(Box<Matcher>),
    /// Capture of the matched substring, exposed to surrounding actions
    Capt(Box<Matcher>),
}

/// A named grammar rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Rule name; a valid identifier
    pub name: String,
    /// Verbatim return type, or `None` for rules returning no value
    pub ret_type: Option<String>,
    /// The rule's matcher body
    pub body: Matcher,
}

/// An Egg grammar: an ordered sequence of rules with a name index, plus the
/// verbatim `pre` and `post` blocks emitted around the generated code.
#[derive(Debug, Default)]
pub struct Grammar {
    rules: Vec<Rule>,
    index: HashMap<String, usize>,
    /// Verbatim block emitted before the generated rules
    pub pre: Option<String>,
    /// Verbatim block emitted after the generated rules
    pub post: Option<String>,
}

impl Grammar {
    /// Create an empty grammar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule and index it by name.
    ///
    /// A duplicate name overwrites the index entry but leaves the earlier
    /// rule in the ordered list; the validator reports duplicates before
    /// generation.
    pub fn push(&mut self, rule: Rule) {
        self.index.insert(rule.name.clone(), self.rules.len());
        self.rules.push(rule);
    }

    /// The rules, in declaration order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub(crate) fn rules_mut(&mut self) -> &mut [Rule] {
        &mut self.rules
    }

    /// Look a rule up by name.
    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.index.get(name).map(|&i| &self.rules[i])
    }
}
