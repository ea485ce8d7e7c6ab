use std::error::Error;
use std::fmt;

/// Defect found in a parsed grammar that would make generation produce
/// broken output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    /// Two rules share a name; only the later one is reachable by name
    DuplicateRule(String),
    /// A rule body invokes a rule that is never declared
    UndefinedRule {
        /// Rule whose body holds the reference
        rule: String,
        /// Name the reference fails to resolve
        referenced: String,
    },
}

impl fmt::Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::DuplicateRule(name) => {
                write!(f, "rule `{}` is declared more than once", name)
            }
            Self::UndefinedRule { rule, referenced } => {
                write!(
                    f,
                    "rule `{}` references undeclared rule `{}`",
                    rule, referenced
                )
            }
        }
    }
}

impl Error for GrammarError {}
