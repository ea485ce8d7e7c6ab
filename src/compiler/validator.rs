use super::errors::GrammarError;
use crate::ast::{Grammar, Matcher};
use std::collections::HashSet;

/// Check a parsed grammar for defects generation cannot survive.
///
/// The parser itself accepts duplicate rule names (the later one wins the
/// name index) and undefined rule references (the generated code would fail
/// to compile); this pass reports both before any code is emitted.
pub fn validate(grammar: &Grammar) -> Result<(), GrammarError> {
    let mut seen = HashSet::new();
    for rule in grammar.rules() {
        if !seen.insert(rule.name.as_str()) {
            return Err(GrammarError::DuplicateRule(rule.name.clone()));
        }
    }

    for rule in grammar.rules() {
        check_references(grammar, &rule.name, &rule.body)?;
    }

    Ok(())
}

/// Walk a rule body and ensure every rule reference resolves in the index.
fn check_references(
    grammar: &Grammar,
    rule: &str,
    matcher: &Matcher,
) -> Result<(), GrammarError> {
    match matcher {
        Matcher::Rule { name, .. } => {
            if grammar.get(name).is_none() {
                return Err(GrammarError::UndefinedRule {
                    rule: rule.to_string(),
                    referenced: name.clone(),
                });
            }
            Ok(())
        }

        Matcher::Opt(m)
        | Matcher::Many(m)
        | Matcher::Some(m)
        | Matcher::Look(m)
        | Matcher::Not(m)
        | Matcher::Capt(m) => check_references(grammar, rule, m),

        Matcher::Seq(children) | Matcher::Alt(children) => {
            for child in children {
                check_references(grammar, rule, child)?;
            }
            Ok(())
        }

        Matcher::Char(_)
        | Matcher::Str(_)
        | Matcher::Range(_)
        | Matcher::Any
        | Matcher::Empty
        | Matcher::Action(_) => Ok(()),
    }
}
