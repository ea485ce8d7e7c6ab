//! Canonicalizing rewriter for grammar trees.
//!
//! Rewrites are semantics-preserving: ordered choice, greediness, and
//! failure points are unchanged. Actions are never altered and keep their
//! position between their sequence neighbours.

use crate::ast::{CharRange, Grammar, Matcher};

/// Rewrite every rule body of the grammar into canonical form.
pub fn normalize(grammar: &mut Grammar) {
    for rule in grammar.rules_mut() {
        let body = std::mem::replace(&mut rule.body, Matcher::Empty);
        rule.body = normalize_matcher(body);
    }
}

/// Rewrite one matcher tree bottom-up.
///
/// Applied rewrites: sequence and alternation flattening, adjacent literal
/// merging inside sequences, adjacent class merging inside alternations,
/// and trivial identity removal (`Opt`/`Many`/`Some`/`Look` of `Empty`,
/// zero-length strings). `Not(Empty)` is already the canonical always-fail
/// matcher and is left as is.
pub fn normalize_matcher(matcher: Matcher) -> Matcher {
    match matcher {
        Matcher::Str(s) if s.is_empty() => Matcher::Empty,
        leaf @ (Matcher::Char(_)
        | Matcher::Str(_)
        | Matcher::Range(_)
        | Matcher::Rule { .. }
        | Matcher::Any
        | Matcher::Empty
        | Matcher::Action(_)) => leaf,

        Matcher::Opt(m) => match normalize_matcher(*m) {
            Matcher::Empty => Matcher::Empty,
            m => Matcher::Opt(Box::new(m)),
        },
        Matcher::Many(m) => match normalize_matcher(*m) {
            Matcher::Empty => Matcher::Empty,
            m => Matcher::Many(Box::new(m)),
        },
        Matcher::Some(m) => match normalize_matcher(*m) {
            Matcher::Empty => Matcher::Empty,
            m => Matcher::Some(Box::new(m)),
        },
        Matcher::Look(m) => match normalize_matcher(*m) {
            Matcher::Empty => Matcher::Empty,
            m => Matcher::Look(Box::new(m)),
        },
        Matcher::Not(m) => Matcher::Not(Box::new(normalize_matcher(*m))),
        Matcher::Capt(m) => Matcher::Capt(Box::new(normalize_matcher(*m))),

        Matcher::Seq(children) => normalize_seq(children),
        Matcher::Alt(children) => normalize_alt(children),
    }
}

/// Flatten nested sequences and merge adjacent character atoms.
fn normalize_seq(children: Vec<Matcher>) -> Matcher {
    let mut flat = Vec::with_capacity(children.len());
    for child in children {
        match normalize_matcher(child) {
            Matcher::Seq(grandchildren) => flat.extend(grandchildren),
            other => flat.push(other),
        }
    }

    let mut merged: Vec<Matcher> = Vec::with_capacity(flat.len());
    for child in flat {
        let bytes = match &child {
            Matcher::Char(c) => Some(vec![*c]),
            Matcher::Str(s) => Some(s.clone()),
            _ => None,
        };
        let joinable = matches!(merged.last(), Some(Matcher::Char(_) | Matcher::Str(_)));

        match bytes {
            Some(bytes) if joinable => {
                let mut s = match merged.pop().unwrap() {
                    Matcher::Char(c) => vec![c],
                    Matcher::Str(s) => s,
                    _ => unreachable!(),
                };
                s.extend(bytes);
                merged.push(Matcher::Str(s));
            }
            _ => merged.push(child),
        }
    }

    match merged.len() {
        0 => Matcher::Empty,
        1 => merged.pop().unwrap(),
        _ => Matcher::Seq(merged),
    }
}

/// Flatten nested alternations and fuse adjacent character classes.
fn normalize_alt(children: Vec<Matcher>) -> Matcher {
    let mut flat = Vec::with_capacity(children.len());
    for child in children {
        match normalize_matcher(child) {
            Matcher::Alt(grandchildren) => flat.extend(grandchildren),
            other => flat.push(other),
        }
    }

    let mut merged: Vec<Matcher> = Vec::with_capacity(flat.len());
    for child in flat {
        let ranges = match &child {
            Matcher::Char(c) => Some(vec![CharRange::single(*c)]),
            Matcher::Range(rs) => Some(rs.clone()),
            _ => None,
        };

        let fusible = matches!(merged.last(), Some(Matcher::Range(_)));

        match ranges {
            Some(ranges) if fusible => {
                if let Some(Matcher::Range(prev)) = merged.last_mut() {
                    for r in ranges {
                        fuse_range(prev, r);
                    }
                }
            }
            Some(ranges) => {
                let mut fused = Vec::with_capacity(ranges.len());
                for r in ranges {
                    fuse_range(&mut fused, r);
                }
                merged.push(Matcher::Range(fused));
            }
            None => merged.push(child),
        }
    }

    match merged.len() {
        0 => Matcher::Empty,
        1 => merged.pop().unwrap(),
        _ => Matcher::Alt(merged),
    }
}

/// Add a range to an interval list, combining overlapping or touching
/// intervals while keeping the list in insertion order.
fn fuse_range(list: &mut Vec<CharRange>, range: CharRange) {
    let mut range = range;
    let mut target: Option<usize> = None;

    let mut i = 0;
    while i < list.len() {
        let existing = list[i];
        let touches = range.from <= existing.to.saturating_add(1)
            && existing.from <= range.to.saturating_add(1);
        if touches {
            range = CharRange::new(
                existing.from.min(range.from),
                existing.to.max(range.to),
            );
            match target {
                // A widened interval can bridge later ones; absorb them
                Some(t) => {
                    list.remove(i);
                    list[t] = range;
                    continue;
                }
                None => {
                    list[i] = range;
                    target = Some(i);
                }
            }
        }
        i += 1;
    }

    if target.is_none() {
        list.push(range);
    }
}
