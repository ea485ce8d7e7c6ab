//! Egg grammar printing.
//!
//! Re-emits a grammar tree in Egg syntax, the trivial dual of the Rust
//! generator. Useful to inspect what the parser and the normalizer actually
//! produced; blank lines, comments, and original layout are not restored.

use crate::ast::{CharRange, Grammar, Matcher, Rule};

/// Print a grammar back in Egg syntax, one rule per line.
pub fn print_grammar(grammar: &Grammar) -> String {
    let mut parts = Vec::new();

    if let Some(pre) = &grammar.pre {
        parts.push(format!("{{{}}}", pre));
    }

    parts.extend(grammar.rules().iter().map(print_rule));

    if let Some(post) = &grammar.post {
        parts.push(format!("{{{}}}", post));
    }

    let mut out = parts.join("\n");
    out.push('\n');
    out
}

fn print_rule(rule: &Rule) -> String {
    match &rule.ret_type {
        Some(t) => format!("{} : {} = {}", rule.name, t, print_matcher(&rule.body)),
        None => format!("{} = {}", rule.name, print_matcher(&rule.body)),
    }
}

/// Print a matcher, parenthesizing children wherever reparsing would bind
/// them differently.
pub fn print_matcher(matcher: &Matcher) -> String {
    match matcher {
        Matcher::Char(c) => format!("'{}'", escape_byte(*c, b'\'')),
        Matcher::Str(s) => {
            let inner: String = s.iter().map(|&c| escape_byte(c, b'"')).collect();
            format!("\"{}\"", inner)
        }
        Matcher::Range(ranges) => {
            let inner: String = ranges.iter().map(print_range).collect();
            format!("[{}]", inner)
        }
        Matcher::Rule { name, binding } => match binding {
            Some(var) => format!("{}:{}", name, var),
            None => name.clone(),
        },
        Matcher::Any => ".".to_string(),
        Matcher::Empty => ";".to_string(),
        Matcher::Action(text) => format!("{{{}}}", text),
        Matcher::Opt(m) => format!("{}?", print_suffixable(m)),
        Matcher::Many(m) => format!("{}*", print_suffixable(m)),
        Matcher::Some(m) => format!("{}+", print_suffixable(m)),
        Matcher::Look(m) => format!("&{}", print_prefixable(m)),
        Matcher::Not(m) => format!("!{}", print_prefixable(m)),
        Matcher::Capt(m) => format!("< {} >", print_matcher(m)),
        Matcher::Seq(children) => children
            .iter()
            .map(|child| match child {
                Matcher::Alt(_) => format!("({})", print_matcher(child)),
                _ => print_matcher(child),
            })
            .collect::<Vec<_>>()
            .join(" "),
        Matcher::Alt(branches) => branches
            .iter()
            .map(print_matcher)
            .collect::<Vec<_>>()
            .join(" | "),
    }
}

/// A child of `?`/`*`/`+`: anything that is not a single atom needs a group.
fn print_suffixable(m: &Matcher) -> String {
    match m {
        Matcher::Seq(_)
        | Matcher::Alt(_)
        | Matcher::Opt(_)
        | Matcher::Many(_)
        | Matcher::Some(_)
        | Matcher::Look(_)
        | Matcher::Not(_) => format!("({})", print_matcher(m)),
        _ => print_matcher(m),
    }
}

/// A child of `&`/`!`: suffixes bind tighter, so only composites group.
fn print_prefixable(m: &Matcher) -> String {
    match m {
        Matcher::Seq(_) | Matcher::Alt(_) | Matcher::Look(_) | Matcher::Not(_) => {
            format!("({})", print_matcher(m))
        }
        _ => print_matcher(m),
    }
}

fn print_range(range: &CharRange) -> String {
    if range.is_single() {
        escape_byte(range.from, b']')
    } else {
        format!(
            "{}-{}",
            escape_byte(range.from, b']'),
            escape_byte(range.to, b']')
        )
    }
}

/// Escape a byte for a literal with the given delimiter; class delimiters
/// escape both brackets.
fn escape_byte(c: u8, delim: u8) -> String {
    match c {
        b'\n' => "\\n".to_string(),
        b'\r' => "\\r".to_string(),
        b'\t' => "\\t".to_string(),
        b'\\' => "\\\\".to_string(),
        b'[' | b']' if delim == b']' => format!("\\{}", c as char),
        c if c == delim => format!("\\{}", c as char),
        c => (c as char).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parse_grammar;
    use crate::parse::{ParseResult, ParseState};
    use indoc::indoc;
    use std::io::Cursor;

    fn parse(input: &str) -> Grammar {
        let mut ps = ParseState::new(Cursor::new(input.as_bytes().to_vec()));
        match parse_grammar(&mut ps) {
            ParseResult::Matched(g) => g,
            ParseResult::NoMatch => panic!("grammar failed to parse: {:?}", input),
        }
    }

    #[test]
    fn prints_rules_one_per_line() {
        let g = parse(indoc! {"
            A = 'a' B?
            B : i64 = \"bb\" | [0-9a-f] | . ;
        "});
        assert_eq!(
            print_grammar(&g),
            "A = 'a' B?\nB : i64 = \"bb\" | [0-9a-f] | . ;\n"
        );
    }

    #[test]
    fn escapes_come_back_out() {
        let g = parse("S = '\\n' \"a\\\"b\" [\\]-]\n");
        assert_eq!(print_grammar(&g), "S = '\\n' \"a\\\"b\" [\\]-]\n");
    }

    #[test]
    fn groups_reappear_where_binding_requires_them() {
        let g = parse("S = ('a' | 'b') 'c' (!'d')* &('e' 'f')\n");
        assert_eq!(print_grammar(&g), "S = ('a' | 'b') 'c' (!'d')* &('e' 'f')\n");
    }

    #[test]
    fn printing_round_trips_through_the_parser() {
        let source = indoc! {"
            { use std::num::ParseIntError; }
            expr : i64 = atom:t { psVal = t; } ('+' atom:u { psVal += u; })*
            atom : i64 = < [0-9]+ > { psVal = psCapture.parse().unwrap(); }
            ws = [ \\t]*
            { fn helper() {} }
        "};
        let first = parse(source);
        let printed = print_grammar(&first);
        let second = parse(&printed);

        assert_eq!(first.rules(), second.rules());
        assert_eq!(first.pre, second.pre);
        assert_eq!(first.post, second.post);
        assert_eq!(print_grammar(&second), printed);
    }
}
