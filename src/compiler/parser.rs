//! Hand-written PEG parser for the Egg surface syntax.
//!
//! The parser runs over [`ParseState`] using the primitive matchers from
//! [`crate::parse`], in the same save-and-restore shape the generator emits,
//! so it doubles as the reference for what generated parsers look like. On
//! failure the caller asks the buffer for [`ParseState::max_read`] and hands
//! it to the [reporter](`super::report`).

use crate::ast::{CharRange, Grammar, Matcher, Rule};
use crate::parse::{matches, peek, ParseResult, ParseState, EOF};
use std::io::Read;

/// Parse a complete Egg grammar from the input stream.
///
/// The grammar is one or more rules, optionally preceded and followed by a
/// brace-delimited block taken verbatim (`pre` and `post`), and must span
/// the whole input.
pub fn parse_grammar<I: Read>(ps: &mut ParseState<I>) -> ParseResult<Grammar> {
    let start = ps.pos;
    let mut grammar = Grammar::new();

    whitespace(ps);

    if let ParseResult::Matched(block) = action(ps) {
        grammar.pre = Some(block);
        whitespace(ps);
    }

    loop {
        match rule(ps) {
            ParseResult::Matched(r) => {
                grammar.push(r);
                whitespace(ps);
            }
            ParseResult::NoMatch => break,
        }
    }

    if grammar.rules().is_empty() {
        ps.pos = start;
        return ParseResult::NoMatch;
    }

    if let ParseResult::Matched(block) = action(ps) {
        grammar.post = Some(block);
        whitespace(ps);
    }

    // The whole input must have been consumed
    if peek(ps) != EOF {
        ps.pos = start;
        return ParseResult::NoMatch;
    }

    ParseResult::Matched(grammar)
}

/// Skip spaces, tabs, newlines, and `#` line comments.
fn whitespace<I: Read>(ps: &mut ParseState<I>) {
    loop {
        match peek(ps) {
            b' ' | b'\t' | b'\r' | b'\n' => ps.pos += 1,
            b'#' => {
                ps.pos += 1;
                loop {
                    match peek(ps) {
                        b'\n' | EOF => break,
                        _ => ps.pos += 1,
                    }
                }
            }
            _ => break,
        }
    }
}

/// `[A-Za-z_][A-Za-z_0-9]*`
fn identifier<I: Read>(ps: &mut ParseState<I>) -> ParseResult<String> {
    let c = peek(ps);
    if !(c.is_ascii_alphabetic() || c == b'_') {
        return ParseResult::NoMatch;
    }

    let start = ps.pos;
    ps.pos += 1;
    loop {
        let c = peek(ps);
        if c.is_ascii_alphanumeric() || c == b'_' {
            ps.pos += 1;
        } else {
            break;
        }
    }

    ParseResult::Matched(ps.string(start, ps.pos - start).unwrap_or_default())
}

/// `ident _ (':' _ type _)? '=' _ alternation`
fn rule<I: Read>(ps: &mut ParseState<I>) -> ParseResult<Rule> {
    let start = ps.pos;

    let name = match identifier(ps) {
        ParseResult::Matched(name) => name,
        ParseResult::NoMatch => return ParseResult::NoMatch,
    };
    whitespace(ps);

    let mut ret_type = None;
    if matches(ps, b':').is_match() {
        whitespace(ps);
        match type_text(ps) {
            ParseResult::Matched(t) => ret_type = Some(t),
            ParseResult::NoMatch => {
                ps.pos = start;
                return ParseResult::NoMatch;
            }
        }
    }

    if !matches(ps, b'=').is_match() {
        ps.pos = start;
        return ParseResult::NoMatch;
    }
    whitespace(ps);

    match alternation(ps) {
        ParseResult::Matched(body) => ParseResult::Matched(Rule {
            name,
            ret_type,
            body,
        }),
        ParseResult::NoMatch => {
            ps.pos = start;
            ParseResult::NoMatch
        }
    }
}

/// A rule's declared return type: everything up to the `=` on the same
/// line, taken verbatim and trimmed.
fn type_text<I: Read>(ps: &mut ParseState<I>) -> ParseResult<String> {
    let start = ps.pos;
    loop {
        match peek(ps) {
            b'=' => break,
            b'\n' | EOF => {
                ps.pos = start;
                return ParseResult::NoMatch;
            }
            _ => ps.pos += 1,
        }
    }

    let text = ps.string(start, ps.pos - start).unwrap_or_default();
    let text = text.trim();
    if text.is_empty() {
        ps.pos = start;
        return ParseResult::NoMatch;
    }

    ParseResult::Matched(text.to_string())
}

/// `sequence (_ '|' _ sequence)*`; a lone branch collapses to itself.
fn alternation<I: Read>(ps: &mut ParseState<I>) -> ParseResult<Matcher> {
    let first = match sequence(ps) {
        ParseResult::Matched(m) => m,
        ParseResult::NoMatch => return ParseResult::NoMatch,
    };

    let mut branches = vec![first];
    loop {
        let save = ps.pos;
        whitespace(ps);
        if !matches(ps, b'|').is_match() {
            ps.pos = save;
            break;
        }
        whitespace(ps);
        match sequence(ps) {
            ParseResult::Matched(m) => branches.push(m),
            ParseResult::NoMatch => {
                ps.pos = save;
                break;
            }
        }
    }

    if branches.len() == 1 {
        ParseResult::Matched(branches.pop().unwrap())
    } else {
        ParseResult::Matched(Matcher::Alt(branches))
    }
}

/// `term (_ term)*`; a lone term collapses to itself.
fn sequence<I: Read>(ps: &mut ParseState<I>) -> ParseResult<Matcher> {
    let first = match term(ps) {
        ParseResult::Matched(m) => m,
        ParseResult::NoMatch => return ParseResult::NoMatch,
    };

    let mut terms = vec![first];
    loop {
        let save = ps.pos;
        whitespace(ps);
        // A brace block opening at the start of a line is a top-level
        // `pre`/`post` block, never a rule-body action
        if peek(ps) == b'{' && at_line_start(ps) {
            ps.pos = save;
            break;
        }
        match term(ps) {
            ParseResult::Matched(m) => terms.push(m),
            ParseResult::NoMatch => {
                ps.pos = save;
                break;
            }
        }
    }

    if terms.len() == 1 {
        ParseResult::Matched(terms.pop().unwrap())
    } else {
        ParseResult::Matched(Matcher::Seq(terms))
    }
}

/// `('&' _ | '!' _)? atom ('?' | '*' | '+')?`
fn term<I: Read>(ps: &mut ParseState<I>) -> ParseResult<Matcher> {
    let start = ps.pos;

    let prefix = match peek(ps) {
        b'&' | b'!' => {
            let c = peek(ps);
            ps.pos += 1;
            whitespace(ps);
            Some(c)
        }
        _ => None,
    };

    let inner = match atom(ps) {
        ParseResult::Matched(m) => m,
        ParseResult::NoMatch => {
            ps.pos = start;
            return ParseResult::NoMatch;
        }
    };

    let inner = if matches(ps, b'?').is_match() {
        Matcher::Opt(Box::new(inner))
    } else if matches(ps, b'*').is_match() {
        Matcher::Many(Box::new(inner))
    } else if matches(ps, b'+').is_match() {
        Matcher::Some(Box::new(inner))
    } else {
        inner
    };

    ParseResult::Matched(match prefix {
        Some(b'&') => Matcher::Look(Box::new(inner)),
        Some(_) => Matcher::Not(Box::new(inner)),
        None => inner,
    })
}

/// Group, capture, action, or primitive, dispatched on the first byte.
fn atom<I: Read>(ps: &mut ParseState<I>) -> ParseResult<Matcher> {
    match peek(ps) {
        b'(' => group(ps),
        b'<' => capture(ps),
        b'{' => action(ps).map(Matcher::Action),
        _ => primitive(ps),
    }
}

/// `'(' _ alternation _ ')'`
fn group<I: Read>(ps: &mut ParseState<I>) -> ParseResult<Matcher> {
    let start = ps.pos;
    if !matches(ps, b'(').is_match() {
        return ParseResult::NoMatch;
    }
    whitespace(ps);

    if let ParseResult::Matched(inner) = alternation(ps) {
        whitespace(ps);
        if matches(ps, b')').is_match() {
            return ParseResult::Matched(inner);
        }
    }

    ps.pos = start;
    ParseResult::NoMatch
}

/// `'<' _ alternation _ '>'`
fn capture<I: Read>(ps: &mut ParseState<I>) -> ParseResult<Matcher> {
    let start = ps.pos;
    if !matches(ps, b'<').is_match() {
        return ParseResult::NoMatch;
    }
    whitespace(ps);

    if let ParseResult::Matched(inner) = alternation(ps) {
        whitespace(ps);
        if matches(ps, b'>').is_match() {
            return ParseResult::Matched(Matcher::Capt(Box::new(inner)));
        }
    }

    ps.pos = start;
    ParseResult::NoMatch
}

/// `'{' ... '}'` with balanced braces; the inner text is kept verbatim.
fn action<I: Read>(ps: &mut ParseState<I>) -> ParseResult<String> {
    let start = ps.pos;
    if !matches(ps, b'{').is_match() {
        return ParseResult::NoMatch;
    }

    let body_start = ps.pos;
    let mut depth = 1usize;
    loop {
        match peek(ps) {
            EOF => {
                ps.pos = start;
                return ParseResult::NoMatch;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            _ => {}
        }
        ps.pos += 1;
    }

    let text = ps.string(body_start, ps.pos - body_start).unwrap_or_default();
    ps.pos += 1;
    ParseResult::Matched(text)
}

/// Rule reference, literal, character class, `.`, or `;`.
fn primitive<I: Read>(ps: &mut ParseState<I>) -> ParseResult<Matcher> {
    match peek(ps) {
        b'\'' => char_lit(ps).map(Matcher::Char),
        b'"' => str_lit(ps).map(Matcher::Str),
        b'[' => char_class(ps),
        b'.' => {
            ps.pos += 1;
            ParseResult::Matched(Matcher::Any)
        }
        b';' => {
            ps.pos += 1;
            ParseResult::Matched(Matcher::Empty)
        }
        _ => rule_ref(ps),
    }
}

/// `ident (':' _ ident)?`, rejected when the identifier opens the next
/// rule's declaration.
fn rule_ref<I: Read>(ps: &mut ParseState<I>) -> ParseResult<Matcher> {
    let start = ps.pos;

    let name = match identifier(ps) {
        ParseResult::Matched(name) => name,
        ParseResult::NoMatch => return ParseResult::NoMatch,
    };

    if declaration_follows(ps) {
        ps.pos = start;
        return ParseResult::NoMatch;
    }

    let mut binding = None;
    let save = ps.pos;
    if matches(ps, b':').is_match() {
        whitespace(ps);
        match identifier(ps) {
            ParseResult::Matched(var) => binding = Some(var),
            ParseResult::NoMatch => ps.pos = save,
        }
    }

    ParseResult::Matched(Matcher::Rule { name, binding })
}

/// Is the read head at the first column of a line?
fn at_line_start<I: Read>(ps: &mut ParseState<I>) -> bool {
    ps.pos == 0 || ps.at(ps.pos - 1) == Ok(b'\n')
}

/// Lookahead for `_ (':' type)? '='` after an identifier: the sign that the
/// identifier is the next rule's left-hand side, not a reference. Restores
/// the position regardless of the answer.
///
/// The type position accepts only type-shaped bytes, so a bind variable
/// followed by an action containing `=` is not mistaken for a declaration.
fn declaration_follows<I: Read>(ps: &mut ParseState<I>) -> bool {
    let start = ps.pos;
    whitespace(ps);

    let follows = if matches(ps, b':').is_match() {
        loop {
            match peek(ps) {
                b'=' => break true,
                c if is_type_byte(c) => ps.pos += 1,
                _ => break false,
            }
        }
    } else {
        matches(ps, b'=').is_match()
    };

    ps.pos = start;
    follows
}

/// Bytes that can appear in a declared return type.
fn is_type_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            b'_' | b':'
                | b'<'
                | b'>'
                | b','
                | b'&'
                | b'*'
                | b'\''
                | b'('
                | b')'
                | b'['
                | b']'
                | b';'
                | b' '
                | b'\t'
        )
}

/// `'\'' char '\''`
fn char_lit<I: Read>(ps: &mut ParseState<I>) -> ParseResult<u8> {
    let start = ps.pos;
    if !matches(ps, b'\'').is_match() {
        return ParseResult::NoMatch;
    }

    if let ParseResult::Matched(c) = char_in(ps, b'\'') {
        if matches(ps, b'\'').is_match() {
            return ParseResult::Matched(c);
        }
    }

    ps.pos = start;
    ParseResult::NoMatch
}

/// `'"' char* '"'`
fn str_lit<I: Read>(ps: &mut ParseState<I>) -> ParseResult<Vec<u8>> {
    let start = ps.pos;
    if !matches(ps, b'"').is_match() {
        return ParseResult::NoMatch;
    }

    let mut bytes = Vec::new();
    loop {
        if matches(ps, b'"').is_match() {
            return ParseResult::Matched(bytes);
        }
        match char_in(ps, b'"') {
            ParseResult::Matched(c) => bytes.push(c),
            ParseResult::NoMatch => {
                ps.pos = start;
                return ParseResult::NoMatch;
            }
        }
    }
}

/// `'[' (char ('-' char)?)* ']'`
fn char_class<I: Read>(ps: &mut ParseState<I>) -> ParseResult<Matcher> {
    let start = ps.pos;
    if !matches(ps, b'[').is_match() {
        return ParseResult::NoMatch;
    }

    let mut ranges = Vec::new();
    loop {
        if matches(ps, b']').is_match() {
            return ParseResult::Matched(Matcher::Range(ranges));
        }

        let lo = match char_in(ps, b']') {
            ParseResult::Matched(c) => c,
            ParseResult::NoMatch => {
                ps.pos = start;
                return ParseResult::NoMatch;
            }
        };

        let save = ps.pos;
        if matches(ps, b'-').is_match() {
            if let ParseResult::Matched(hi) = char_in(ps, b']') {
                ranges.push(CharRange::new(lo, hi));
                continue;
            }
            // A '-' right before the closing bracket is a literal
            ps.pos = save;
        }

        ranges.push(CharRange::single(lo));
    }
}

/// One byte of a literal or class: an escape, or any byte other than the
/// active delimiter and the backslash.
fn char_in<I: Read>(ps: &mut ParseState<I>, delim: u8) -> ParseResult<u8> {
    let start = ps.pos;
    let c = peek(ps);

    if c == b'\\' {
        ps.pos += 1;
        let decoded = match peek(ps) {
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'\'' => b'\'',
            b'"' => b'"',
            b'\\' => b'\\',
            b'[' => b'[',
            b']' => b']',
            _ => {
                ps.pos = start;
                return ParseResult::NoMatch;
            }
        };
        ps.pos += 1;
        return ParseResult::Matched(decoded);
    }

    if c == delim || c == EOF {
        return ParseResult::NoMatch;
    }

    ps.pos += 1;
    ParseResult::Matched(c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use std::io::Cursor;

    fn parse(input: &str) -> ParseResult<Grammar> {
        let mut ps = ParseState::new(Cursor::new(input.as_bytes().to_vec()));
        parse_grammar(&mut ps)
    }

    fn parse_ok(input: &str) -> Grammar {
        match parse(input) {
            ParseResult::Matched(g) => g,
            ParseResult::NoMatch => panic!("grammar failed to parse: {:?}", input),
        }
    }

    fn body(g: &Grammar, name: &str) -> Matcher {
        g.get(name).expect(name).body.clone()
    }

    #[test]
    fn single_rule() {
        let g = parse_ok("S = 'a'\n");
        assert_eq!(g.rules().len(), 1);
        assert_eq!(body(&g, "S"), Matcher::Char(b'a'));
    }

    #[test]
    fn sequence_and_choice_precedence() {
        let g = parse_ok("S = 'a' 'b' | 'c'\n");
        assert_eq!(
            body(&g, "S"),
            Matcher::Alt(vec![
                Matcher::Seq(vec![Matcher::Char(b'a'), Matcher::Char(b'b')]),
                Matcher::Char(b'c'),
            ])
        );
    }

    #[test]
    fn prefixes_and_suffixes() {
        let g = parse_ok("S = !'a' 'b'* 'c'+ 'd'?\n");
        assert_eq!(
            body(&g, "S"),
            Matcher::Seq(vec![
                Matcher::Not(Box::new(Matcher::Char(b'a'))),
                Matcher::Many(Box::new(Matcher::Char(b'b'))),
                Matcher::Some(Box::new(Matcher::Char(b'c'))),
                Matcher::Opt(Box::new(Matcher::Char(b'd'))),
            ])
        );
    }

    #[test]
    fn lookahead_wraps_the_suffixed_atom() {
        let g = parse_ok("S = &'a'* 'b'\n");
        assert_eq!(
            body(&g, "S"),
            Matcher::Seq(vec![
                Matcher::Look(Box::new(Matcher::Many(Box::new(Matcher::Char(b'a'))))),
                Matcher::Char(b'b'),
            ])
        );
    }

    #[test]
    fn groups_nest_alternation() {
        let g = parse_ok("S = ('a' | 'b') 'c'\n");
        assert_eq!(
            body(&g, "S"),
            Matcher::Seq(vec![
                Matcher::Alt(vec![Matcher::Char(b'a'), Matcher::Char(b'b')]),
                Matcher::Char(b'c'),
            ])
        );
    }

    #[test]
    fn capture_wraps_alternation() {
        let g = parse_ok("S = < 'a'+ >\n");
        assert_eq!(
            body(&g, "S"),
            Matcher::Capt(Box::new(Matcher::Some(Box::new(Matcher::Char(b'a')))))
        );
    }

    #[test]
    fn actions_are_verbatim() {
        let g = parse_ok("S = 'a' { run(); }\n");
        assert_eq!(
            body(&g, "S"),
            Matcher::Seq(vec![
                Matcher::Char(b'a'),
                Matcher::Action(" run(); ".to_string()),
            ])
        );
    }

    #[test]
    fn actions_balance_nested_braces() {
        let g = parse_ok("S = 'a' { if x { y(); } }\n");
        assert_eq!(
            body(&g, "S"),
            Matcher::Seq(vec![
                Matcher::Char(b'a'),
                Matcher::Action(" if x { y(); } ".to_string()),
            ])
        );
    }

    #[test]
    fn typed_rule_takes_type_verbatim() {
        let g = parse_ok("num : Vec<u8> = '4'\n");
        assert_eq!(g.get("num").unwrap().ret_type.as_deref(), Some("Vec<u8>"));
    }

    #[test]
    fn bind_variables() {
        let g = parse_ok(indoc! {"
            S = num:n
            num = '4'
        "});
        assert_eq!(
            body(&g, "S"),
            Matcher::Rule {
                name: "num".to_string(),
                binding: Some("n".to_string()),
            }
        );
    }

    #[test]
    fn character_classes() {
        let g = parse_ok("S = [a-z_0-9]\n");
        assert_eq!(
            body(&g, "S"),
            Matcher::Range(vec![
                CharRange::new(b'a', b'z'),
                CharRange::single(b'_'),
                CharRange::new(b'0', b'9'),
            ])
        );
    }

    #[test]
    fn escapes_decode() {
        let g = parse_ok("S = '\\n' \"a\\tb\" [\\]]\n");
        assert_eq!(
            body(&g, "S"),
            Matcher::Seq(vec![
                Matcher::Char(b'\n'),
                Matcher::Str(b"a\tb".to_vec()),
                Matcher::Range(vec![CharRange::single(b']')]),
            ])
        );
    }

    #[test]
    fn dot_and_semicolon() {
        let g = parse_ok("S = . ;\n");
        assert_eq!(
            body(&g, "S"),
            Matcher::Seq(vec![Matcher::Any, Matcher::Empty])
        );
    }

    #[test]
    fn comments_read_as_whitespace() {
        let g = parse_ok(indoc! {"
            # leading comment
            A = 'a' # trailing comment
            # comment between rules
            B = 'b'
        "});
        assert_eq!(g.rules().len(), 2);
        assert_eq!(body(&g, "A"), Matcher::Char(b'a'));
        assert_eq!(body(&g, "B"), Matcher::Char(b'b'));
    }

    #[test]
    fn rules_end_where_the_next_declaration_starts() {
        let g = parse_ok(indoc! {"
            A = B 'x'
            B = 'b'
        "});
        assert_eq!(
            body(&g, "A"),
            Matcher::Seq(vec![
                Matcher::Rule {
                    name: "B".to_string(),
                    binding: None,
                },
                Matcher::Char(b'x'),
            ])
        );
        assert_eq!(body(&g, "B"), Matcher::Char(b'b'));
    }

    #[test]
    fn typed_declaration_ends_the_previous_rule() {
        let g = parse_ok(indoc! {"
            A = 'a'
            num : i64 = '4'
        "});
        assert_eq!(g.rules().len(), 2);
        assert_eq!(body(&g, "A"), Matcher::Char(b'a'));
        assert_eq!(g.get("num").unwrap().ret_type.as_deref(), Some("i64"));
    }

    #[test]
    fn pre_and_post_blocks() {
        let g = parse_ok(indoc! {"
            { use std::fmt; }
            S = 'a'
            { fn helper() {} }
        "});
        assert_eq!(g.pre.as_deref(), Some(" use std::fmt; "));
        assert_eq!(g.post.as_deref(), Some(" fn helper() {} "));
    }

    #[test]
    fn inline_trailing_action_stays_in_the_rule() {
        let g = parse_ok("num : i64 = < [0-9]+ > { psVal = psCapture.parse().unwrap(); }\n");
        assert_eq!(g.post, None);
        assert_eq!(
            body(&g, "num"),
            Matcher::Seq(vec![
                Matcher::Capt(Box::new(Matcher::Some(Box::new(Matcher::Range(vec![
                    CharRange::new(b'0', b'9'),
                ]))))),
                Matcher::Action(" psVal = psCapture.parse().unwrap(); ".to_string()),
            ])
        );
    }

    #[test]
    fn empty_string_literal_parses() {
        let g = parse_ok("S = \"\"\n");
        assert_eq!(body(&g, "S"), Matcher::Str(Vec::new()));
    }

    #[test]
    fn trailing_garbage_fails() {
        assert!(!parse("S = 'a'\n???\n").is_match());
    }

    #[test]
    fn empty_input_fails() {
        assert!(!parse("").is_match());
        assert!(!parse("   \n# only a comment\n").is_match());
    }

    #[test]
    fn unterminated_literal_fails() {
        assert!(!parse("S = 'a\n").is_match());
        assert!(!parse("S = \"abc\n").is_match());
        assert!(!parse("S = { unbalanced\n").is_match());
    }

    #[test]
    fn failure_restores_the_position() {
        let mut ps = ParseState::new(Cursor::new(b"= nonsense".to_vec()));
        ps.pos = 0;
        assert!(!parse_grammar(&mut ps).is_match());
        assert_eq!(ps.pos, 0);
        assert!(ps.max_read() > 0);
    }
}
