//! Rust code generation.
//!
//! Emits one self-contained source file per grammar: a banner, the runtime
//! `use` block, an optional `pub mod` namespace, the verbatim `pre` block,
//! one matching function per rule in declaration order, and the verbatim
//! `post` block.
//!
//! Every generated rule function saves its entry position, runs the matcher
//! body, and either returns its value or restores the position and fails.
//! Matcher bodies are emitted as statements over a shared failure label, so
//! a failing matcher always restores the position the enclosing matcher saw
//! on entry before branching away.

use crate::ast::{CharRange, Grammar, Matcher, Rule};

/// Lints the generated module switches off: the runtime contract names
/// (`psStart`, `psVal`, `psCatch`, ...) are deliberately not snake case,
/// and grammars routinely produce unused locals and unreachable arms.
const GENERATED_ALLOWS: &str =
    "allow(non_snake_case, unused_variables, unused_mut, unused_labels, unreachable_code, dead_code, clippy::all)";

/// Generate the Rust parser module for a grammar.
///
/// `grammar_name` names the enclosing `pub mod`; when empty, no module
/// wrapper is emitted and the output is a standalone module file.
pub fn generate_rust(grammar: &Grammar, grammar_name: &str) -> String {
    let mut e = Emitter::new();

    e.line("// Generated by egg. Do not edit by hand.");
    e.line("");

    if grammar_name.is_empty() {
        e.line(&format!("#![{}]", GENERATED_ALLOWS));
        e.line("");
        emit_body(&mut e, grammar);
    } else {
        e.line(&format!("#[{}]", GENERATED_ALLOWS));
        e.line(&format!("pub mod {} {{", safe_ident(grammar_name)));
        e.indent += 1;
        emit_body(&mut e, grammar);
        e.indent -= 1;
        e.line("}");
    }

    e.out
}

fn emit_body(e: &mut Emitter, grammar: &Grammar) {
    e.line("use egg::parse::{self, ParseResult, ParseState};");
    e.line("use std::io::Read;");

    if let Some(pre) = &grammar.pre {
        e.line("");
        e.raw(pre);
    }

    for rule in grammar.rules() {
        e.line("");
        emit_rule(e, rule);
    }

    if let Some(post) = &grammar.post {
        e.line("");
        e.raw(post);
    }
}

fn emit_rule(e: &mut Emitter, rule: &Rule) {
    let ret = rule.ret_type.as_deref().unwrap_or("()");
    e.next_id = 0;

    e.line(&format!(
        "pub fn {}<I: Read>(ps: &mut ParseState<I>) -> ParseResult<{}> {{",
        safe_ident(&rule.name),
        ret
    ));
    e.indent += 1;

    e.line("let psStart = ps.pos;");
    e.line(&format!("let mut psVal: {} = Default::default();", ret));
    e.line("let psMatched = 'rule: {");
    e.indent += 1;
    emit_matcher(e, &rule.body, "break 'rule false;");
    e.line("true");
    e.indent -= 1;
    e.line("};");
    e.line("if psMatched {");
    e.line("    ParseResult::Matched(psVal)");
    e.line("} else {");
    e.line("    ps.pos = psStart;");
    e.line("    ParseResult::NoMatch");
    e.line("}");

    e.indent -= 1;
    e.line("}");
}

/// Emit the statements matching `matcher`.
///
/// On failure the statements restore `ps.pos` to its value at their entry
/// and execute `fail` (always a single `break`); on success control falls
/// through with any binds and captures in scope for later siblings.
fn emit_matcher(e: &mut Emitter, matcher: &Matcher, fail: &str) {
    match matcher {
        Matcher::Char(c) => {
            e.line(&format!(
                "if !parse::matches(ps, {}).is_match() {{",
                byte_literal(*c)
            ));
            e.line(&format!("    {}", fail));
            e.line("}");
        }

        Matcher::Str(s) => {
            let id = e.id();
            let checks: Vec<String> = s
                .iter()
                .map(|&c| format!("parse::matches(ps, {}).is_match()", byte_literal(c)))
                .collect();
            e.line(&format!("let psStr{} = ps.pos;", id));
            e.line(&format!("if !({}) {{", join_condition(&checks, "&&")));
            e.line(&format!("    ps.pos = psStr{};", id));
            e.line(&format!("    {}", fail));
            e.line("}");
        }

        Matcher::Range(ranges) => {
            let checks: Vec<String> = ranges.iter().map(range_check).collect();
            e.line(&format!("if !({}) {{", join_condition(&checks, "||")));
            e.line(&format!("    {}", fail));
            e.line("}");
        }

        Matcher::Rule { name, binding } => match binding {
            None => {
                e.line(&format!("if !{}(ps).is_match() {{", safe_ident(name)));
                e.line(&format!("    {}", fail));
                e.line("}");
            }
            Some(var) => {
                let id = e.id();
                e.line(&format!(
                    "let mut {} = match {}(ps) {{",
                    safe_ident(var),
                    safe_ident(name)
                ));
                e.line(&format!("    ParseResult::Matched(psBound{}) => psBound{},", id, id));
                e.line("    ParseResult::NoMatch => {");
                e.line(&format!("        {}", fail));
                e.line("    }");
                e.line("};");
            }
        },

        Matcher::Any => {
            e.line("if !parse::any(ps).is_match() {");
            e.line(&format!("    {}", fail));
            e.line("}");
        }

        Matcher::Empty => {}

        Matcher::Action(text) => {
            e.raw_block(&format!("{{{}}}", text));
        }

        Matcher::Opt(m) => {
            let id = e.id();
            e.line(&format!("'opt{}: {{", id));
            e.indent += 1;
            emit_matcher(e, m, &format!("break 'opt{};", id));
            e.indent -= 1;
            e.line("}");
        }

        Matcher::Many(m) => {
            let id = e.id();
            emit_repetition(e, m, id);
        }

        Matcher::Some(m) => {
            let id = e.id();
            emit_matcher(e, m, fail);
            emit_repetition(e, m, id);
        }

        Matcher::Seq(children) => {
            let id = e.id();
            e.line(&format!("let psSeq{} = ps.pos;", id));
            e.line(&format!("let psOk{} = 'seq{}: {{", id, id));
            e.indent += 1;
            for child in children {
                emit_matcher(e, child, &format!("break 'seq{} false;", id));
            }
            e.line("true");
            e.indent -= 1;
            e.line("};");
            e.line(&format!("if !psOk{} {{", id));
            e.line(&format!("    ps.pos = psSeq{};", id));
            e.line(&format!("    {}", fail));
            e.line("}");
        }

        Matcher::Alt(branches) => {
            let id = e.id();
            e.line(&format!("let psAlt{} = ps.pos;", id));
            e.line(&format!("let psOk{} = 'alt{}: {{", id, id));
            e.indent += 1;
            for (i, branch) in branches.iter().enumerate() {
                e.line(&format!("'alt{}_{}: {{", id, i));
                e.indent += 1;
                emit_matcher(e, branch, &format!("break 'alt{}_{};", id, i));
                e.line(&format!("break 'alt{} true;", id));
                e.indent -= 1;
                e.line("}");
                e.line(&format!("ps.pos = psAlt{};", id));
            }
            e.line("false");
            e.indent -= 1;
            e.line("};");
            e.line(&format!("if !psOk{} {{", id));
            e.line(&format!("    {}", fail));
            e.line("}");
        }

        Matcher::Look(m) => {
            let id = e.id();
            emit_lookahead(e, m, id, fail, false);
        }

        Matcher::Not(m) => {
            let id = e.id();
            emit_lookahead(e, m, id, fail, true);
        }

        Matcher::Capt(m) => {
            e.line("let psCatch = ps.pos;");
            emit_matcher(e, m, fail);
            e.line("let psCatchLen = ps.pos - psCatch;");
            e.line("let psCapture = ps.string(psCatch, psCatchLen).unwrap_or_default();");
        }
    }
}

/// The shared loop of `Many` and the tail of `Some`: iterate the body until
/// it fails or stops consuming, then restore to the last good position.
fn emit_repetition(e: &mut Emitter, m: &Matcher, id: usize) {
    e.line(&format!("'manyLoop{}: loop {{", id));
    e.indent += 1;
    e.line(&format!("let psMany{} = ps.pos;", id));
    e.line(&format!("'many{}: {{", id));
    e.indent += 1;
    emit_matcher(e, m, &format!("break 'many{};", id));
    e.line(&format!("if ps.pos != psMany{} {{", id));
    e.line(&format!("    continue 'manyLoop{};", id));
    e.line("}");
    e.indent -= 1;
    e.line("}");
    e.line(&format!("ps.pos = psMany{};", id));
    e.line("break;");
    e.indent -= 1;
    e.line("}");
}

/// `Look` and `Not`: run the body, restore the position regardless of the
/// outcome, then fail on the selected polarity.
fn emit_lookahead(e: &mut Emitter, m: &Matcher, id: usize, fail: &str, negative: bool) {
    e.line(&format!("let psLook{} = ps.pos;", id));
    e.line(&format!("let psOk{} = 'look{}: {{", id, id));
    e.indent += 1;
    emit_matcher(e, m, &format!("break 'look{} false;", id));
    e.line("true");
    e.indent -= 1;
    e.line("};");
    e.line(&format!("ps.pos = psLook{};", id));
    if negative {
        e.line(&format!("if psOk{} {{", id));
    } else {
        e.line(&format!("if !psOk{} {{", id));
    }
    e.line(&format!("    {}", fail));
    e.line("}");
}

fn range_check(range: &CharRange) -> String {
    if range.is_single() {
        format!("parse::matches(ps, {}).is_match()", byte_literal(range.from))
    } else {
        format!(
            "parse::in_range(ps, {}, {}).is_match()",
            byte_literal(range.from),
            byte_literal(range.to)
        )
    }
}

/// Join sub-conditions with an operator; an empty list can never match.
fn join_condition(checks: &[String], op: &str) -> String {
    if checks.is_empty() {
        "false".to_string()
    } else {
        checks.join(&format!(" {} ", op))
    }
}

/// A Rust byte literal for `c`, falling back to hex for bytes with no
/// printable spelling.
fn byte_literal(c: u8) -> String {
    match c {
        b'\n' => "b'\\n'".to_string(),
        b'\r' => "b'\\r'".to_string(),
        b'\t' => "b'\\t'".to_string(),
        b'\\' => "b'\\\\'".to_string(),
        b'\'' => "b'\\''".to_string(),
        0x20..=0x7e => format!("b'{}'", c as char),
        _ => format!("0x{:02x}", c),
    }
}

/// Make a grammar identifier usable as a Rust item name.
///
/// Keyword collisions become raw identifiers; the handful of names raw
/// syntax cannot spell (`crate`, `self`, `super`, `Self`, a bare `_`) get
/// a trailing underscore instead, applied consistently at definition and
/// call sites.
pub fn safe_ident(ident: &str) -> String {
    if matches!(ident, "crate" | "self" | "super" | "Self" | "_") {
        format!("{}_", ident)
    } else if is_rust_keyword(ident) {
        format!("r#{}", ident)
    } else {
        ident.to_string()
    }
}

/// Strict and reserved keywords from the Rust reference, all editions.
/// Weak keywords (`union`, `raw`, ...) are ordinary identifiers in item
/// position and need no escape.
fn is_rust_keyword(ident: &str) -> bool {
    let strict = matches!(
        ident,
        "as" | "break"
            | "const"
            | "continue"
            | "else"
            | "enum"
            | "extern"
            | "false"
            | "fn"
            | "for"
            | "if"
            | "impl"
            | "in"
            | "let"
            | "loop"
            | "match"
            | "mod"
            | "move"
            | "mut"
            | "pub"
            | "ref"
            | "return"
            | "static"
            | "struct"
            | "trait"
            | "true"
            | "type"
            | "unsafe"
            | "use"
            | "where"
            | "while"
            | "async"
            | "await"
            | "dyn"
    );
    let reserved = matches!(
        ident,
        "abstract"
            | "become"
            | "box"
            | "do"
            | "final"
            | "macro"
            | "override"
            | "priv"
            | "typeof"
            | "unsized"
            | "virtual"
            | "yield"
            | "try"
            | "gen"
    );
    strict || reserved
}

/// Indentation-aware output buffer.
struct Emitter {
    out: String,
    indent: usize,
    next_id: usize,
}

impl Emitter {
    fn new() -> Self {
        Self {
            out: String::new(),
            indent: 0,
            next_id: 0,
        }
    }

    fn id(&mut self) -> usize {
        self.next_id += 1;
        self.next_id
    }

    /// One line at the current indentation.
    fn line(&mut self, text: &str) {
        if text.is_empty() {
            self.out.push('\n');
            return;
        }
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// Verbatim text, kept byte-for-byte on its own lines.
    fn raw(&mut self, text: &str) {
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// Verbatim text at the current indentation on the first line only.
    fn raw_block(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }
}
