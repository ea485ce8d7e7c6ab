//! Command line interface for egg.
//!
//! `egg [flags] [input-file [output-file]]` reads an Egg grammar and writes
//! the generated parser (or the grammar itself in `print` mode). Exits 0 on
//! success and 1 when the grammar fails to parse or validate.

use clap::{Parser, ValueEnum};
use egg::compiler::{normalize, parse_grammar, report_parse_failure, validate};
use egg::generators;
use egg::parse::{ParseResult, ParseState};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

/// A parser generator for Parsing Expression Grammars.
#[derive(Parser)]
#[command(name = "egg", version, about)]
struct Args {
    /// Input grammar file (default stdin)
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output file (default stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// What to do with the grammar
    #[arg(short, long, value_enum, default_value = "compile")]
    command: Mode,

    /// Grammar name; defaults to the longest identifier prefix of the
    /// output (preferred) or input file name
    #[arg(short, long)]
    name: Option<String>,

    /// Turn off grammar normalization
    #[arg(long = "no-norm")]
    no_norm: bool,

    /// Input file (positional alternative to --input)
    #[arg(value_name = "INPUT")]
    input_pos: Option<PathBuf>,

    /// Output file (positional alternative to --output)
    #[arg(value_name = "OUTPUT")]
    output_pos: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Generate the Rust parser for the grammar
    Compile,
    /// Print the grammar back in Egg syntax
    Print,
}

impl Args {
    fn input_path(&self) -> Option<&PathBuf> {
        self.input.as_ref().or(self.input_pos.as_ref())
    }

    fn output_path(&self) -> Option<&PathBuf> {
        self.output.as_ref().or(self.output_pos.as_ref())
    }

    /// The grammar name: an explicit `--name`, or the identifier prefix of
    /// the output (preferred) or input file name.
    fn grammar_name(&self) -> String {
        if let Some(name) = &self.name {
            return identifier_prefix(name);
        }

        for path in [self.output_path(), self.input_path()].into_iter().flatten() {
            if let Some(file) = path.file_name().and_then(|s| s.to_str()) {
                let prefix = identifier_prefix(file);
                if !prefix.is_empty() {
                    return prefix;
                }
            }
        }

        String::new()
    }
}

/// Longest prefix of `s` that is a valid Egg identifier.
fn identifier_prefix(s: &str) -> String {
    let mut len = 0;
    for (i, c) in s.bytes().enumerate() {
        let valid = c.is_ascii_alphabetic() || c == b'_' || (i > 0 && c.is_ascii_digit());
        if !valid {
            break;
        }
        len = i + 1;
    }
    s[..len].to_string()
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("egg: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> io::Result<ExitCode> {
    let input: Box<dyn Read> = match args.input_path() {
        Some(path) => Box::new(File::open(path)?),
        None => Box::new(io::stdin()),
    };
    let mut ps = ParseState::new(input);

    let mut grammar = match parse_grammar(&mut ps) {
        ParseResult::Matched(grammar) => grammar,
        ParseResult::NoMatch => {
            report_parse_failure(&mut ps, &mut io::stderr())?;
            return Ok(ExitCode::FAILURE);
        }
    };

    if args.command == Mode::Compile {
        if let Err(err) = validate(&grammar) {
            eprintln!("egg: {}", err);
            return Ok(ExitCode::FAILURE);
        }
    }

    if !args.no_norm {
        normalize(&mut grammar);
    }

    let text = match args.command {
        Mode::Compile => generators::rust::generate_rust(&grammar, &args.grammar_name()),
        Mode::Print => generators::egg::print_grammar(&grammar),
    };

    let mut output: Box<dyn Write> = match args.output_path() {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout()),
    };
    output.write_all(text.as_bytes())?;
    output.flush()?;

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_prefix_stops_at_the_first_invalid_byte() {
        assert_eq!(identifier_prefix("calc.egg"), "calc");
        assert_eq!(identifier_prefix("my_parser2.rs"), "my_parser2");
        assert_eq!(identifier_prefix("9lives"), "");
        assert_eq!(identifier_prefix(""), "");
    }
}
