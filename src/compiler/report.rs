use crate::parse::{ParseState, EOF};
use std::io::{self, Read, Write};

/// Write a human-readable report for a failed grammar parse.
///
/// The failure position is the buffer's [`max_read`](ParseState::max_read):
/// the furthest byte any matcher inspected. The report names the failure
/// offset, shows the offending line with its 1-based line number, and marks
/// the column (0-based relative to the line start) with a caret.
///
/// The backward scan for the line start is the one place that can run into
/// input the buffer has discarded; the discarded-newline count carried by
/// that error keeps the line number correct.
pub fn report_parse_failure<I: Read>(
    ps: &mut ParseState<I>,
    out: &mut dyn Write,
) -> io::Result<()> {
    let max_pos = ps.max_read();

    // Scan backward to the start of the offending line, stopping at a
    // newline or at the forgotten boundary
    let mut line_start = max_pos;
    while line_start > 0 {
        match ps.at(line_start - 1) {
            Ok(b'\n') | Err(_) => break,
            Ok(_) => line_start -= 1,
        }
    }

    // Scan forward to the end of the line
    let mut line_end = max_pos;
    loop {
        match ps.at(line_end) {
            Ok(b'\n') | Ok(EOF) | Err(_) => break,
            Ok(_) => line_end += 1,
        }
    }

    // Count newlines up to the line start; a scan into the forgotten range
    // falls back to the buffer's running count
    let mut line_no = 1usize;
    let mut i = line_start;
    while i > 0 {
        match ps.at(i - 1) {
            Ok(b'\n') => {
                line_no += 1;
                i -= 1;
            }
            Ok(_) => i -= 1,
            Err(forgotten) => {
                line_no += forgotten.newlines_discarded;
                break;
            }
        }
    }

    let line = ps.string(line_start, line_end - line_start).unwrap_or_default();
    let column = max_pos - line_start;

    writeln!(out, "Parse failure {} bytes into the input:", max_pos)?;
    let prefix = format!("line {}:   ", line_no);
    writeln!(out, "{}{}", prefix, line)?;
    writeln!(
        out,
        "{}^-- error, column {}",
        " ".repeat(prefix.chars().count() + column.saturating_sub(1)),
        column
    )?;

    Ok(())
}
