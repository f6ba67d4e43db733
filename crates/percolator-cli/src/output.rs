//! Rendering of per-line verdicts.

use std::io::{self, Write};

use percolator::{MatchResult, Outcome};

/// Line printed once every input line has been answered, after a blank
/// separator line.
pub(crate) const COMPLETION_MESSAGE: &str = "All lines were processed.";

/// Writes the verdict for one input line.
pub(crate) fn write_outcome<W, S>(out: &mut W, outcome: &Outcome<S>) -> io::Result<()>
where
    W: Write + ?Sized,
    S: AsRef<str>,
{
    match &outcome.result {
        MatchResult::Matched(text) => writeln!(out, "MATCH:>>>{text}<<<"),
        MatchResult::NoMatch => writeln!(
            out,
            "Line: >>>{}<<< didn't match.",
            outcome.input.as_ref()
        ),
    }
}

pub(crate) fn write_completion<W: Write + ?Sized>(out: &mut W) -> io::Result<()> {
    writeln!(out, "\n{COMPLETION_MESSAGE}")?;
    out.flush()
}
