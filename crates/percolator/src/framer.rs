//! Newline framing shared by the request and response channels.
//!
//! A frame is one logical line of UTF-8 text followed by a single `\n`.
//! There are no length prefixes and no escaping, so a request must not
//! contain embedded line terminators: the worker would treat each piece as a
//! separate request and answer it separately, breaking alignment. This is a
//! documented restriction of the wire format and is not checked here.

use std::io::{self, BufRead, Write};

/// Byte terminating every frame on the wire.
pub const TERMINATOR: u8 = b'\n';

/// Encodes `text` as a single request frame.
///
/// Any trailing `\r` and `\n` characters are removed before exactly one
/// terminator is appended. An empty string becomes a bare terminator, which
/// the worker still answers with one response frame.
#[must_use]
pub fn encode(text: &str) -> Vec<u8> {
    let trimmed = text.trim_end_matches(['\r', '\n']);
    let mut frame = Vec::with_capacity(trimmed.len() + 1);
    frame.extend_from_slice(trimmed.as_bytes());
    frame.push(TERMINATOR);
    frame
}

/// Writes `text` as one frame and flushes the writer.
///
/// # Errors
///
/// Returns the underlying I/O error when writing or flushing fails, for
/// example with `BrokenPipe` once the worker has exited.
pub fn write_frame<W: Write + ?Sized>(writer: &mut W, text: &str) -> io::Result<()> {
    writer.write_all(&encode(text))?;
    writer.flush()
}

/// Reads one response frame, blocking until it is complete.
///
/// Returns `Ok(None)` once the channel is exhausted. The terminator (and a
/// preceding `\r`, if any) is stripped, so a worker's "no match" line yields
/// `Some(String::new())`. Bytes after the last terminator are returned as a
/// final frame when the channel closes.
///
/// # Errors
///
/// Returns `InvalidData` when the frame is not valid UTF-8, or the
/// underlying I/O error when reading fails.
pub fn read_frame<R: BufRead + ?Sized>(reader: &mut R) -> io::Result<Option<String>> {
    let mut buffer = Vec::new();
    if reader.read_until(TERMINATOR, &mut buffer)? == 0 {
        return Ok(None);
    }

    if buffer.last() == Some(&TERMINATOR) {
        buffer.pop();
        if buffer.last() == Some(&b'\r') {
            buffer.pop();
        }
    }

    String::from_utf8(buffer)
        .map(Some)
        .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error))
}
