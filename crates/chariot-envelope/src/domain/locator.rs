//! # HEX Trailer Locator
//!
//! Finds the envelope inside a hex carrier given nothing but the file. The
//! counters line sits right before the fixed end-of-file line, so a growing
//! tail window is scanned backwards for that pair; the embedded line counts
//! then drive a forward pass that counts lines from the start of the file.
//! Line counts, never byte offsets, are what the counters mean.

use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};

use super::errors::{MetaError, MetaResult};
use super::fields::EOF_LINE;
use super::hexenvelope::EnvelopeCounters;
use super::hexline::parse_record;
use super::value_objects::{ByteOffset, EnvelopeConfig, LineOffset};

/// Fixed width of the counters line, newline excluded.
const COUNTERS_LINE_LEN: usize = 31;

/// Lowercase prefix of the counters line: length `0x0a`, zero filler, `::`.
const COUNTERS_PREFIX: &str = ":0a0000003a3a";

/// Where the envelope sits inside a hex carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeLocation {
    /// Carrier lines preceding the envelope.
    pub payload_lines: LineOffset,
    /// Envelope lines, counters line included.
    pub envelope_lines: LineOffset,
    /// Byte offset of the envelope's first line.
    pub envelope_start: ByteOffset,
}

/// Scan a tail window for the counters line + end-of-file line pair.
///
/// Returns `None` when the window does not contain the pair; the caller
/// grows the window and retries.
fn rfind_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

fn scan_window(window: &[u8]) -> Option<MetaResult<EnvelopeCounters>> {
    // The window is scanned as raw bytes: a carrier tail may hold
    // arbitrary non-text bytes right before a valid-looking trailer.
    let lower = window.to_ascii_lowercase();
    let eof_lower = EOF_LINE.to_ascii_lowercase();
    let eof_at = rfind_bytes(&lower, eof_lower.as_bytes())?;
    // The counters line and its newline immediately precede the EOF line.
    if eof_at < COUNTERS_LINE_LEN + 1 {
        return None;
    }
    let counters_at = eof_at - COUNTERS_LINE_LEN - 1;
    let line = &lower[counters_at..eof_at - 1];
    if !line.starts_with(COUNTERS_PREFIX.as_bytes()) || lower[eof_at - 1] != b'\n' {
        return None;
    }
    let Ok(line) = std::str::from_utf8(line) else {
        return None;
    };
    match parse_record(line) {
        Ok(data) => Some(super::hexenvelope::parse_counters_data(&data)),
        // A corrupt counters line will not repair itself in a larger
        // window; surface the checksum failure.
        Err(err) => Some(Err(err)),
    }
}

/// Locate the envelope, verifying the counters against the actual lines.
pub fn locate<R: Read + Seek>(reader: &mut R, config: &EnvelopeConfig) -> MetaResult<EnvelopeLocation> {
    let file_size = reader.seek(SeekFrom::End(0))?;
    let mut window_len = config.tail_window_start;
    let counters = loop {
        let len = window_len.min(file_size);
        reader.seek(SeekFrom::End(-(len as i64)))?;
        let mut window = vec![0u8; len as usize];
        reader.read_exact(&mut window)?;
        match scan_window(&window) {
            Some(result) => break result?,
            None if len >= file_size => {
                return Err(MetaError::format("trailer not found"));
            }
            None => window_len += config.tail_window_step,
        }
    };

    reader.seek(SeekFrom::Start(0))?;
    let mut lines = BufReader::new(reader);
    let mut buf = String::new();
    let mut offset = 0u64;
    for _ in 0..counters.payload_lines.0 {
        buf.clear();
        let read = lines.read_line(&mut buf)?;
        if read == 0 {
            return Err(MetaError::format("fewer payload lines than the counters claim"));
        }
        offset += read as u64;
    }
    let envelope_start = ByteOffset(offset);
    for _ in 0..counters.envelope_lines.0 {
        buf.clear();
        if lines.read_line(&mut buf)? == 0 {
            return Err(MetaError::format("fewer envelope lines than the counters claim"));
        }
    }
    buf.clear();
    lines.read_line(&mut buf)?;
    if !buf.trim_end_matches(['\r', '\n']).eq_ignore_ascii_case(EOF_LINE) {
        return Err(MetaError::format(
            "the envelope is not followed by the end-of-file line",
        ));
    }

    Ok(EnvelopeLocation {
        payload_lines: counters.payload_lines,
        envelope_lines: counters.envelope_lines,
        envelope_start,
    })
}
