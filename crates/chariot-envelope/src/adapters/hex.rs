//! # HEX Carrier
//!
//! Payload lines are copied verbatim up to (excluding) the end-of-file
//! line, counted on the way; the envelope groups, the counters line and a
//! fresh end-of-file line follow. Extraction positions by line counts via
//! the trailer locator; nothing in a hex carrier is found by byte offset
//! other than the envelope start the locator itself derives.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::Path;

use crate::domain::envelope::{DecodedFields, FieldSet, WantedTags};
use crate::domain::errors::{MetaError, MetaResult};
use crate::domain::fields::{EOF_LINE, MAGIC, TERMINATOR};
use crate::domain::hexenvelope::{counters_group, decode_envelope, encode_envelope, COUNTERS_DATA_LEN};
use crate::domain::hexline::{encode_buffer, parse_record};
use crate::domain::locator::locate;
use crate::domain::value_objects::{EnvelopeConfig, LineOffset};

fn payload_temp(output: &Path) -> MetaResult<tempfile::NamedTempFile> {
    let dir = output.parent().filter(|p| !p.as_os_str().is_empty());
    Ok(match dir {
        Some(dir) => tempfile::NamedTempFile::new_in(dir)?,
        None => tempfile::NamedTempFile::new()?,
    })
}

/// Copy `input`'s lines up to (excluding) its end-of-file line, counting them.
fn copy_payload_lines(input: &Path, temp: &mut tempfile::NamedTempFile) -> MetaResult<u64> {
    let mut reader = BufReader::new(File::open(input)?);
    let mut payload_lines = 0u64;
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(MetaError::format("input carries no end-of-file line"));
        }
        if line.trim_end_matches(['\r', '\n']).eq_ignore_ascii_case(EOF_LINE) {
            return Ok(payload_lines);
        }
        temp.as_file_mut().write_all(line.as_bytes())?;
        payload_lines += 1;
    }
}

/// Copy `input`'s payload lines to `output` and append the envelope.
pub fn add(input: &Path, output: &Path, fields: &FieldSet) -> MetaResult<()> {
    let mut temp = payload_temp(output)?;
    let payload_lines = copy_payload_lines(input, &mut temp)?;

    let envelope_lines =
        encode_envelope(temp.as_file_mut(), fields, LineOffset(payload_lines))?;
    temp.as_file_mut().write_all(EOF_LINE.as_bytes())?;
    temp.as_file_mut().write_all(b"\n")?;
    temp.as_file().sync_all()?;
    temp.persist(output).map_err(|e| MetaError::Io(e.error))?;

    tracing::debug!("[meta] appended {envelope_lines} after {payload_lines} payload lines");
    Ok(())
}

/// Copy `input`'s payload lines to `output` and append pre-made envelope
/// lines (the form `extract_raw` returns).
///
/// The blob's own counters line carries the line counts of the carrier it
/// was extracted from, so it is dropped and a fresh one is written for the
/// new payload. Every blob line is checksum-verified before installation.
pub fn add_raw(input: &Path, output: &Path, envelope: &[u8]) -> MetaResult<()> {
    let text = std::str::from_utf8(envelope)
        .map_err(|_| MetaError::format("metadata blob is not record text"))?;
    let mut lines = Vec::new();
    let mut records = Vec::new();
    for raw in text.lines() {
        let line = raw.trim_end_matches('\r');
        if line.eq_ignore_ascii_case(EOF_LINE) {
            break;
        }
        records.push(parse_record(line)?);
        lines.push(line);
    }
    if records.first().map(Vec::as_slice) != Some(MAGIC) {
        return Err(MetaError::format(
            "metadata blob does not start with the magic marker",
        ));
    }
    let stale_counters = records
        .last()
        .is_some_and(|data| data.len() == COUNTERS_DATA_LEN && data.starts_with(TERMINATOR));
    if stale_counters {
        records.pop();
        lines.pop();
    }

    let mut temp = payload_temp(output)?;
    let payload_lines = copy_payload_lines(input, &mut temp)?;

    for line in &lines {
        temp.as_file_mut().write_all(line.as_bytes())?;
        temp.as_file_mut().write_all(b"\n")?;
    }
    let envelope_lines = LineOffset(lines.len() as u64 + 1);
    let counters = counters_group(LineOffset(payload_lines), envelope_lines)?;
    temp.as_file_mut().write_all(encode_buffer(&counters).as_bytes())?;
    temp.as_file_mut().write_all(EOF_LINE.as_bytes())?;
    temp.as_file_mut().write_all(b"\n")?;
    temp.as_file().sync_all()?;
    temp.persist(output).map_err(|e| MetaError::Io(e.error))?;

    tracing::debug!("[meta] installed {envelope_lines} pre-made envelope lines");
    Ok(())
}

/// Extract fields from an annotated hex image.
pub fn extract(
    input: &Path,
    wanted: &WantedTags,
    config: &EnvelopeConfig,
) -> MetaResult<DecodedFields> {
    let mut file = File::open(input)?;
    let location = locate(&mut file, config)?;
    file.seek(SeekFrom::Start(location.envelope_start.0))?;
    let (decoded, _) = decode_envelope(BufReader::new(file), wanted)?;
    Ok(decoded)
}

/// Copy the envelope lines verbatim, counters line included.
pub fn extract_raw(input: &Path, config: &EnvelopeConfig) -> MetaResult<Vec<u8>> {
    let mut file = File::open(input)?;
    let location = locate(&mut file, config)?;
    file.seek(SeekFrom::Start(location.envelope_start.0))?;
    let mut reader = BufReader::new(file);
    let mut out = Vec::new();
    let mut line = String::new();
    for _ in 0..location.envelope_lines.0 {
        line.clear();
        reader.read_line(&mut line)?;
        out.extend_from_slice(line.as_bytes());
    }
    Ok(out)
}
