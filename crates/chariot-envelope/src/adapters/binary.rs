//! # Binary Carrier
//!
//! The envelope appended verbatim after the firmware bytes, trailer last.
//! The input file is never modified; the annotated copy is written to a
//! temporary file next to the destination and renamed into place, so a
//! failed add never leaves a half-written output behind.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::domain::binary::{decode_envelope, encode_envelope, read_trailer};
use crate::domain::envelope::{DecodedFields, FieldSet, WantedTags};
use crate::domain::errors::{MetaError, MetaResult};

fn append_after_payload(input: &Path, output: &Path, envelope: &[u8]) -> MetaResult<()> {
    let mut source = File::open(input)?;

    let dir = output.parent().filter(|p| !p.as_os_str().is_empty());
    let mut temp = match dir {
        Some(dir) => tempfile::NamedTempFile::new_in(dir)?,
        None => tempfile::NamedTempFile::new()?,
    };
    let payload_len = io::copy(&mut source, temp.as_file_mut())?;
    temp.as_file_mut().write_all(envelope)?;
    temp.as_file().sync_all()?;
    temp.persist(output).map_err(|e| MetaError::Io(e.error))?;

    // The output is re-measured after the rename; a silent short write
    // would otherwise produce a carrier whose trailer points mid-file.
    let actual = std::fs::metadata(output)?.len();
    let expected = payload_len + envelope.len() as u64;
    if actual != expected {
        return Err(MetaError::SizeMismatch {
            actual,
            payload: payload_len,
            metadata: envelope.len() as u64,
        });
    }
    tracing::debug!(
        "[meta] appended {} envelope bytes after {} payload bytes",
        envelope.len(),
        payload_len
    );
    Ok(())
}

/// Copy `input` to `output` with the envelope appended.
pub fn add(input: &Path, output: &Path, fields: &FieldSet) -> MetaResult<()> {
    let envelope = encode_envelope(fields)?;
    append_after_payload(input, output, &envelope)
}

/// Copy `input` to `output` with a pre-made envelope appended verbatim.
///
/// The blob is the trailer-anchored form `extract_raw` returns; it is
/// decoded once up front so a malformed blob never reaches the output.
pub fn add_raw(input: &Path, output: &Path, envelope: &[u8]) -> MetaResult<()> {
    decode_envelope(&mut io::Cursor::new(envelope), &WantedTags::of(&[]))?;
    append_after_payload(input, output, envelope)
}

/// Extract fields from an annotated binary image.
pub fn extract(input: &Path, wanted: &WantedTags) -> MetaResult<DecodedFields> {
    let mut file = File::open(input)?;
    decode_envelope(&mut file, wanted)
}

/// Extract the whole envelope, trailer included, as raw bytes.
pub fn extract_raw(input: &Path) -> MetaResult<Vec<u8>> {
    let mut file = File::open(input)?;
    let (file_size, meta_len) = read_trailer(&mut file)?;
    file.seek(SeekFrom::Start(file_size - meta_len as u64))?;
    let mut envelope = vec![0u8; meta_len as usize];
    file.read_exact(&mut envelope)?;
    Ok(envelope)
}
