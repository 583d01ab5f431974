//! # Binary Envelope Codec
//!
//! Encodes the field set as a contiguous byte run and decodes it back.
//! The carrier-level form appends the `::` sentinel plus a u32 big-endian
//! total metadata length (counting the 4 length bytes themselves), which
//! anchors backward location: seek 4 bytes before end of file, read the
//! length, seek back exactly that far, parse forward.
//!
//! `encode_fields`/`decode_fields` handle the trailer-less form shared with
//! the ELF carrier, where the section bounds the envelope instead.

use std::io::{Read, Seek, SeekFrom};

use super::envelope::{DecodedField, DecodedFields, FieldSet, WantedTags};
use super::errors::{MetaError, MetaResult};
use super::fields::{FieldEncoding, FieldTag, SchemaWalker, MAGIC, TERMINATOR};

/// Bytes taken by the trailing length value.
pub const TRAILER_LEN: u64 = 4;

/// Smallest well-formed envelope: magic, sha, empty format, version,
/// terminator, trailer.
pub const MIN_ENVELOPE_LEN: u32 = (MAGIC.len()
    + ":sha256:".len()
    + 32
    + ":fmt:".len()
    + 4
    + ":version:".len()
    + 32
    + TERMINATOR.len()
    + TRAILER_LEN as usize) as u32;

fn put_len(out: &mut Vec<u8>, n: usize, what: &str) -> MetaResult<()> {
    let n32 = u32::try_from(n)
        .map_err(|_| MetaError::format(format!("{what} of {n} bytes exceeds the u32 length prefix")))?;
    out.extend_from_slice(&n32.to_be_bytes());
    Ok(())
}

fn put_prefixed(out: &mut Vec<u8>, tag: FieldTag, data: &[u8]) -> MetaResult<()> {
    out.extend_from_slice(tag.literal().as_bytes());
    put_len(out, data.len(), tag.label())?;
    out.extend_from_slice(data);
    Ok(())
}

fn put_mime(out: &mut Vec<u8>, mime: &[u8]) -> MetaResult<()> {
    out.push(b':');
    put_len(out, mime.len(), "mime string")?;
    out.extend_from_slice(mime);
    Ok(())
}

/// Encode the fields in canonical order, without terminator or trailer.
pub fn encode_fields(fields: &FieldSet) -> MetaResult<Vec<u8>> {
    let mut out = Vec::new();
    out.extend_from_slice(MAGIC);

    out.extend_from_slice(FieldTag::Sha256.literal().as_bytes());
    out.extend_from_slice(fields.sha256.as_bytes());

    put_prefixed(&mut out, FieldTag::Format, &fields.format)?;

    if let Some(suppl) = &fields.supplement {
        put_prefixed(&mut out, FieldTag::Supplement, &suppl.data)?;
        put_mime(&mut out, &suppl.mime)?;
    }

    out.extend_from_slice(FieldTag::Version.literal().as_bytes());
    out.extend_from_slice(fields.version.as_bytes());

    if let Some(path) = &fields.blockchain_path {
        put_prefixed(&mut out, FieldTag::BlockchainPath, path)?;
    }
    if let Some(lic) = &fields.license {
        put_prefixed(&mut out, FieldTag::License, lic)?;
    }
    if let Some(soft) = &fields.software_id {
        put_prefixed(&mut out, FieldTag::SoftwareId, soft)?;
    }
    if let Some(sca) = &fields.static_analysis {
        put_prefixed(&mut out, FieldTag::StaticAnalysis, &sca.data)?;
        put_mime(&mut out, &sca.mime)?;
    }

    Ok(out)
}

/// Encode the full trailer-anchored envelope for the binary carrier.
///
/// The trailing u32 counts every envelope byte including itself.
pub fn encode_envelope(fields: &FieldSet) -> MetaResult<Vec<u8>> {
    let mut out = encode_fields(fields)?;
    out.extend_from_slice(TERMINATOR);
    let total = out.len() as u64 + TRAILER_LEN;
    let total32 = u32::try_from(total)
        .map_err(|_| MetaError::format("envelope exceeds the u32 trailer range"))?;
    out.extend_from_slice(&total32.to_be_bytes());
    Ok(out)
}

/// Forward cursor over an in-memory envelope region.
struct FieldCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldCursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        FieldCursor { buf, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn take(&mut self, n: usize, what: &str) -> MetaResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| MetaError::format(format!("truncated {what}")))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn expect_literal(&mut self, literal: &[u8], what: &str) -> MetaResult<()> {
        let got = self.take(literal.len(), what)?;
        if got != literal {
            return Err(MetaError::format(format!("unexpected tag where {what} was required")));
        }
        Ok(())
    }

    fn read_u32(&mut self, what: &str) -> MetaResult<u32> {
        let raw = self.take(4, what)?;
        Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }

    /// Consume `:<label>:` and return the label; `None` means the empty
    /// label of the `::` terminator.
    fn next_tag_label(&mut self) -> MetaResult<Option<&'a [u8]>> {
        if self.take(1, "tag delimiter")?[0] != b':' {
            return Err(MetaError::format("tag delimiter missing"));
        }
        let start = self.pos;
        loop {
            let ch = self.take(1, "tag label")?;
            if ch[0] == b':' {
                break;
            }
        }
        let label = &self.buf[start..self.pos - 1];
        Ok(if label.is_empty() { None } else { Some(label) })
    }
}

fn keep(decoded: &mut DecodedFields, wanted: &WantedTags, tag: FieldTag, data: &[u8], mime: Option<&[u8]>) {
    if wanted.wants(tag) {
        decoded.insert(
            tag,
            DecodedField {
                data: data.to_vec(),
                mime: mime.map(|m| m.to_vec()),
            },
        );
    }
}

/// Parse fields forward from the magic marker.
///
/// Returns the decoded fields and whether the `::` terminator was seen.
/// Unrequested fields are still traversed so the cursor advances past them.
fn parse_fields<'a>(
    cur: &mut FieldCursor<'a>,
    wanted: &WantedTags,
) -> MetaResult<(DecodedFields, bool)> {
    let mut decoded = DecodedFields::default();

    cur.expect_literal(MAGIC, "magic marker")?;

    cur.expect_literal(FieldTag::Sha256.literal().as_bytes(), "sha256 tag")?;
    let sha = cur.take(32, "sha256 value")?;
    keep(&mut decoded, wanted, FieldTag::Sha256, sha, None);

    cur.expect_literal(FieldTag::Format.literal().as_bytes(), "format tag")?;
    let fmt_len = cur.read_u32("format length")? as usize;
    let fmt = cur.take(fmt_len, "format string")?;
    keep(&mut decoded, wanted, FieldTag::Format, fmt, None);

    let mut saw_terminator = false;
    let mut walker = SchemaWalker::new();
    // The walker itself rejects any tag arriving after the schema is
    // exhausted, so the loop only ends at the terminator or the region end.
    loop {
        if cur.at_end() {
            break;
        }
        let Some(label) = cur.next_tag_label()? else {
            saw_terminator = true;
            break;
        };
        let spec = walker.advance(label)?;
        let tag = spec.tag;
        match spec.encoding {
            FieldEncoding::Fixed(width) => {
                let data = cur.take(width, tag.label())?;
                keep(&mut decoded, wanted, tag, data, None);
            }
            FieldEncoding::LengthPrefixed => {
                let len = cur.read_u32(tag.label())? as usize;
                let data = cur.take(len, tag.label())?;
                keep(&mut decoded, wanted, tag, data, None);
            }
            FieldEncoding::LengthPrefixedWithMime => {
                let len = cur.read_u32(tag.label())? as usize;
                let data = cur.take(len, tag.label())?;
                cur.expect_literal(b":", "mime delimiter")?;
                let mime_len = cur.read_u32("mime length")? as usize;
                let mime = cur.take(mime_len, "mime string")?;
                keep(&mut decoded, wanted, tag, data, Some(mime));
            }
        }
    }

    walker.finish()?;

    Ok((decoded, saw_terminator))
}

/// Decode a trailer-less field run (the ELF section form).
pub fn decode_fields(buf: &[u8], wanted: &WantedTags) -> MetaResult<DecodedFields> {
    let mut cur = FieldCursor::new(buf);
    let (decoded, _) = parse_fields(&mut cur, wanted)?;
    Ok(decoded)
}

/// Read and validate the trailing length value.
///
/// Returns `(file_size, metadata_length)` with the reader left wherever the
/// last seek put it; callers reposition themselves.
pub fn read_trailer<R: Read + Seek>(reader: &mut R) -> MetaResult<(u64, u32)> {
    let file_size = reader.seek(SeekFrom::End(0))?;
    if file_size < MIN_ENVELOPE_LEN as u64 {
        return Err(MetaError::format(format!(
            "file of {file_size} bytes is too small to hold an envelope"
        )));
    }
    reader.seek(SeekFrom::End(-(TRAILER_LEN as i64)))?;
    let mut raw = [0u8; TRAILER_LEN as usize];
    reader.read_exact(&mut raw)?;
    let meta_len = u32::from_be_bytes(raw);
    if meta_len < MIN_ENVELOPE_LEN || meta_len as u64 > file_size {
        return Err(MetaError::format(format!(
            "trailer length {meta_len} does not fit a {file_size}-byte file"
        )));
    }
    Ok((file_size, meta_len))
}

/// Decode the trailer-anchored envelope at the end of `reader`.
///
/// The trailer invariant is enforced strictly: the magic marker must sit
/// exactly `metadata_length` bytes before end of file and parsing must
/// consume the region completely.
pub fn decode_envelope<R: Read + Seek>(
    reader: &mut R,
    wanted: &WantedTags,
) -> MetaResult<DecodedFields> {
    let (_, meta_len) = read_trailer(reader)?;
    reader.seek(SeekFrom::End(-(meta_len as i64)))?;
    let mut region = vec![0u8; meta_len as usize];
    reader.read_exact(&mut region)?;

    let mut cur = FieldCursor::new(&region);
    let (decoded, saw_terminator) = parse_fields(&mut cur, wanted)?;
    if !saw_terminator {
        return Err(MetaError::format("terminator sentinel not found"));
    }
    let embedded = cur.read_u32("trailer length")?;
    if embedded != meta_len || !cur.at_end() {
        return Err(MetaError::format(format!(
            "trailer length {meta_len} does not match the envelope extent"
        )));
    }
    Ok(decoded)
}
