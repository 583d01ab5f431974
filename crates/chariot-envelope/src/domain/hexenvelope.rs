//! # HEX Envelope Codec
//!
//! The envelope's field sequence rendered over the line codec. Every atomic
//! unit of the binary layout (the magic marker, a tag with its length
//! prefix where the field carries one, a payload, a mime string) is
//! written as its own record group, so the decoder can look a whole tag
//! line ahead without byte-level scanning across records.
//!
//! The sequence closes with the counters line: `::`, the u32-BE count of
//! payload lines preceding the envelope, and the u32-BE count of envelope
//! lines including the counters line itself. The trailer locator finds the
//! envelope through this line; the fixed end-of-file line follows it.

use std::io::{BufRead, Write};

use super::envelope::{DecodedField, DecodedFields, FieldSet, WantedTags};
use super::errors::{MetaError, MetaResult};
use super::fields::{FieldEncoding, FieldTag, SchemaWalker, MAGIC, TERMINATOR};
use super::hexline::{record_count, HexLineReader, HexLineWriter};
use super::value_objects::LineOffset;

/// Data bytes of the counters line: `::` + two u32-BE counters.
pub const COUNTERS_DATA_LEN: usize = 10;

fn line_count_u32(lines: LineOffset, what: &str) -> MetaResult<u32> {
    u32::try_from(lines.0)
        .map_err(|_| MetaError::format(format!("{what} line count exceeds the u32 counter")))
}

/// The counters line's data bytes for the given line counts.
pub(crate) fn counters_group(
    payload_lines: LineOffset,
    envelope_lines: LineOffset,
) -> MetaResult<Vec<u8>> {
    let mut counters = TERMINATOR.to_vec();
    counters.extend_from_slice(&line_count_u32(payload_lines, "payload")?.to_be_bytes());
    counters.extend_from_slice(&line_count_u32(envelope_lines, "envelope")?.to_be_bytes());
    Ok(counters)
}

fn tag_group(tag: FieldTag) -> Vec<u8> {
    tag.literal().as_bytes().to_vec()
}

fn tag_len_group(tag: FieldTag, len: usize) -> MetaResult<Vec<u8>> {
    let len = u32::try_from(len)
        .map_err(|_| MetaError::format(format!("`{}` payload exceeds u32 length", tag.label())))?;
    let mut group = tag.literal().as_bytes().to_vec();
    group.extend_from_slice(&len.to_be_bytes());
    Ok(group)
}

fn mime_len_group(len: usize) -> MetaResult<Vec<u8>> {
    let len = u32::try_from(len)
        .map_err(|_| MetaError::format("mime string exceeds u32 length"))?;
    let mut group = vec![b':'];
    group.extend_from_slice(&len.to_be_bytes());
    Ok(group)
}

/// The record groups of one envelope, in carrier order, counters excluded.
fn field_groups(fields: &FieldSet) -> MetaResult<Vec<Vec<u8>>> {
    let mut groups = vec![MAGIC.to_vec()];
    groups.push(tag_group(FieldTag::Sha256));
    groups.push(fields.sha256.as_bytes().to_vec());
    groups.push(tag_len_group(FieldTag::Format, fields.format.len())?);
    groups.push(fields.format.clone());
    if let Some(supplement) = &fields.supplement {
        groups.push(tag_len_group(FieldTag::Supplement, supplement.data.len())?);
        groups.push(supplement.data.clone());
        groups.push(mime_len_group(supplement.mime.len())?);
        groups.push(supplement.mime.clone());
    }
    groups.push(tag_group(FieldTag::Version));
    groups.push(fields.version.as_bytes().to_vec());
    if let Some(path) = &fields.blockchain_path {
        groups.push(tag_len_group(FieldTag::BlockchainPath, path.len())?);
        groups.push(path.clone());
    }
    if let Some(license) = &fields.license {
        groups.push(tag_len_group(FieldTag::License, license.len())?);
        groups.push(license.clone());
    }
    if let Some(id) = &fields.software_id {
        groups.push(tag_len_group(FieldTag::SoftwareId, id.len())?);
        groups.push(id.clone());
    }
    if let Some(analysis) = &fields.static_analysis {
        groups.push(tag_len_group(FieldTag::StaticAnalysis, analysis.data.len())?);
        groups.push(analysis.data.clone());
        groups.push(mime_len_group(analysis.mime.len())?);
        groups.push(analysis.mime.clone());
    }
    Ok(groups)
}

/// Write the envelope groups and the counters line.
///
/// `payload_lines` is the number of carrier lines preceding the envelope;
/// the caller appends the end-of-file line afterwards. Returns the number
/// of envelope lines written, counters line included, which is the value
/// the counters line embeds.
pub fn encode_envelope<W: Write>(
    writer: W,
    fields: &FieldSet,
    payload_lines: LineOffset,
) -> MetaResult<LineOffset> {
    let groups = field_groups(fields)?;
    let envelope_lines = LineOffset(
        groups
            .iter()
            .map(|group| record_count(group.len()))
            .sum::<u64>()
            + 1,
    );

    let counters = counters_group(payload_lines, envelope_lines)?;

    let mut writer = HexLineWriter::new(writer);
    for group in &groups {
        writer.write_group(group)?;
    }
    writer.write_group(&counters)?;
    debug_assert_eq!(writer.lines_written(), envelope_lines);
    Ok(envelope_lines)
}

/// The two counters carried by the counters line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeCounters {
    pub payload_lines: LineOffset,
    pub envelope_lines: LineOffset,
}

pub(crate) fn parse_counters_data(data: &[u8]) -> MetaResult<EnvelopeCounters> {
    if data.len() != COUNTERS_DATA_LEN || &data[..2] != TERMINATOR {
        return Err(MetaError::format("malformed counters line"));
    }
    let payload = u32::from_be_bytes([data[2], data[3], data[4], data[5]]);
    let envelope = u32::from_be_bytes([data[6], data[7], data[8], data[9]]);
    Ok(EnvelopeCounters {
        payload_lines: LineOffset(payload as u64),
        envelope_lines: LineOffset(envelope as u64),
    })
}

fn expect_group<R: BufRead>(
    reader: &mut HexLineReader<R>,
    expected: &[u8],
    what: &str,
) -> MetaResult<()> {
    let data = reader.read_exact_group(expected.len())?;
    if data != expected {
        return Err(MetaError::format(format!("{what} not found")));
    }
    Ok(())
}

fn read_u32_tail(rest: &[u8], what: &str) -> MetaResult<usize> {
    let bytes: [u8; 4] = rest
        .try_into()
        .map_err(|_| MetaError::format(format!("malformed {what} length")))?;
    Ok(u32::from_be_bytes(bytes) as usize)
}

fn keep(decoded: &mut DecodedFields, wanted: &WantedTags, tag: FieldTag, data: Vec<u8>, mime: Option<Vec<u8>>) {
    if wanted.wants(tag) {
        decoded.insert(tag, DecodedField { data, mime });
    }
}

/// Decode an envelope positioned at its magic line.
///
/// Reads through the counters line (the end-of-file line is left in the
/// reader). Fields before a wanted one are still traversed; only wanted
/// payloads are retained.
pub fn decode_envelope<R: BufRead>(
    reader: R,
    wanted: &WantedTags,
) -> MetaResult<(DecodedFields, EnvelopeCounters)> {
    let mut reader = HexLineReader::new(reader);
    expect_group(&mut reader, MAGIC, "magic marker")?;
    expect_group(&mut reader, FieldTag::Sha256.literal().as_bytes(), "sha256 tag")?;
    let sha = reader.read_exact_group(super::value_objects::SHA256_LEN)?;

    let fmt_tag_len = FieldTag::Format.literal().len() + 4;
    let fmt_line = reader.read_exact_group(fmt_tag_len)?;
    let fmt_literal = FieldTag::Format.literal().as_bytes();
    if &fmt_line[..fmt_literal.len()] != fmt_literal {
        return Err(MetaError::format("format tag not found"));
    }
    let fmt_len = read_u32_tail(&fmt_line[fmt_literal.len()..], "format")?;
    let fmt = reader.read_exact_group(fmt_len)?;

    let mut decoded = DecodedFields::default();
    keep(&mut decoded, wanted, FieldTag::Sha256, sha, None);
    keep(&mut decoded, wanted, FieldTag::Format, fmt, None);

    let mut walker = SchemaWalker::new();
    let counters = loop {
        let line = reader.read_record()?;
        if line.first() != Some(&b':') {
            return Err(MetaError::format("expected a tag line inside the envelope"));
        }
        let label_end = line[1..]
            .iter()
            .position(|&b| b == b':')
            .ok_or_else(|| MetaError::format("unterminated tag label"))?;
        let label = &line[1..1 + label_end];
        if label.is_empty() {
            break parse_counters_data(&line)?;
        }
        let spec = walker.advance(label)?;
        let tag = spec.tag;
        let rest = &line[2 + label.len()..];
        match spec.encoding {
            FieldEncoding::Fixed(width) => {
                if !rest.is_empty() {
                    return Err(MetaError::format(format!(
                        "unexpected bytes after the `{}` tag",
                        tag.label()
                    )));
                }
                let data = reader.read_exact_group(width)?;
                keep(&mut decoded, wanted, tag, data, None);
            }
            FieldEncoding::LengthPrefixed => {
                let len = read_u32_tail(rest, tag.label())?;
                let data = reader.read_exact_group(len)?;
                keep(&mut decoded, wanted, tag, data, None);
            }
            FieldEncoding::LengthPrefixedWithMime => {
                let len = read_u32_tail(rest, tag.label())?;
                let data = reader.read_exact_group(len)?;
                let mime_line = reader.read_record()?;
                if mime_line.first() != Some(&b':') {
                    return Err(MetaError::format("mime delimiter not found"));
                }
                let mime_len = read_u32_tail(&mime_line[1..], "mime")?;
                let mime = reader.read_exact_group(mime_len)?;
                keep(&mut decoded, wanted, tag, data, Some(mime));
            }
        }
    };
    walker.finish()?;
    Ok((decoded, counters))
}
