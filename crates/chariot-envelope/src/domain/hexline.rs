//! # HEX Line Codec
//!
//! Intel-HEX inspired record shape, application specific: `:`, a two-digit
//! length byte, six filler digits (always zero here), the data bytes as
//! hex, and a two-digit checksum: the 8-bit two's complement of the sum of
//! length byte, filler bytes and data bytes.
//!
//! One logical buffer always encodes to one *group* of records: full
//! 255-byte records while more than 255 bytes remain, then a single final
//! record carrying the true remaining length. A zero-length buffer still
//! emits exactly one zero-length record, so `decode(encode(b), b.len())`
//! holds for every `b`.
//!
//! Records are emitted with lowercase digits; decoding accepts either
//! case, since annotated images in the wild carry both.

use std::io::{BufRead, Write};

use super::errors::{MetaError, MetaResult};
use super::value_objects::LineOffset;

/// Most data bytes one record can carry.
pub const MAX_RECORD_DATA: usize = 0xFF;

/// Records needed to carry `len` bytes as one group.
pub fn record_count(len: usize) -> u64 {
    if len == 0 {
        1
    } else {
        len.div_ceil(MAX_RECORD_DATA) as u64
    }
}

/// The record checksum: two's complement (mod 256) of length + filler + data.
pub fn record_checksum(length: u8, filler: [u8; 3], data: &[u8]) -> u8 {
    let mut sum = length as u32 + filler.iter().map(|&b| b as u32).sum::<u32>();
    for &byte in data {
        sum = sum.wrapping_add(byte as u32);
    }
    (sum as u8).wrapping_neg()
}

/// Encode one record (at most [`MAX_RECORD_DATA`] data bytes).
fn encode_record(data: &[u8]) -> String {
    debug_assert!(data.len() <= MAX_RECORD_DATA);
    let length = data.len() as u8;
    let checksum = record_checksum(length, [0, 0, 0], data);
    format!(":{:02x}000000{}{:02x}\n", length, hex::encode(data), checksum)
}

/// Encode a buffer as one group of records.
pub fn encode_buffer(data: &[u8]) -> String {
    let mut out = String::new();
    let mut rest = data;
    while rest.len() > MAX_RECORD_DATA {
        let (head, tail) = rest.split_at(MAX_RECORD_DATA);
        out.push_str(&encode_record(head));
        rest = tail;
    }
    out.push_str(&encode_record(rest));
    out
}

fn hex_byte(digits: &str) -> MetaResult<u8> {
    u8::from_str_radix(digits, 16)
        .map_err(|_| MetaError::format(format!("invalid hex digits `{digits}` in record")))
}

/// Parse and verify one record line (no trailing newline).
pub fn parse_record(line: &str) -> MetaResult<Vec<u8>> {
    if !line.is_ascii() {
        return Err(MetaError::format("record contains non-ascii bytes"));
    }
    if !line.starts_with(':') || line.len() < 11 {
        return Err(MetaError::format("malformed record header"));
    }
    let length = hex_byte(&line[1..3])? as usize;
    let filler = [
        hex_byte(&line[3..5])?,
        hex_byte(&line[5..7])?,
        hex_byte(&line[7..9])?,
    ];
    if filler != [0, 0, 0] {
        return Err(MetaError::format("non-zero filler bytes in record"));
    }
    if line.len() != 9 + length * 2 + 2 {
        return Err(MetaError::format(format!(
            "record length byte {length} does not match the line width"
        )));
    }
    let data = hex::decode(&line[9..9 + length * 2])
        .map_err(|_| MetaError::format("invalid hex digits in record data"))?;
    let actual = hex_byte(&line[9 + length * 2..])?;
    let expected = record_checksum(length as u8, filler, &data);
    if actual != expected {
        return Err(MetaError::Checksum { expected, actual });
    }
    Ok(data)
}

/// Record reader over a line-oriented carrier.
pub struct HexLineReader<R> {
    inner: R,
    line_buf: String,
}

impl<R: BufRead> HexLineReader<R> {
    pub fn new(inner: R) -> Self {
        HexLineReader {
            inner,
            line_buf: String::new(),
        }
    }

    /// Read and verify the next record, whatever its length.
    ///
    /// Used for tag lookahead, where the expected byte count is unknown.
    pub fn read_record(&mut self) -> MetaResult<Vec<u8>> {
        self.line_buf.clear();
        let read = self.inner.read_line(&mut self.line_buf)?;
        if read == 0 {
            return Err(MetaError::format("unexpected end of file inside the envelope"));
        }
        parse_record(self.line_buf.trim_end_matches(['\r', '\n']))
    }

    /// Read one group known to carry exactly `expected` bytes.
    pub fn read_exact_group(&mut self, expected: usize) -> MetaResult<Vec<u8>> {
        let records = record_count(expected);
        let mut out = Vec::with_capacity(expected);
        for index in 0..records {
            let data = self.read_record()?;
            if index + 1 < records && data.len() != MAX_RECORD_DATA {
                return Err(MetaError::format(
                    "short record inside a multi-record group",
                ));
            }
            out.extend_from_slice(&data);
        }
        if out.len() != expected {
            return Err(MetaError::format(format!(
                "group decoded {} bytes where {expected} were expected",
                out.len()
            )));
        }
        Ok(out)
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

/// Record writer that counts emitted lines.
///
/// The line count feeds the counters line the trailer locator relies on, so
/// every write path goes through here.
pub struct HexLineWriter<W> {
    inner: W,
    lines: u64,
}

impl<W: Write> HexLineWriter<W> {
    pub fn new(inner: W) -> Self {
        HexLineWriter { inner, lines: 0 }
    }

    /// Write one buffer as one group.
    pub fn write_group(&mut self, data: &[u8]) -> MetaResult<()> {
        self.inner.write_all(encode_buffer(data).as_bytes())?;
        self.lines += record_count(data.len());
        Ok(())
    }

    /// Write a literal line verbatim (the fixed end-of-file line).
    pub fn write_literal_line(&mut self, line: &str) -> MetaResult<()> {
        self.inner.write_all(line.as_bytes())?;
        self.inner.write_all(b"\n")?;
        self.lines += 1;
        Ok(())
    }

    pub fn lines_written(&self) -> LineOffset {
        LineOffset(self.lines)
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
