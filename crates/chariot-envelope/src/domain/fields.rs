//! # Field Registry
//!
//! The single ordered schema of envelope fields. Both envelope codecs, on
//! both the encode and decode side, walk this table, so the field order is
//! never duplicated in code.
//!
//! Presence of an optional field is signaled in-band: the tag that follows
//! the previous field decides, there is no bitmap. The terminal `::`
//! sentinel reads as an empty tag label.

use super::errors::{MetaError, MetaResult};
use super::value_objects::{SHA256_LEN, VERSION_LEN};

/// Magic marker opening every envelope.
pub const MAGIC: &[u8] = b":chariot_md:";

/// Terminal sentinel written before the trailer.
pub const TERMINATOR: &[u8] = b"::";

/// Fixed end-of-file line of the hex carrier.
pub const EOF_LINE: &str = ":00000001FF";

/// Identifies one metadata field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldTag {
    /// Content hash of the firmware (or of the boot section for ELF).
    Sha256,
    /// Format identifier string.
    Format,
    /// Optional supplementary payload with a mime string.
    Supplement,
    /// Source-control version id.
    Version,
    /// Targeted blockchain identification.
    BlockchainPath,
    /// Firmware license.
    License,
    /// Software id.
    SoftwareId,
    /// Static analysis result with a mime string.
    StaticAnalysis,
}

impl FieldTag {
    /// The bare tag label as it appears between colons.
    pub fn label(self) -> &'static str {
        match self {
            FieldTag::Sha256 => "sha256",
            FieldTag::Format => "fmt",
            FieldTag::Supplement => "add",
            FieldTag::Version => "version",
            FieldTag::BlockchainPath => "bcpath",
            FieldTag::License => "lic",
            FieldTag::SoftwareId => "soft",
            FieldTag::StaticAnalysis => "sca",
        }
    }

    /// The full in-band literal, colons included.
    pub fn literal(self) -> &'static str {
        match self {
            FieldTag::Sha256 => ":sha256:",
            FieldTag::Format => ":fmt:",
            FieldTag::Supplement => ":add:",
            FieldTag::Version => ":version:",
            FieldTag::BlockchainPath => ":bcpath:",
            FieldTag::License => ":lic:",
            FieldTag::SoftwareId => ":soft:",
            FieldTag::StaticAnalysis => ":sca:",
        }
    }

    /// Reverse lookup from a label observed in the carrier.
    pub fn from_label(label: &[u8]) -> Option<FieldTag> {
        FIELD_SCHEMA
            .iter()
            .map(|spec| spec.tag)
            .find(|tag| tag.label().as_bytes() == label)
    }
}

/// How a field's payload is laid out after its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldEncoding {
    /// Exactly this many payload bytes, no length prefix.
    Fixed(usize),
    /// u32 big-endian length, then that many bytes.
    LengthPrefixed,
    /// Length-prefixed bytes, then `:`, then a length-prefixed mime string.
    LengthPrefixedWithMime,
}

/// One row of the registry.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub tag: FieldTag,
    pub encoding: FieldEncoding,
    pub mandatory: bool,
}

/// The canonical field order. Encoders write present fields in exactly this
/// order; decoders advance through it, matching observed tags.
pub const FIELD_SCHEMA: [FieldSpec; 8] = [
    FieldSpec {
        tag: FieldTag::Sha256,
        encoding: FieldEncoding::Fixed(SHA256_LEN),
        mandatory: true,
    },
    FieldSpec {
        tag: FieldTag::Format,
        encoding: FieldEncoding::LengthPrefixed,
        mandatory: true,
    },
    FieldSpec {
        tag: FieldTag::Supplement,
        encoding: FieldEncoding::LengthPrefixedWithMime,
        mandatory: false,
    },
    FieldSpec {
        tag: FieldTag::Version,
        encoding: FieldEncoding::Fixed(VERSION_LEN),
        mandatory: true,
    },
    FieldSpec {
        tag: FieldTag::BlockchainPath,
        encoding: FieldEncoding::LengthPrefixed,
        mandatory: false,
    },
    FieldSpec {
        tag: FieldTag::License,
        encoding: FieldEncoding::LengthPrefixed,
        mandatory: false,
    },
    FieldSpec {
        tag: FieldTag::SoftwareId,
        encoding: FieldEncoding::LengthPrefixed,
        mandatory: false,
    },
    FieldSpec {
        tag: FieldTag::StaticAnalysis,
        encoding: FieldEncoding::LengthPrefixedWithMime,
        mandatory: false,
    },
];

/// Index of the first field discovered by tag lookahead rather than by a
/// literal match (everything from the supplement onwards).
pub const LOOKAHEAD_START: usize = 2;

/// Walks the lookahead portion of the schema while a decoder matches
/// observed tags against it.
///
/// Both the binary and the hex decoder drive this; neither re-states the
/// field order or the mandatory-field rules.
#[derive(Debug)]
pub struct SchemaWalker {
    idx: usize,
}

impl SchemaWalker {
    pub fn new() -> Self {
        SchemaWalker {
            idx: LOOKAHEAD_START,
        }
    }

    /// True once every schema row has been matched or passed over.
    pub fn done(&self) -> bool {
        self.idx >= FIELD_SCHEMA.len()
    }

    /// Match an observed tag label against the schema, skipping optional
    /// rows, and advance past the matched row.
    pub fn advance(&mut self, label: &[u8]) -> MetaResult<&'static FieldSpec> {
        let tag = FieldTag::from_label(label).ok_or_else(|| {
            MetaError::format(format!(
                "unexpected tag `{}`",
                String::from_utf8_lossy(label)
            ))
        })?;
        let offset = FIELD_SCHEMA[self.idx..]
            .iter()
            .position(|spec| spec.tag == tag)
            .ok_or_else(|| {
                MetaError::format(format!("tag `{}` out of canonical order", tag.label()))
            })?;
        if let Some(skipped) = FIELD_SCHEMA[self.idx..self.idx + offset]
            .iter()
            .find(|spec| spec.mandatory)
        {
            return Err(MetaError::format(format!(
                "mandatory tag `{}` missing",
                skipped.tag.label()
            )));
        }
        let spec = &FIELD_SCHEMA[self.idx + offset];
        self.idx += offset + 1;
        Ok(spec)
    }

    /// Verify no mandatory row remains unmatched.
    pub fn finish(&self) -> MetaResult<()> {
        if let Some(missing) = FIELD_SCHEMA[self.idx..].iter().find(|spec| spec.mandatory) {
            return Err(MetaError::format(format!(
                "mandatory tag `{}` missing",
                missing.tag.label()
            )));
        }
        Ok(())
    }
}

impl Default for SchemaWalker {
    fn default() -> Self {
        Self::new()
    }
}
