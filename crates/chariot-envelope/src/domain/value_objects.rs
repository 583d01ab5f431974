//! # Domain Value Objects
//!
//! Typed values shared by the codecs and carrier adapters.
//!
//! The hex carrier positions by *line counts* while the binary carrier
//! positions by *byte counts*. `LineOffset` and `ByteOffset` exist so the
//! two can never be mixed up silently.

use std::fmt;

/// Width of the sha-256 field on every carrier.
pub const SHA256_LEN: usize = 32;

/// Width of the version field, uniform across carriers. A full 40-digit
/// hex commit id occupies 20 bytes; the rest is zero padding.
pub const VERSION_LEN: usize = 32;

/// A count of carrier lines (hex carrier positioning unit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct LineOffset(pub u64);

/// A count of carrier bytes (binary carrier positioning unit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ByteOffset(pub u64);

impl fmt::Display for LineOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} lines", self.0)
    }
}

impl fmt::Display for ByteOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "byte {}", self.0)
    }
}

/// A sha-256 digest as stored in the envelope.
///
/// Opaque to the codec: it is stored and returned, never verified here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sha256Digest(pub [u8; SHA256_LEN]);

impl Sha256Digest {
    /// All-zero digest, used by tests and as a placeholder.
    pub fn zero() -> Self {
        Sha256Digest([0u8; SHA256_LEN])
    }

    /// Parse from a 64-digit hex string (the `sha256sum` output form).
    pub fn from_hex(s: &str) -> Option<Self> {
        let raw = hex::decode(s.trim()).ok()?;
        let bytes: [u8; SHA256_LEN] = raw.try_into().ok()?;
        Some(Sha256Digest(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; SHA256_LEN] {
        &self.0
    }
}

impl fmt::Display for Sha256Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// A source-control version id, zero-padded to [`VERSION_LEN`] bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionId([u8; VERSION_LEN]);

impl VersionId {
    /// The all-zero sentinel substituted when version lookup is unavailable.
    pub fn sentinel() -> Self {
        VersionId([0u8; VERSION_LEN])
    }

    /// Build from a hex commit id (40 hex digits for a full git sha),
    /// zero-padding on the right up to the fixed field width.
    pub fn from_commit_hex(s: &str) -> Option<Self> {
        let raw = hex::decode(s.trim()).ok()?;
        if raw.is_empty() || raw.len() > VERSION_LEN {
            return None;
        }
        let mut bytes = [0u8; VERSION_LEN];
        bytes[..raw.len()].copy_from_slice(&raw);
        Some(VersionId(bytes))
    }

    pub fn from_bytes(bytes: [u8; VERSION_LEN]) -> Self {
        VersionId(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; VERSION_LEN] {
        &self.0
    }

    /// True when this is the unavailable-version sentinel.
    pub fn is_sentinel(&self) -> bool {
        self.0 == [0u8; VERSION_LEN]
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Envelope configuration.
///
/// Defaults are the CHARIOT 2019a constants; everything the codecs and
/// adapters parameterize over lives here.
#[derive(Debug, Clone)]
pub struct EnvelopeConfig {
    /// Format identifier embedded in the `fmt` field.
    pub format: String,
    /// ELF section holding the envelope.
    pub meta_section: String,
    /// ELF section holding the supplementary payload.
    pub suppl_section: String,
    /// Symbol the envelope blob is exposed under inside the section object.
    pub envelope_symbol: String,
    /// Symbol the supplementary blob is exposed under.
    pub suppl_symbol: String,
    /// Initial tail window read by the hex trailer locator, in bytes.
    pub tail_window_start: u64,
    /// Tail window growth per locator retry, in bytes.
    pub tail_window_step: u64,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        EnvelopeConfig {
            format: "!CHARIOTMETAFORMAT_2019a".to_string(),
            meta_section: ".chariotmeta.rodata".to_string(),
            suppl_section: ".suppldata".to_string(),
            envelope_symbol: "chariotmeta_envelope_data".to_string(),
            suppl_symbol: "chariotmeta_suppl_data".to_string(),
            tail_window_start: 80,
            tail_window_step: 40,
        }
    }
}
