//! # Domain Errors
//!
//! Error kinds for envelope encode/decode and the carrier adapters.
//!
//! An envelope is all-or-nothing: every variant propagates to the caller
//! immediately, there is no partial-result recovery. Soft fallbacks (an
//! unavailable version lookup) are warnings at the call site, never errors.

use thiserror::Error;

/// Errors surfaced by the envelope codecs and carrier adapters.
#[derive(Debug, Error)]
pub enum MetaError {
    /// Carrier does not match the expected schema: wrong magic, missing or
    /// unexpected tag, truncated field, malformed record.
    #[error("carrier does not match the envelope format: {reason}")]
    Format { reason: String },

    /// A hex line's checksum does not verify.
    #[error("hex record checksum mismatch: expected {expected:#04x}, got {actual:#04x}")]
    Checksum { expected: u8, actual: u8 },

    /// Post-write verification failed: the output file size differs from the
    /// computed expected size. Always fatal, never silently corrected.
    #[error(
        "output size check failed: file is {actual} bytes, expected payload {payload} + metadata {metadata}"
    )]
    SizeMismatch {
        actual: u64,
        payload: u64,
        metadata: u64,
    },

    /// A delegated collaborator invocation returned a non-zero status. The
    /// computed value is never trusted, even if partial output exists.
    #[error("external command `{command}` failed with status {status}")]
    ExternalTool { command: String, status: i32 },

    /// Local file I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl MetaError {
    pub(crate) fn format(reason: impl Into<String>) -> Self {
        MetaError::Format {
            reason: reason.into(),
        }
    }
}

/// Shorthand result used throughout the crate.
pub type MetaResult<T> = Result<T, MetaError>;
