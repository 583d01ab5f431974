//! # Inbound Port (Driving Port)
//!
//! The metadata API exposed to callers (the `chariot-meta` CLI in
//! production, test harnesses otherwise). One add and one extract
//! operation per carrier; an add never mutates its input file.

use std::path::{Path, PathBuf};

use crate::domain::envelope::{DecodedFields, MimePayload, WantedTags};
use crate::domain::errors::MetaResult;
use crate::domain::value_objects::Sha256Digest;

/// Everything one add operation needs.
///
/// Optional fields absent here are absent from the envelope. A supplied
/// `sha_override` bypasses hashing entirely.
#[derive(Debug, Clone)]
pub struct AddRequest {
    /// Firmware image to annotate (never modified).
    pub input: PathBuf,
    /// Destination for the annotated copy.
    pub output: PathBuf,
    pub supplement: Option<MimePayload>,
    pub blockchain_path: Option<Vec<u8>>,
    pub license: Option<Vec<u8>>,
    pub software_id: Option<Vec<u8>>,
    pub static_analysis: Option<MimePayload>,
    pub sha_override: Option<Sha256Digest>,
    /// ELF only: hash this section instead of the whole file.
    pub boot_section: Option<String>,
}

impl AddRequest {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        AddRequest {
            input: input.into(),
            output: output.into(),
            supplement: None,
            blockchain_path: None,
            license: None,
            software_id: None,
            static_analysis: None,
            sha_override: None,
            boot_section: None,
        }
    }
}

/// The metadata operations, one pair per carrier.
pub trait MetadataApi {
    /// Annotate a raw binary image: copy it and append the envelope.
    fn add_binary(&self, request: &AddRequest) -> MetaResult<()>;

    /// Extract fields from an annotated binary image.
    fn extract_binary(&self, input: &Path, wanted: &WantedTags) -> MetaResult<DecodedFields>;

    /// Extract the whole envelope of a binary image, trailer included.
    fn extract_binary_raw(&self, input: &Path) -> MetaResult<Vec<u8>>;

    /// Annotate a binary image with a pre-made envelope blob, appended
    /// verbatim instead of generated from fields.
    fn add_binary_raw(&self, input: &Path, output: &Path, envelope: &[u8]) -> MetaResult<()>;

    /// Annotate a hex image: copy its payload lines and append the
    /// envelope groups, counters line and end-of-file line.
    fn add_hex(&self, request: &AddRequest) -> MetaResult<()>;

    /// Annotate a hex image with pre-made envelope lines; the counters
    /// line is rewritten for the new payload.
    fn add_hex_raw(&self, input: &Path, output: &Path, envelope: &[u8]) -> MetaResult<()>;

    /// Extract fields from an annotated hex image.
    fn extract_hex(&self, input: &Path, wanted: &WantedTags) -> MetaResult<DecodedFields>;

    /// Extract the envelope lines of a hex image verbatim.
    fn extract_hex_raw(&self, input: &Path) -> MetaResult<Vec<u8>>;

    /// Annotate an ELF image: install the envelope as a metadata section.
    fn add_elf(&self, request: &AddRequest) -> MetaResult<()>;

    /// Extract fields from an annotated ELF image.
    fn extract_elf(&self, input: &Path, wanted: &WantedTags) -> MetaResult<DecodedFields>;

    /// Extract the raw envelope blob from an ELF image's metadata section.
    fn extract_elf_raw(&self, input: &Path) -> MetaResult<Vec<u8>>;
}
