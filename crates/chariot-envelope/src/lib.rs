//! # CHARIOT Provenance Envelope
//!
//! Firmware provenance metadata as a self-describing tagged envelope,
//! embedded into the image it describes: appended behind a raw binary,
//! woven into the line structure of a hex image, or installed as a
//! dedicated section of an ELF file. An annotated image stays a valid
//! image of its kind; the metadata rides along.
//!
//! ```text
//! :chariot_md: :sha256:<32> :fmt:<len><str> [:add:<len><data>:<len><mime>]
//! :version:<32> [:bcpath:…] [:lic:…] [:soft:…] [:sca:…] :: <u32 total>
//! ```
//!
//! The trailing u32 counts the whole envelope including itself, so a
//! reader can find the envelope from the end of a binary image with one
//! backward seek. Hex images carry the same information as a counters
//! line; ELF images need neither, the section is the anchor.
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Field registry, both codecs, the trailer locator
//! - `ports/` - Inbound API trait and outbound collaborator traits
//! - `adapters/` - Carrier file handling and production collaborators
//! - `service/` - The application service the CLI drives
//!
//! ## Usage
//!
//! ```ignore
//! use chariot_envelope::{AddRequest, MetadataApi, MetadataService};
//! use chariot_envelope::adapters::external::{
//!     BinutilsObjectTool, GitVersionProvider, GnuBlobAssembler, Sha2FileHasher,
//! };
//!
//! let service = MetadataService::new(
//!     Sha2FileHasher,
//!     GitVersionProvider,
//!     BinutilsObjectTool,
//!     GnuBlobAssembler,
//! );
//! service.add_binary(&AddRequest::new("fw.bin", "fw.meta.bin"))?;
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-export key types for convenience
pub use domain::envelope::{DecodedField, DecodedFields, FieldSet, MimePayload, WantedTags};
pub use domain::errors::{MetaError, MetaResult};
pub use domain::fields::{FieldTag, EOF_LINE, MAGIC};
pub use domain::locator::EnvelopeLocation;
pub use domain::value_objects::{
    ByteOffset, EnvelopeConfig, LineOffset, Sha256Digest, VersionId,
};
pub use ports::inbound::{AddRequest, MetadataApi};
pub use ports::outbound::{
    BlobAssembler, FileHasher, ObjectTool, SectionSymbol, VersionProvider,
};
pub use service::MetadataService;
