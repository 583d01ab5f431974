//! # Outbound Ports (Driven Ports)
//!
//! Collaborators the metadata service requires but does not implement:
//! content hashing, source-control version lookup and ELF object tooling.
//!
//! Production adapters live under `adapters/external`; tests substitute
//! in-memory fakes.

use std::path::Path;

use crate::domain::errors::MetaResult;
use crate::domain::value_objects::{Sha256Digest, VersionId};

/// Content hashing of a file on disk.
///
/// Production: `Sha2FileHasher` (streaming, in-process).
pub trait FileHasher {
    fn sha256_of_file(&self, path: &Path) -> MetaResult<Sha256Digest>;
}

/// "Last commit id touching this file" lookup.
///
/// Production: `GitVersionProvider`. An unavailable answer is `Ok(None)`;
/// the service substitutes the zero sentinel with a warning; it is never an
/// error.
pub trait VersionProvider {
    fn last_commit_id(&self, path: &Path) -> MetaResult<Option<VersionId>>;
}

/// One symbol of a relocatable object, positioned within the object file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSymbol {
    pub name: String,
    /// Byte offset of the symbol's data inside the object file.
    pub file_offset: u64,
    pub size: u64,
}

/// ELF section manipulation.
///
/// Production: `BinutilsObjectTool` shelling out to `objcopy`/`readelf`.
/// A non-zero tool status is always an error; partial output is discarded.
pub trait ObjectTool {
    /// Whether `file` already carries a section named `section`.
    fn has_section(&self, file: &Path, section: &str) -> MetaResult<bool>;

    /// Copy the raw contents of `section` into `out`.
    fn dump_section(&self, file: &Path, section: &str, out: &Path) -> MetaResult<()>;

    /// Install `contents` as section `section` of `file`, in place, with
    /// flags `noload,readonly`. `update` replaces an existing section.
    fn install_section(
        &self,
        file: &Path,
        section: &str,
        contents: &Path,
        update: bool,
    ) -> MetaResult<()>;

    /// The symbol table of a relocatable object.
    fn symbol_table(&self, object: &Path) -> MetaResult<Vec<SectionSymbol>>;
}

/// Turns a byte blob into a relocatable object defining one named symbol
/// in one named section.
///
/// Production: `GnuBlobAssembler` (generated assembly through the system
/// toolchain).
pub trait BlobAssembler {
    fn assemble(&self, blob: &[u8], symbol: &str, section: &str, out: &Path) -> MetaResult<()>;
}
