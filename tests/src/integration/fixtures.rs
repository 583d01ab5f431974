//! Shared field sets and fake outbound ports.

use std::path::Path;

use chariot_envelope::adapters::external::Sha2FileHasher;
use chariot_envelope::{
    FieldSet, MetaResult, MetadataService, MimePayload, Sha256Digest, VersionId, VersionProvider,
};
use rand::{Rng, SeedableRng};

/// Version provider pinned to a fixed answer.
pub struct FixedVersion(pub Option<VersionId>);

impl VersionProvider for FixedVersion {
    fn last_commit_id(&self, _: &Path) -> MetaResult<Option<VersionId>> {
        Ok(self.0)
    }
}

/// A field set with every optional field populated.
pub fn full_field_set() -> FieldSet {
    let mut fields = FieldSet::new(
        Sha256Digest::from_hex(&"1c".repeat(32)).unwrap(),
        b"!CHARIOTMETAFORMAT_2019a".to_vec(),
        VersionId::from_commit_hex(&"9e".repeat(20)).unwrap(),
    );
    fields.supplement = Some(MimePayload::new(
        deterministic_bytes(1000, 7),
        b"application/pdf".to_vec(),
    ));
    fields.blockchain_path = Some(b"ethereum/mainnet".to_vec());
    fields.license = Some(b"BSD-3-Clause".to_vec());
    fields.software_id = Some(b"pump-controller-fw".to_vec());
    fields.static_analysis = Some(MimePayload::new(
        b"no findings".to_vec(),
        b"text/plain".to_vec(),
    ));
    fields
}

/// Reproducible pseudo-random payload bytes.
pub fn deterministic_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen()).collect()
}

/// Service wired for carriers that need no object tooling.
pub type FileService = MetadataService<
    Sha2FileHasher,
    FixedVersion,
    NoObjectTool,
    NoAssembler,
>;

pub fn file_service(version: Option<VersionId>) -> FileService {
    MetadataService::new(Sha2FileHasher, FixedVersion(version), NoObjectTool, NoAssembler)
}

/// Object tool for tests that never reach the ELF carrier.
pub struct NoObjectTool;

impl chariot_envelope::ObjectTool for NoObjectTool {
    fn has_section(&self, _: &Path, _: &str) -> MetaResult<bool> {
        unreachable!("test does not use the ELF carrier")
    }
    fn dump_section(&self, _: &Path, _: &str, _: &Path) -> MetaResult<()> {
        unreachable!("test does not use the ELF carrier")
    }
    fn install_section(&self, _: &Path, _: &str, _: &Path, _: bool) -> MetaResult<()> {
        unreachable!("test does not use the ELF carrier")
    }
    fn symbol_table(&self, _: &Path) -> MetaResult<Vec<chariot_envelope::SectionSymbol>> {
        unreachable!("test does not use the ELF carrier")
    }
}

pub struct NoAssembler;

impl chariot_envelope::BlobAssembler for NoAssembler {
    fn assemble(&self, _: &[u8], _: &str, _: &str, _: &Path) -> MetaResult<()> {
        unreachable!("test does not use the ELF carrier")
    }
}
