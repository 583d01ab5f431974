//! # Metadata Service
//!
//! Application service implementing the inbound API over the carrier
//! adapters. The outbound collaborators are injected, so the whole service
//! runs against fakes in tests.
//!
//! Field assembly is identical for every carrier; only the hash source and
//! the final byte installation differ.

use std::path::Path;

use crate::adapters::{binary, elf, hex};
use crate::domain::envelope::{DecodedFields, FieldSet, WantedTags};
use crate::domain::errors::MetaResult;
use crate::domain::value_objects::{EnvelopeConfig, Sha256Digest, VersionId};
use crate::ports::inbound::{AddRequest, MetadataApi};
use crate::ports::outbound::{BlobAssembler, FileHasher, ObjectTool, VersionProvider};

/// The one service behind the CLI.
pub struct MetadataService<H, V, O, A> {
    hasher: H,
    versions: V,
    object_tool: O,
    assembler: A,
    config: EnvelopeConfig,
}

impl<H, V, O, A> MetadataService<H, V, O, A>
where
    H: FileHasher,
    V: VersionProvider,
    O: ObjectTool,
    A: BlobAssembler,
{
    pub fn new(hasher: H, versions: V, object_tool: O, assembler: A) -> Self {
        Self::with_config(hasher, versions, object_tool, assembler, EnvelopeConfig::default())
    }

    pub fn with_config(
        hasher: H,
        versions: V,
        object_tool: O,
        assembler: A,
        config: EnvelopeConfig,
    ) -> Self {
        MetadataService {
            hasher,
            versions,
            object_tool,
            assembler,
            config,
        }
    }

    pub fn config(&self) -> &EnvelopeConfig {
        &self.config
    }

    /// The version field value: last commit touching the input, or the
    /// zero sentinel when no answer is available. Never an error.
    fn version_of(&self, input: &Path) -> MetaResult<VersionId> {
        match self.versions.last_commit_id(input)? {
            Some(version) => Ok(version),
            None => {
                tracing::warn!(
                    "[meta] no version information for {}, embedding the zero sentinel",
                    input.display()
                );
                Ok(VersionId::sentinel())
            }
        }
    }

    /// Hash resolution shared by the binary and hex carriers.
    fn whole_file_sha(&self, request: &AddRequest) -> MetaResult<Sha256Digest> {
        match request.sha_override {
            Some(sha) => Ok(sha),
            None => self.hasher.sha256_of_file(&request.input),
        }
    }

    /// ELF hash resolution: the boot section's bytes when one is named.
    fn elf_sha(&self, request: &AddRequest) -> MetaResult<Sha256Digest> {
        if let Some(sha) = request.sha_override {
            return Ok(sha);
        }
        match &request.boot_section {
            Some(section) => {
                elf::hash_section(&self.object_tool, &self.hasher, &request.input, section)
            }
            None => self.hasher.sha256_of_file(&request.input),
        }
    }

    fn build_fields(&self, request: &AddRequest, sha256: Sha256Digest) -> MetaResult<FieldSet> {
        let mut fields = FieldSet::new(
            sha256,
            self.config.format.as_bytes().to_vec(),
            self.version_of(&request.input)?,
        );
        fields.supplement = request.supplement.clone();
        fields.blockchain_path = request.blockchain_path.clone();
        fields.license = request.license.clone();
        fields.software_id = request.software_id.clone();
        fields.static_analysis = request.static_analysis.clone();
        Ok(fields)
    }
}

impl<H, V, O, A> MetadataApi for MetadataService<H, V, O, A>
where
    H: FileHasher,
    V: VersionProvider,
    O: ObjectTool,
    A: BlobAssembler,
{
    fn add_binary(&self, request: &AddRequest) -> MetaResult<()> {
        let sha = self.whole_file_sha(request)?;
        let fields = self.build_fields(request, sha)?;
        binary::add(&request.input, &request.output, &fields)
    }

    fn add_binary_raw(&self, input: &Path, output: &Path, envelope: &[u8]) -> MetaResult<()> {
        binary::add_raw(input, output, envelope)
    }

    fn extract_binary(&self, input: &Path, wanted: &WantedTags) -> MetaResult<DecodedFields> {
        binary::extract(input, wanted)
    }

    fn extract_binary_raw(&self, input: &Path) -> MetaResult<Vec<u8>> {
        binary::extract_raw(input)
    }

    fn add_hex(&self, request: &AddRequest) -> MetaResult<()> {
        let sha = self.whole_file_sha(request)?;
        let fields = self.build_fields(request, sha)?;
        hex::add(&request.input, &request.output, &fields)
    }

    fn add_hex_raw(&self, input: &Path, output: &Path, envelope: &[u8]) -> MetaResult<()> {
        hex::add_raw(input, output, envelope)
    }

    fn extract_hex(&self, input: &Path, wanted: &WantedTags) -> MetaResult<DecodedFields> {
        hex::extract(input, wanted, &self.config)
    }

    fn extract_hex_raw(&self, input: &Path) -> MetaResult<Vec<u8>> {
        hex::extract_raw(input, &self.config)
    }

    fn add_elf(&self, request: &AddRequest) -> MetaResult<()> {
        let sha = self.elf_sha(request)?;
        let fields = self.build_fields(request, sha)?;
        elf::add(
            &self.object_tool,
            &self.assembler,
            &request.input,
            &request.output,
            &fields,
            &self.config,
        )
    }

    fn extract_elf(&self, input: &Path, wanted: &WantedTags) -> MetaResult<DecodedFields> {
        elf::extract(&self.object_tool, input, wanted, &self.config)
    }

    fn extract_elf_raw(&self, input: &Path) -> MetaResult<Vec<u8>> {
        elf::extract_raw(&self.object_tool, input, &self.config)
    }
}
