//! ELF carrier: the service flow over fake object tooling.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chariot_envelope::adapters::external::Sha2FileHasher;
use chariot_envelope::{
    AddRequest, BlobAssembler, FieldTag, FileHasher, MetaError, MetaResult, MetadataApi,
    MetadataService, MimePayload, ObjectTool, SectionSymbol, WantedTags,
};

use super::fixtures::FixedVersion;

const FAKE_HEADER: &[u8] = b"\x7fELF-fake-relocatable";

/// Object tool backed by an in-memory section store.
#[derive(Default)]
struct FakeTool {
    sections: RefCell<HashMap<(PathBuf, String), Vec<u8>>>,
}

impl FakeTool {
    fn seed(&self, file: &Path, section: &str, contents: &[u8]) {
        self.sections
            .borrow_mut()
            .insert((file.to_path_buf(), section.to_string()), contents.to_vec());
    }
}

impl ObjectTool for FakeTool {
    fn has_section(&self, file: &Path, section: &str) -> MetaResult<bool> {
        Ok(self
            .sections
            .borrow()
            .contains_key(&(file.to_path_buf(), section.to_string())))
    }

    fn dump_section(&self, file: &Path, section: &str, out: &Path) -> MetaResult<()> {
        let sections = self.sections.borrow();
        let contents = sections
            .get(&(file.to_path_buf(), section.to_string()))
            .ok_or_else(|| MetaError::ExternalTool {
                command: "objcopy".to_string(),
                status: 1,
            })?;
        std::fs::write(out, contents)?;
        Ok(())
    }

    fn install_section(
        &self,
        file: &Path,
        section: &str,
        contents: &Path,
        _update: bool,
    ) -> MetaResult<()> {
        let bytes = std::fs::read(contents)?;
        self.seed(file, section, &bytes);
        Ok(())
    }

    fn symbol_table(&self, object: &Path) -> MetaResult<Vec<SectionSymbol>> {
        let len = std::fs::metadata(object)?.len();
        Ok(vec![SectionSymbol {
            name: "chariotmeta_envelope_data".to_string(),
            file_offset: FAKE_HEADER.len() as u64,
            size: len - FAKE_HEADER.len() as u64,
        }])
    }
}

/// Assembler that prefixes a fake object header, so symbol offsets are
/// genuinely non-zero.
struct FakeAssembler;

impl BlobAssembler for FakeAssembler {
    fn assemble(&self, blob: &[u8], _symbol: &str, _section: &str, out: &Path) -> MetaResult<()> {
        let mut object = FAKE_HEADER.to_vec();
        object.extend_from_slice(blob);
        std::fs::write(out, object)?;
        Ok(())
    }
}

type ElfService = MetadataService<Sha2FileHasher, FixedVersion, FakeTool, FakeAssembler>;

fn elf_service() -> ElfService {
    MetadataService::new(Sha2FileHasher, FixedVersion(None), FakeTool::default(), FakeAssembler)
}

#[test]
fn add_extract_roundtrip_over_sections() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("fw.elf");
    let output = dir.path().join("fw.meta.elf");
    std::fs::write(&input, b"pretend elf image").unwrap();

    let service = elf_service();
    let mut request = AddRequest::new(&input, &output);
    request.license = Some(b"GPL-2.0".to_vec());
    service.add_elf(&request).unwrap();

    let decoded = service.extract_elf(&output, &WantedTags::All).unwrap();
    assert_eq!(
        decoded.get(FieldTag::Format).unwrap().data,
        b"!CHARIOTMETAFORMAT_2019a"
    );
    assert_eq!(decoded.get(FieldTag::License).unwrap().data, b"GPL-2.0");
    // No version provider answer: the zero sentinel is embedded.
    assert_eq!(decoded.get(FieldTag::Version).unwrap().data, vec![0u8; 32]);
}

#[test]
fn boot_section_hash_covers_only_that_section() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("fw.elf");
    let output = dir.path().join("fw.meta.elf");
    std::fs::write(&input, b"whole image, not hashed").unwrap();

    let boot_bytes = b"boot section contents";
    let tool = FakeTool::default();
    tool.seed(&input, ".boot", boot_bytes);
    let service = MetadataService::new(Sha2FileHasher, FixedVersion(None), tool, FakeAssembler);

    let mut request = AddRequest::new(&input, &output);
    request.boot_section = Some(".boot".to_string());
    service.add_elf(&request).unwrap();

    let expected = {
        let file = dir.path().join("boot-copy");
        std::fs::write(&file, boot_bytes).unwrap();
        Sha2FileHasher.sha256_of_file(&file).unwrap()
    };
    let decoded = service
        .extract_elf(&output, &WantedTags::of(&[FieldTag::Sha256]))
        .unwrap();
    assert_eq!(
        decoded.get(FieldTag::Sha256).unwrap().data,
        expected.as_bytes()
    );
}

#[test]
fn supplement_is_installed_in_its_own_section() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("fw.elf");
    let output = dir.path().join("fw.meta.elf");
    std::fs::write(&input, b"elf").unwrap();

    let service = elf_service();
    let mut request = AddRequest::new(&input, &output);
    request.supplement = Some(MimePayload::new(b"extra".to_vec(), b"text/plain".to_vec()));
    service.add_elf(&request).unwrap();

    // The envelope also records the supplement in-band.
    let decoded = service
        .extract_elf(&output, &WantedTags::of(&[FieldTag::Supplement]))
        .unwrap();
    let supplement = decoded.get(FieldTag::Supplement).unwrap();
    assert_eq!(supplement.data, b"extra");
    assert_eq!(supplement.mime.as_deref(), Some(b"text/plain".as_ref()));
}

#[test]
fn a_failing_tool_surfaces_its_status() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("no-metadata.elf");
    std::fs::write(&input, b"elf").unwrap();

    let service = elf_service();
    let err = service.extract_elf(&input, &WantedTags::All).unwrap_err();
    match err {
        MetaError::ExternalTool { status, .. } => assert_eq!(status, 1),
        other => panic!("expected an external tool error, got {other:?}"),
    }
}
