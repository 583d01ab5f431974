//! Binary carrier: reference bytes and trailer invariants.

use chariot_envelope::{
    AddRequest, FieldSet, FieldTag, MetadataApi, Sha256Digest, VersionId, WantedTags,
};

use super::fixtures::{deterministic_bytes, file_service, full_field_set};

/// The minimal envelope, byte for byte. Every width in the layout shows up
/// in the final trailer value: 12 + 8 + 32 + 5 + 4 + 24 + 9 + 32 + 2 + 4.
#[test]
fn minimal_envelope_reference_bytes() {
    let sha = [0x1c; 32];
    let version = VersionId::from_commit_hex(&"9e".repeat(20)).unwrap();
    let fields = FieldSet::new(
        Sha256Digest(sha),
        b"!CHARIOTMETAFORMAT_2019a".to_vec(),
        version,
    );
    let envelope = chariot_envelope::domain::binary::encode_envelope(&fields).unwrap();

    let mut expected = Vec::new();
    expected.extend_from_slice(b":chariot_md:");
    expected.extend_from_slice(b":sha256:");
    expected.extend_from_slice(&sha);
    expected.extend_from_slice(b":fmt:");
    expected.extend_from_slice(&24u32.to_be_bytes());
    expected.extend_from_slice(b"!CHARIOTMETAFORMAT_2019a");
    expected.extend_from_slice(b":version:");
    expected.extend_from_slice(version.as_bytes());
    expected.extend_from_slice(b"::");
    expected.extend_from_slice(&0x84u32.to_be_bytes());

    assert_eq!(envelope, expected);
    assert_eq!(envelope.len(), 0x84);
}

#[test]
fn add_extract_roundtrip_with_every_field() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("fw.bin");
    let output = dir.path().join("fw.meta.bin");
    std::fs::write(&input, deterministic_bytes(4096, 1)).unwrap();

    let fields = full_field_set();
    let service = file_service(Some(fields.version));
    let mut request = AddRequest::new(&input, &output);
    request.sha_override = Some(fields.sha256);
    request.supplement = fields.supplement.clone();
    request.blockchain_path = fields.blockchain_path.clone();
    request.license = fields.license.clone();
    request.software_id = fields.software_id.clone();
    request.static_analysis = fields.static_analysis.clone();
    service.add_binary(&request).unwrap();

    let decoded = service.extract_binary(&output, &WantedTags::All).unwrap();
    assert_eq!(
        decoded.get(FieldTag::Sha256).unwrap().data,
        fields.sha256.as_bytes()
    );
    let supplement = decoded.get(FieldTag::Supplement).unwrap();
    assert_eq!(supplement.data, fields.supplement.as_ref().unwrap().data);
    assert_eq!(
        supplement.mime.as_deref(),
        Some(b"application/pdf".as_ref())
    );
    assert_eq!(
        decoded.get(FieldTag::SoftwareId).unwrap().data,
        b"pump-controller-fw"
    );
}

#[test]
fn extracted_envelope_reinstalls_on_another_image() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("fw.bin");
    let output = dir.path().join("fw.meta.bin");
    std::fs::write(&input, deterministic_bytes(2048, 3)).unwrap();

    let fields = full_field_set();
    let service = file_service(Some(fields.version));
    let mut request = AddRequest::new(&input, &output);
    request.sha_override = Some(fields.sha256);
    request.license = fields.license.clone();
    service.add_binary(&request).unwrap();

    // The whole-envelope extract feeds a raw re-add on a fresh image.
    let blob = service.extract_binary_raw(&output).unwrap();
    let other_input = dir.path().join("other.bin");
    let other_output = dir.path().join("other.meta.bin");
    std::fs::write(&other_input, deterministic_bytes(100, 4)).unwrap();
    service
        .add_binary_raw(&other_input, &other_output, &blob)
        .unwrap();

    let decoded = service
        .extract_binary(&other_output, &WantedTags::All)
        .unwrap();
    assert_eq!(
        decoded.get(FieldTag::Sha256).unwrap().data,
        fields.sha256.as_bytes()
    );
    assert_eq!(decoded.get(FieldTag::License).unwrap().data, b"BSD-3-Clause");
}

#[test]
fn computed_sha_matches_the_input_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("fw.bin");
    let output = dir.path().join("fw.meta.bin");
    std::fs::write(&input, b"abc").unwrap();

    let service = file_service(None);
    service.add_binary(&AddRequest::new(&input, &output)).unwrap();

    let decoded = service
        .extract_binary(&output, &WantedTags::of(&[FieldTag::Sha256]))
        .unwrap();
    assert_eq!(
        hex::encode(&decoded.get(FieldTag::Sha256).unwrap().data),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn truncated_output_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("fw.bin");
    let output = dir.path().join("fw.meta.bin");
    std::fs::write(&input, b"payload").unwrap();

    let service = file_service(None);
    service.add_binary(&AddRequest::new(&input, &output)).unwrap();

    let mut bytes = std::fs::read(&output).unwrap();
    bytes.pop();
    std::fs::write(&output, &bytes).unwrap();

    assert!(service.extract_binary(&output, &WantedTags::All).is_err());
}

#[test]
fn trailer_longer_than_the_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("fw.meta.bin");
    let mut bytes = vec![0u8; 200];
    let len = bytes.len();
    bytes[len - 4..].copy_from_slice(&10_000u32.to_be_bytes());
    std::fs::write(&output, &bytes).unwrap();

    let service = file_service(None);
    assert!(service.extract_binary(&output, &WantedTags::All).is_err());
}

#[test]
fn unannotated_file_is_rejected_not_misread() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("plain.bin");
    std::fs::write(&output, deterministic_bytes(500, 2)).unwrap();

    let service = file_service(None);
    assert!(service.extract_binary(&output, &WantedTags::All).is_err());
}
