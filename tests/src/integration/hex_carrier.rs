//! Hex carrier: locator matrix and corruption rejection.

use chariot_envelope::domain::hexline::HexLineWriter;
use chariot_envelope::domain::locator::locate;
use chariot_envelope::{
    AddRequest, EnvelopeConfig, FieldTag, LineOffset, MetadataApi, EOF_LINE, WantedTags,
};

use super::fixtures::{deterministic_bytes, file_service, full_field_set};

/// An input image with exactly `lines` payload records plus the EOF line.
fn hex_input(path: &std::path::Path, lines: u64) {
    let mut writer = HexLineWriter::new(Vec::new());
    for i in 0..lines {
        writer.write_group(&deterministic_bytes(32, i)).unwrap();
    }
    writer.write_literal_line(EOF_LINE).unwrap();
    std::fs::write(path, writer.into_inner()).unwrap();
}

fn annotate(dir: &std::path::Path, payload_lines: u64) -> std::path::PathBuf {
    let input = dir.join(format!("fw-{payload_lines}.hex"));
    let output = dir.join(format!("fw-{payload_lines}.meta.hex"));
    hex_input(&input, payload_lines);

    let fields = full_field_set();
    let service = file_service(Some(fields.version));
    let mut request = AddRequest::new(&input, &output);
    request.sha_override = Some(fields.sha256);
    request.license = fields.license.clone();
    service.add_hex(&request).unwrap();
    output
}

#[test]
fn locator_line_count_matrix() {
    let dir = tempfile::tempdir().unwrap();
    for payload_lines in [0u64, 1, 254, 255, 256] {
        let output = annotate(dir.path(), payload_lines);
        let mut file = std::fs::File::open(&output).unwrap();
        let location = locate(&mut file, &EnvelopeConfig::default()).unwrap();
        assert_eq!(
            location.payload_lines,
            LineOffset(payload_lines),
            "payload of {payload_lines} lines"
        );
    }
}

#[test]
fn locator_handles_a_hundred_thousand_payload_lines() {
    let dir = tempfile::tempdir().unwrap();
    let output = annotate(dir.path(), 100_000);
    let mut file = std::fs::File::open(&output).unwrap();
    let location = locate(&mut file, &EnvelopeConfig::default()).unwrap();
    assert_eq!(location.payload_lines, LineOffset(100_000));
}

#[test]
fn extract_returns_what_add_embedded() {
    let dir = tempfile::tempdir().unwrap();
    let output = annotate(dir.path(), 40);
    let service = file_service(None);

    let fields = full_field_set();
    let decoded = service.extract_hex(&output, &WantedTags::All).unwrap();
    assert_eq!(
        decoded.get(FieldTag::Sha256).unwrap().data,
        fields.sha256.as_bytes()
    );
    assert_eq!(decoded.get(FieldTag::License).unwrap().data, b"BSD-3-Clause");
    assert_eq!(
        decoded.get(FieldTag::Version).unwrap().data,
        fields.version.as_bytes()
    );
    // Fields the request did not carry stay absent.
    assert!(decoded.get(FieldTag::SoftwareId).is_none());
}

#[test]
fn raw_extraction_has_exactly_the_envelope_lines() {
    let dir = tempfile::tempdir().unwrap();
    let output = annotate(dir.path(), 12);
    let service = file_service(None);

    let mut file = std::fs::File::open(&output).unwrap();
    let location = locate(&mut file, &EnvelopeConfig::default()).unwrap();

    let raw = service.extract_hex_raw(&output).unwrap();
    let raw = String::from_utf8(raw).unwrap();
    assert_eq!(raw.lines().count() as u64, location.envelope_lines.0);
    assert!(raw.starts_with(":0c0000003a63686172696f745f6d643a66\n"));
}

#[test]
fn extracted_envelope_reinstalls_with_fresh_counters() {
    let dir = tempfile::tempdir().unwrap();
    let annotated = annotate(dir.path(), 9);
    let service = file_service(None);
    let blob = service.extract_hex_raw(&annotated).unwrap();

    // Re-install on a carrier with a different payload line count.
    let other_input = dir.path().join("other.hex");
    let other_output = dir.path().join("other.meta.hex");
    hex_input(&other_input, 17);
    service
        .add_hex_raw(&other_input, &other_output, &blob)
        .unwrap();

    let mut file = std::fs::File::open(&other_output).unwrap();
    let location = locate(&mut file, &EnvelopeConfig::default()).unwrap();
    assert_eq!(location.payload_lines, LineOffset(17));

    let fields = full_field_set();
    let decoded = service.extract_hex(&other_output, &WantedTags::All).unwrap();
    assert_eq!(
        decoded.get(FieldTag::Sha256).unwrap().data,
        fields.sha256.as_bytes()
    );
    assert_eq!(decoded.get(FieldTag::License).unwrap().data, b"BSD-3-Clause");
}

#[test]
fn a_flipped_digit_in_the_envelope_fails_the_checksum() {
    let dir = tempfile::tempdir().unwrap();
    let output = annotate(dir.path(), 5);
    let service = file_service(None);

    let text = std::fs::read_to_string(&output).unwrap();
    // Corrupt one data digit of the magic line.
    let magic_at = text.find("3a63686172696f745f6d643a").unwrap();
    let mut corrupted = text.into_bytes();
    corrupted[magic_at + 2] = if corrupted[magic_at + 2] == b'0' { b'1' } else { b'0' };
    std::fs::write(&output, corrupted).unwrap();

    assert!(service.extract_hex(&output, &WantedTags::All).is_err());
}

#[test]
fn a_carrier_without_an_envelope_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("plain.hex");
    hex_input(&input, 30);
    let service = file_service(None);

    let err = service.extract_hex(&input, &WantedTags::All).unwrap_err();
    assert!(err.to_string().contains("trailer not found"));
}
