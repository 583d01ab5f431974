//! # Envelope Model
//!
//! `FieldSet` is what an add operation embeds; `DecodedFields` is what an
//! extract operation returns. An envelope is always constructed fresh:
//! "update" means re-deriving the whole field set and replacing the
//! carrier's metadata region.

use std::collections::BTreeMap;

use super::fields::FieldTag;
use super::value_objects::{Sha256Digest, VersionId};

/// A payload with an attached mime/format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimePayload {
    pub data: Vec<u8>,
    pub mime: Vec<u8>,
}

impl MimePayload {
    pub fn new(data: impl Into<Vec<u8>>, mime: impl Into<Vec<u8>>) -> Self {
        MimePayload {
            data: data.into(),
            mime: mime.into(),
        }
    }
}

/// The complete set of field values for one add operation.
///
/// Mandatory fields are plain; optional fields are `Option`. The codec
/// writes present fields in registry order regardless of how this was built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSet {
    pub sha256: Sha256Digest,
    pub format: Vec<u8>,
    pub supplement: Option<MimePayload>,
    pub version: VersionId,
    pub blockchain_path: Option<Vec<u8>>,
    pub license: Option<Vec<u8>>,
    pub software_id: Option<Vec<u8>>,
    pub static_analysis: Option<MimePayload>,
}

impl FieldSet {
    /// A field set with only the mandatory fields populated.
    pub fn new(sha256: Sha256Digest, format: impl Into<Vec<u8>>, version: VersionId) -> Self {
        FieldSet {
            sha256,
            format: format.into(),
            supplement: None,
            version,
            blockchain_path: None,
            license: None,
            software_id: None,
            static_analysis: None,
        }
    }

    /// Tags present in this set, in registry order.
    pub fn present_tags(&self) -> Vec<FieldTag> {
        let mut tags = vec![FieldTag::Sha256, FieldTag::Format];
        if self.supplement.is_some() {
            tags.push(FieldTag::Supplement);
        }
        tags.push(FieldTag::Version);
        if self.blockchain_path.is_some() {
            tags.push(FieldTag::BlockchainPath);
        }
        if self.license.is_some() {
            tags.push(FieldTag::License);
        }
        if self.software_id.is_some() {
            tags.push(FieldTag::SoftwareId);
        }
        if self.static_analysis.is_some() {
            tags.push(FieldTag::StaticAnalysis);
        }
        tags
    }
}

/// One extracted field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedField {
    pub data: Vec<u8>,
    pub mime: Option<Vec<u8>>,
}

/// The fields materialized by one extract operation.
///
/// Absent optional fields are simply not present; "no value" is not an
/// error. Unrequested fields are traversed by the decoder but not retained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedFields(BTreeMap<FieldTag, DecodedField>);

impl DecodedFields {
    pub fn insert(&mut self, tag: FieldTag, field: DecodedField) {
        self.0.insert(tag, field);
    }

    pub fn get(&self, tag: FieldTag) -> Option<&DecodedField> {
        self.0.get(&tag)
    }

    pub fn contains(&self, tag: FieldTag) -> bool {
        self.0.contains_key(&tag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldTag, &DecodedField)> {
        self.0.iter()
    }
}

/// Which fields an extract operation should materialize.
///
/// Everything before a wanted field is still traversed (the layout is
/// sequential and non-indexed), but only wanted payloads are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WantedTags {
    /// Keep every field encountered.
    All,
    /// Keep only these.
    Some(Vec<FieldTag>),
}

impl WantedTags {
    pub fn of(tags: &[FieldTag]) -> Self {
        WantedTags::Some(tags.to_vec())
    }

    pub fn wants(&self, tag: FieldTag) -> bool {
        match self {
            WantedTags::All => true,
            WantedTags::Some(tags) => tags.contains(&tag),
        }
    }
}
