//! # ELF Carrier
//!
//! The envelope lives in a dedicated section instead of a trailer. The
//! actual byte installation and extraction is delegated to the outbound
//! object tooling; this adapter orchestrates it:
//!
//! - add: encode the fields (no trailer, the section is self-delimiting),
//!   assemble a relocatable object exposing the blob under a well-known
//!   symbol, install that object as the metadata section of a copy of the
//!   input.
//! - extract: dump the section, resolve the symbol in the dumped object's
//!   symbol table, slice, decode.
//!
//! Symbol names are compared after canonical truncation to
//! [`SYMBOL_NAME_WIDTH`] characters, the widest name some symbol-table
//! listings report.

use std::path::Path;

use crate::domain::binary::{decode_fields, encode_fields};
use crate::domain::envelope::{DecodedFields, FieldSet, WantedTags};
use crate::domain::errors::{MetaError, MetaResult};
use crate::domain::value_objects::{EnvelopeConfig, Sha256Digest};
use crate::ports::outbound::{BlobAssembler, FileHasher, ObjectTool};

/// Longest symbol name the symbol table reports.
pub const SYMBOL_NAME_WIDTH: usize = 25;

fn canonical(name: &str) -> &str {
    let mut end = name.len().min(SYMBOL_NAME_WIDTH);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

fn install_blob(
    tool: &dyn ObjectTool,
    assembler: &dyn BlobAssembler,
    target: &Path,
    blob: &[u8],
    symbol: &str,
    section: &str,
) -> MetaResult<()> {
    // The temp directory guard removes the object on every exit path.
    let workdir = tempfile::tempdir()?;
    let object = workdir.path().join("section.o");
    assembler.assemble(blob, symbol, section, &object)?;
    let update = tool.has_section(target, section)?;
    tracing::debug!(
        "[meta] {} section {section} ({} blob bytes)",
        if update { "updating" } else { "adding" },
        blob.len()
    );
    tool.install_section(target, section, &object, update)
}

/// Copy `input` to `output` and install the envelope (and the optional
/// supplementary payload) as sections.
pub fn add(
    tool: &dyn ObjectTool,
    assembler: &dyn BlobAssembler,
    input: &Path,
    output: &Path,
    fields: &FieldSet,
    config: &EnvelopeConfig,
) -> MetaResult<()> {
    let blob = encode_fields(fields)?;
    std::fs::copy(input, output)?;
    install_blob(
        tool,
        assembler,
        output,
        &blob,
        &config.envelope_symbol,
        &config.meta_section,
    )?;
    if let Some(supplement) = &fields.supplement {
        install_blob(
            tool,
            assembler,
            output,
            &supplement.data,
            &config.suppl_symbol,
            &config.suppl_section,
        )?;
    }
    Ok(())
}

/// Dump the metadata section and slice the envelope blob out of it.
pub fn extract_raw(
    tool: &dyn ObjectTool,
    input: &Path,
    config: &EnvelopeConfig,
) -> MetaResult<Vec<u8>> {
    let workdir = tempfile::tempdir()?;
    let dump = workdir.path().join("meta.o");
    tool.dump_section(input, &config.meta_section, &dump)?;
    let object = std::fs::read(&dump)?;

    let wanted = canonical(&config.envelope_symbol);
    let symbol = tool
        .symbol_table(&dump)?
        .into_iter()
        .find(|sym| canonical(&sym.name) == wanted)
        .ok_or_else(|| {
            MetaError::format(format!("symbol `{wanted}` not found in the metadata section"))
        })?;

    let start = symbol.file_offset as usize;
    let end = start + symbol.size as usize;
    if end > object.len() {
        return Err(MetaError::format(format!(
            "symbol `{wanted}` points past the end of the section object"
        )));
    }
    Ok(object[start..end].to_vec())
}

/// Extract fields from an annotated ELF image.
pub fn extract(
    tool: &dyn ObjectTool,
    input: &Path,
    wanted: &WantedTags,
    config: &EnvelopeConfig,
) -> MetaResult<DecodedFields> {
    let blob = extract_raw(tool, input, config)?;
    decode_fields(&blob, wanted)
}

/// Hash one section's contents instead of the whole file (boot hashing).
pub fn hash_section(
    tool: &dyn ObjectTool,
    hasher: &dyn FileHasher,
    input: &Path,
    section: &str,
) -> MetaResult<Sha256Digest> {
    let workdir = tempfile::tempdir()?;
    let dump = workdir.path().join("boot.bin");
    tool.dump_section(input, section, &dump)?;
    hasher.sha256_of_file(&dump)
}
