//! chariot-meta: embed and extract firmware provenance metadata.
//!
//! One add and one extract subcommand per carrier kind (raw binary,
//! hex-record image, ELF). Adds never modify their input; extraction
//! prints the selected fields, as text or as one JSON object.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use chariot_envelope::adapters::external::{
    BinutilsObjectTool, GitVersionProvider, GnuBlobAssembler, Sha2FileHasher,
};
use chariot_envelope::{
    AddRequest, DecodedFields, FieldTag, MetaError, MetaResult, MetadataApi, MetadataService,
    MimePayload, Sha256Digest, WantedTags,
};

/// Embed and extract CHARIOT provenance metadata in firmware images
#[derive(Parser, Debug)]
#[command(name = "chariot-meta", version)]
struct Cli {
    /// Echo spawned commands and debug detail
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: CommandKind,
}

#[derive(Subcommand, Debug)]
enum CommandKind {
    /// Annotate a raw binary image
    AddBin(AddArgs),
    /// Extract metadata from an annotated binary image
    ExtractBin(ExtractArgs),
    /// Annotate a hex-record image
    AddHex(AddArgs),
    /// Extract metadata from an annotated hex-record image
    ExtractHex(ExtractArgs),
    /// Annotate an ELF image
    AddElf {
        #[command(flatten)]
        add: AddArgs,
        /// Hash this section instead of the whole file
        #[arg(long, value_name = "SECTION")]
        boot: Option<String>,
    },
    /// Extract metadata from an annotated ELF image
    ExtractElf(ExtractArgs),
}

#[derive(Args, Debug)]
struct AddArgs {
    /// Firmware image to annotate (not modified)
    input: PathBuf,

    /// Where to write the annotated image
    #[arg(short, long)]
    output: PathBuf,

    /// Supplementary payload file and its mime string
    #[arg(long, num_args = 2, value_names = ["FILE", "MIME"])]
    add: Option<Vec<String>>,

    /// Targeted blockchain identification
    #[arg(long)]
    blockchain_path: Option<String>,

    /// Firmware license
    #[arg(long)]
    license: Option<String>,

    /// Software id
    #[arg(long)]
    software_id: Option<String>,

    /// Static analysis result file and its mime string
    #[arg(long, num_args = 2, value_names = ["FILE", "MIME"])]
    static_analysis: Option<Vec<String>>,

    /// Embed this sha-256 (64 hex digits) instead of hashing the input
    #[arg(long, value_name = "HEX")]
    sha: Option<String>,

    /// Append this pre-made metadata file instead of generating fields
    #[arg(long, value_name = "FILE",
          conflicts_with_all = ["add", "blockchain_path", "license",
                                "software_id", "static_analysis", "sha"])]
    all: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Annotated firmware image
    input: PathBuf,

    /// Select the content hash
    #[arg(long)]
    sha: bool,
    /// Select the format identifier
    #[arg(long)]
    format: bool,
    /// Select the version id
    #[arg(long)]
    version: bool,
    /// Select the blockchain identification
    #[arg(long)]
    blockchain_path: bool,
    /// Select the license
    #[arg(long)]
    license: bool,
    /// Select the software id
    #[arg(long)]
    software_id: bool,
    /// Select the static analysis result
    #[arg(long)]
    static_analysis: bool,
    /// Select the supplementary payload
    #[arg(long)]
    add: bool,
    /// Extract the whole envelope verbatim instead of fields
    #[arg(long, conflicts_with_all = ["sha", "format", "version", "blockchain_path",
                                      "license", "software_id", "static_analysis", "add", "json"])]
    all: bool,

    /// Write to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the selected fields as one JSON object
    #[arg(long)]
    json: bool,
}

impl ExtractArgs {
    fn wanted(&self) -> WantedTags {
        let mut tags = Vec::new();
        for (flag, tag) in [
            (self.sha, FieldTag::Sha256),
            (self.format, FieldTag::Format),
            (self.add, FieldTag::Supplement),
            (self.version, FieldTag::Version),
            (self.blockchain_path, FieldTag::BlockchainPath),
            (self.license, FieldTag::License),
            (self.software_id, FieldTag::SoftwareId),
            (self.static_analysis, FieldTag::StaticAnalysis),
        ] {
            if flag {
                tags.push(tag);
            }
        }
        if tags.is_empty() {
            WantedTags::All
        } else {
            WantedTags::Some(tags)
        }
    }
}

type Service = MetadataService<Sha2FileHasher, GitVersionProvider, BinutilsObjectTool, GnuBlobAssembler>;

fn mime_payload(pair: &[String]) -> MetaResult<MimePayload> {
    // clap guarantees exactly two values.
    let data = std::fs::read(&pair[0])?;
    Ok(MimePayload::new(data, pair[1].as_bytes().to_vec()))
}

fn build_request(args: &AddArgs, boot: Option<&str>) -> MetaResult<AddRequest> {
    let mut request = AddRequest::new(&args.input, &args.output);
    if let Some(pair) = &args.add {
        request.supplement = Some(mime_payload(pair)?);
    }
    request.blockchain_path = args.blockchain_path.as_ref().map(|s| s.clone().into_bytes());
    request.license = args.license.as_ref().map(|s| s.clone().into_bytes());
    request.software_id = args.software_id.as_ref().map(|s| s.clone().into_bytes());
    if let Some(pair) = &args.static_analysis {
        request.static_analysis = Some(mime_payload(pair)?);
    }
    if let Some(sha) = &args.sha {
        request.sha_override = Some(
            Sha256Digest::from_hex(sha)
                .ok_or_else(|| MetaError::Format {
                    reason: format!("`{sha}` is not a 64-digit hex sha-256"),
                })?,
        );
    }
    request.boot_section = boot.map(str::to_string);
    Ok(request)
}

/// One extracted field as it appears in `--json` output.
#[derive(serde::Serialize)]
struct FieldReport {
    value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    mime: Option<String>,
}

fn report(fields: &DecodedFields) -> BTreeMap<&'static str, FieldReport> {
    let mut out = BTreeMap::new();
    for (tag, field) in fields.iter() {
        // Fixed-width binary fields render as hex, everything else as text.
        let value = match tag {
            FieldTag::Sha256 | FieldTag::Version => hex::encode(&field.data),
            FieldTag::Supplement | FieldTag::StaticAnalysis => hex::encode(&field.data),
            _ => String::from_utf8_lossy(&field.data).into_owned(),
        };
        out.insert(
            tag.label(),
            FieldReport {
                value,
                mime: field
                    .mime
                    .as_ref()
                    .map(|m| String::from_utf8_lossy(m).into_owned()),
            },
        );
    }
    out
}

fn emit(bytes: &[u8], output: Option<&PathBuf>) -> MetaResult<()> {
    match output {
        Some(path) => std::fs::write(path, bytes)?,
        None => std::io::stdout().write_all(bytes)?,
    }
    Ok(())
}

fn run_extract(
    args: &ExtractArgs,
    extract: impl Fn(&WantedTags) -> MetaResult<DecodedFields>,
    extract_raw: impl Fn() -> MetaResult<Vec<u8>>,
) -> MetaResult<()> {
    if args.all {
        return emit(&extract_raw()?, args.output.as_ref());
    }
    let fields = extract(&args.wanted())?;
    let rendered = if args.json {
        let mut json = serde_json::to_string_pretty(&report(&fields))
            .map_err(|e| MetaError::Format {
                reason: format!("could not render JSON: {e}"),
            })?;
        json.push('\n');
        json
    } else {
        let mut text = String::new();
        for (label, field) in report(&fields) {
            match &field.mime {
                Some(mime) => text.push_str(&format!("{label} ({mime}): {}\n", field.value)),
                None => text.push_str(&format!("{label}: {}\n", field.value)),
            }
        }
        text
    };
    emit(rendered.as_bytes(), args.output.as_ref())
}

fn run(cli: &Cli, service: &Service) -> MetaResult<()> {
    match &cli.command {
        CommandKind::AddBin(args) => match &args.all {
            Some(blob) => service.add_binary_raw(&args.input, &args.output, &std::fs::read(blob)?),
            None => service.add_binary(&build_request(args, None)?),
        },
        CommandKind::AddHex(args) => match &args.all {
            Some(blob) => service.add_hex_raw(&args.input, &args.output, &std::fs::read(blob)?),
            None => service.add_hex(&build_request(args, None)?),
        },
        CommandKind::AddElf { add, boot } => {
            if add.all.is_some() {
                return Err(MetaError::Format {
                    reason: "--all is not supported for ELF images".to_string(),
                });
            }
            service.add_elf(&build_request(add, boot.as_deref())?)
        }
        CommandKind::ExtractBin(args) => run_extract(
            args,
            |wanted| service.extract_binary(&args.input, wanted),
            || service.extract_binary_raw(&args.input),
        ),
        CommandKind::ExtractHex(args) => run_extract(
            args,
            |wanted| service.extract_hex(&args.input, wanted),
            || service.extract_hex_raw(&args.input),
        ),
        CommandKind::ExtractElf(args) => run_extract(
            args,
            |wanted| service.extract_elf(&args.input, wanted),
            || service.extract_elf_raw(&args.input),
        ),
    }
}

/// Exit status: the io error's raw OS error or the failed tool's status
/// when one exists, otherwise 1.
fn status_of(error: &MetaError) -> u8 {
    match error {
        MetaError::Io(io) => io.raw_os_error().map(|c| c as u8).unwrap_or(1),
        MetaError::ExternalTool { status, .. } => *status as u8,
        _ => 1,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let service = MetadataService::new(
        Sha2FileHasher,
        GitVersionProvider,
        BinutilsObjectTool,
        GnuBlobAssembler,
    );

    match run(&cli, &service) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("chariot-meta: {error}");
            ExitCode::from(status_of(&error).max(1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_field_flags_selects_everything() {
        let cli = Cli::parse_from(["chariot-meta", "extract-bin", "fw.bin"]);
        let CommandKind::ExtractBin(args) = &cli.command else {
            panic!("wrong subcommand");
        };
        assert_eq!(args.wanted(), WantedTags::All);
    }

    #[test]
    fn field_flags_map_to_tags() {
        let cli = Cli::parse_from([
            "chariot-meta",
            "extract-hex",
            "fw.hex",
            "--license",
            "--sha",
        ]);
        let CommandKind::ExtractHex(args) = &cli.command else {
            panic!("wrong subcommand");
        };
        assert_eq!(
            args.wanted(),
            WantedTags::Some(vec![FieldTag::Sha256, FieldTag::License])
        );
    }

    #[test]
    fn add_takes_file_mime_pairs() {
        let cli = Cli::parse_from([
            "chariot-meta",
            "add-bin",
            "fw.bin",
            "-o",
            "out.bin",
            "--add",
            "extra.pdf",
            "application/pdf",
            "--license",
            "MIT",
        ]);
        let CommandKind::AddBin(args) = &cli.command else {
            panic!("wrong subcommand");
        };
        assert_eq!(args.add.as_deref().unwrap(), ["extra.pdf", "application/pdf"]);
        assert_eq!(args.license.as_deref(), Some("MIT"));
    }

    #[test]
    fn all_conflicts_with_field_selection() {
        let result = Cli::try_parse_from([
            "chariot-meta",
            "extract-bin",
            "fw.bin",
            "--all",
            "--sha",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn premade_metadata_conflicts_with_field_generation() {
        let result = Cli::try_parse_from([
            "chariot-meta",
            "add-bin",
            "fw.bin",
            "-o",
            "out.bin",
            "--all",
            "meta.blob",
            "--license",
            "MIT",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn premade_metadata_parses_on_its_own() {
        let cli = Cli::parse_from([
            "chariot-meta",
            "add-hex",
            "fw.hex",
            "-o",
            "out.hex",
            "--all",
            "meta.blob",
        ]);
        let CommandKind::AddHex(args) = &cli.command else {
            panic!("wrong subcommand");
        };
        assert_eq!(args.all.as_deref(), Some(std::path::Path::new("meta.blob")));
    }

    #[test]
    fn bad_sha_override_is_rejected() {
        let args = AddArgs {
            input: PathBuf::from("a"),
            output: PathBuf::from("b"),
            add: None,
            blockchain_path: None,
            license: None,
            software_id: None,
            static_analysis: None,
            sha: Some("zz".to_string()),
            all: None,
        };
        assert!(build_request(&args, None).is_err());
    }
}
