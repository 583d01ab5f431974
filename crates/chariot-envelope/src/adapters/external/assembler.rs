//! Blob-to-object assembly through the system toolchain.

use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;
use std::process::Command;

use crate::domain::errors::MetaResult;
use crate::ports::outbound::BlobAssembler;

use super::run_checked;

/// Emits `.byte` assembly for the blob and runs the GNU assembler on it.
///
/// The generated object defines exactly one global symbol of the blob's
/// size inside the requested section, which is what the symbol-table-based
/// extraction on the other side relies on.
#[derive(Debug, Default, Clone, Copy)]
pub struct GnuBlobAssembler;

fn render_assembly(blob: &[u8], symbol: &str, section: &str) -> String {
    let mut asm = String::new();
    let _ = writeln!(asm, "\t.section {section},\"a\"");
    let _ = writeln!(asm, "\t.global {symbol}");
    let _ = writeln!(asm, "{symbol}:");
    for chunk in blob.chunks(16) {
        let bytes: Vec<String> = chunk.iter().map(|b| format!("0x{b:02x}")).collect();
        let _ = writeln!(asm, "\t.byte {}", bytes.join(", "));
    }
    let _ = writeln!(asm, "\t.size {symbol}, . - {symbol}");
    asm
}

impl BlobAssembler for GnuBlobAssembler {
    fn assemble(&self, blob: &[u8], symbol: &str, section: &str, out: &Path) -> MetaResult<()> {
        let workdir = tempfile::tempdir()?;
        let source = workdir.path().join("blob.s");
        let mut file = std::fs::File::create(&source)?;
        file.write_all(render_assembly(blob, symbol, section).as_bytes())?;
        file.sync_all()?;
        drop(file);

        run_checked(Command::new("as").arg(&source).arg("-o").arg(out))?;
        Ok(())
    }
}
