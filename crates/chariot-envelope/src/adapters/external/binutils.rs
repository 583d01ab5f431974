//! ELF section tooling through binutils.

use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use crate::domain::errors::{MetaError, MetaResult};
use crate::ports::outbound::{ObjectTool, SectionSymbol};

use super::run_checked;

/// Shells out to `objcopy` and `readelf`.
///
/// `readelf -s` reports a symbol's value relative to its section; the
/// section's file offset (from `readelf -S`) is added here, so callers see
/// plain offsets into the object file.
#[derive(Debug, Default, Clone, Copy)]
pub struct BinutilsObjectTool;

fn hex_or_dec(s: &str) -> Option<u64> {
    if let Some(hex) = s.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

/// Section index -> file offset, from `readelf -S -W` output.
fn parse_section_offsets(text: &str) -> HashMap<u64, u64> {
    let mut offsets = HashMap::new();
    for line in text.lines() {
        let (Some(lb), Some(rb)) = (line.find('['), line.find(']')) else {
            continue;
        };
        let Ok(index) = line[lb + 1..rb].trim().parse::<u64>() else {
            continue;
        };
        // After the index: Name Type Address Off ...
        let rest: Vec<&str> = line[rb + 1..].split_whitespace().collect();
        if rest.len() < 4 {
            continue;
        }
        if let Ok(off) = u64::from_str_radix(rest[3], 16) {
            offsets.insert(index, off);
        }
    }
    offsets
}

/// Symbol rows of `readelf -s -W` output, normalized to file offsets.
fn parse_symbols(text: &str, offsets: &HashMap<u64, u64>) -> Vec<SectionSymbol> {
    let mut symbols = Vec::new();
    for line in text.lines() {
        // Num: Value Size Type Bind Vis Ndx Name
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 8 || !fields[0].ends_with(':') {
            continue;
        }
        let Ok(value) = u64::from_str_radix(fields[1], 16) else {
            continue;
        };
        let Some(size) = hex_or_dec(fields[2]) else {
            continue;
        };
        let Ok(ndx) = fields[6].parse::<u64>() else {
            continue; // UND, ABS
        };
        let Some(section_off) = offsets.get(&ndx) else {
            continue;
        };
        symbols.push(SectionSymbol {
            name: fields[7].to_string(),
            file_offset: section_off + value,
            size,
        });
    }
    symbols
}

impl ObjectTool for BinutilsObjectTool {
    fn has_section(&self, file: &Path, section: &str) -> MetaResult<bool> {
        let output = run_checked(Command::new("readelf").arg("-S").arg("-W").arg(file))?;
        let text = String::from_utf8_lossy(&output.stdout);
        Ok(text.contains(&format!(" {section} ")))
    }

    fn dump_section(&self, file: &Path, section: &str, out: &Path) -> MetaResult<()> {
        // The trailing /dev/null output keeps objcopy from rewriting the
        // input while it dumps.
        run_checked(
            Command::new("objcopy")
                .arg(format!("--dump-section={}={}", section, out.display()))
                .arg(file)
                .arg("/dev/null"),
        )?;
        if !out.exists() {
            return Err(MetaError::format(format!(
                "section {section} not present in {}",
                file.display()
            )));
        }
        Ok(())
    }

    fn install_section(
        &self,
        file: &Path,
        section: &str,
        contents: &Path,
        update: bool,
    ) -> MetaResult<()> {
        let mut command = Command::new("objcopy");
        if update {
            command.arg(format!("--update-section={}={}", section, contents.display()));
        } else {
            command.arg(format!("--add-section={}={}", section, contents.display()));
        }
        command.arg(format!("--set-section-flags={section}=noload,readonly"));
        command.arg(file);
        run_checked(&mut command)?;
        Ok(())
    }

    fn symbol_table(&self, object: &Path) -> MetaResult<Vec<SectionSymbol>> {
        let sections = run_checked(Command::new("readelf").arg("-S").arg("-W").arg(object))?;
        let offsets = parse_section_offsets(&String::from_utf8_lossy(&sections.stdout));
        let symbols = run_checked(Command::new("readelf").arg("-s").arg("-W").arg(object))?;
        Ok(parse_symbols(
            &String::from_utf8_lossy(&symbols.stdout),
            &offsets,
        ))
    }
}
