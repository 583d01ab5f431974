//! # External Collaborators
//!
//! Production implementations of the outbound ports: in-process sha-256
//! hashing, git version lookup and binutils-based ELF tooling.
//!
//! Every spawned command is echoed through structured logging at debug
//! level before it runs.

mod assembler;
mod binutils;
mod git;
mod hasher;

pub use assembler::GnuBlobAssembler;
pub use binutils::BinutilsObjectTool;
pub use git::GitVersionProvider;
pub use hasher::Sha2FileHasher;

use std::process::{Command, Output};

use crate::domain::errors::{MetaError, MetaResult};

/// Run a collaborator command, echoing it first.
///
/// A non-zero exit is always [`MetaError::ExternalTool`]; partial output
/// from a failed tool is never returned.
pub(crate) fn run_checked(command: &mut Command) -> MetaResult<Output> {
    tracing::debug!(
        "[meta] exec {} {}",
        command.get_program().to_string_lossy(),
        command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    );
    let output = command.output()?;
    if !output.status.success() {
        return Err(MetaError::ExternalTool {
            command: command.get_program().to_string_lossy().into_owned(),
            status: output.status.code().unwrap_or(-1),
        });
    }
    Ok(output)
}
