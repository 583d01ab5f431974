//! Version lookup through git.

use std::path::Path;
use std::process::Command;

use crate::domain::errors::MetaResult;
use crate::domain::value_objects::VersionId;
use crate::ports::outbound::VersionProvider;

/// Resolves "last commit id touching this file" by spawning `git log`.
///
/// Unlike every other collaborator, a failing or silent git is not an
/// error: the answer is `None` and the caller substitutes the sentinel.
/// Annotating an image outside any repository is a normal workflow.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitVersionProvider;

impl GitVersionProvider {
    fn commit_of(path: &Path) -> Option<VersionId> {
        let mut command = Command::new("git");
        command.args(["log", "--format=oneline", "--abbrev=40", "--abbrev-commit", "-q", "-1"]);
        command.arg(path.file_name()?);
        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            command.current_dir(dir);
        }
        tracing::debug!("[meta] exec git log -1 {}", path.display());
        let output = command.output().ok()?;
        if !output.status.success() {
            return None;
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let commit = stdout.split_whitespace().next()?;
        VersionId::from_commit_hex(commit)
    }
}

impl VersionProvider for GitVersionProvider {
    fn last_commit_id(&self, path: &Path) -> MetaResult<Option<VersionId>> {
        Ok(Self::commit_of(path))
    }
}
