// Writing generated sources

use std::fs;
use std::path::Path;

use anyhow::Context;
use classgen_generation::OverwritePolicy;
use tracing::info;

/// What happened to an output file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// File did not exist and was created
    Created,
    /// Existing file was replaced
    Overwritten,
    /// Existing file was left untouched
    Skipped,
}

/// Write `content` to `path`, honouring the overwrite policy
pub fn write_output(path: &Path, content: &str, policy: OverwritePolicy) -> anyhow::Result<WriteOutcome> {
    let exists = path.exists();
    if exists && policy == OverwritePolicy::Skip {
        info!(path = %path.display(), "Output exists, skipping");
        return Ok(WriteOutcome::Skipped);
    }

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;

    info!(path = %path.display(), bytes = content.len(), "Wrote output");
    Ok(if exists {
        WriteOutcome::Overwritten
    } else {
        WriteOutcome::Created
    })
}
