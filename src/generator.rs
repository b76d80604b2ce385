// ==============================================================================
// External Generator Invocation and Export-Directory Cleanup
// ==============================================================================
//
// Collaborator surfaces around the pruning engine. The engine's only
// obligation is valid, self-consistent schema text; turning that into
// target-language source is delegated to an external executable, invoked
// once per output file. Cleanup removes stale `.proto` artifacts left in the
// export directory by earlier runs under a different naming convention.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::process::Command;

use log::info;

use crate::error::PruneError;
use crate::exporter::Workspace;

/// Delete any `.proto` file in `export_dir` that is not in the expected
/// output name set. A missing or unreadable export directory is fine (dry
/// runs never create it).
pub fn clean_extras(
    export_dir: &Path,
    expected: &BTreeSet<String>,
    workspace: &Workspace,
) -> Result<(), PruneError> {
    let Ok(entries) = fs::read_dir(export_dir) else {
        return Ok(());
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "proto") {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if !expected.contains(&name) {
            workspace.remove_file(&path)?;
        }
    }
    Ok(())
}

/// Invoke the external code generator once per output file, with the export
/// directory as the proto search path.
pub fn generate(
    protogen: &Path,
    export_dir: &Path,
    targets: &[String],
    workspace: &Workspace,
) -> Result<(), PruneError> {
    for target in targets {
        info!("[gen] {target}");
        if workspace.is_dry() {
            continue;
        }
        let status = Command::new(protogen)
            .arg(format!("--proto_path={}", export_dir.display()))
            .arg(target)
            .status()
            .map_err(|e| {
                PruneError::Generator(format!("spawn {}: {e}", protogen.display()))
            })?;
        if !status.success() {
            return Err(PruneError::Generator(format!(
                "{} exited with {status} for {target}",
                protogen.display()
            )));
        }
    }
    Ok(())
}
