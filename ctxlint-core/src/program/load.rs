//! Loading program dumps produced by a front end.

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::Program;
use crate::error::{CtxlintError, CtxlintResult, IoResultExt};

/// Parses and validates a JSON program dump.
pub fn parse_program(path: &Path, content: &str) -> CtxlintResult<Program> {
    let program: Program = serde_json::from_str(content).map_err(|e| {
        CtxlintError::decode_at(path, e.to_string(), e.line(), e.column())
    })?;
    program.validate()?;
    Ok(program)
}

/// Reads, parses, and validates a JSON program dump.
pub fn load_program(path: &Path) -> CtxlintResult<Program> {
    let content = fs::read_to_string(path).with_path(path)?;
    let program = parse_program(path, &content)?;
    tracing::debug!(
        path = %path.display(),
        files = program.files.len(),
        objects = program.objects.len(),
        types = program.types.len(),
        "loaded program"
    );
    Ok(program)
}

/// Collects program dumps: `root` itself if it is a file, otherwise every
/// `*.json` file below it, sorted for stable output.
pub fn gather_program_files(root: &Path) -> CtxlintResult<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    if !root.exists() {
        return Err(CtxlintError::io(
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file or directory"),
        ));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();

    files.sort();
    Ok(files)
}
