//! Repository walk stage: filter by the source-extension allowlist, skip
//! excluded directories and oversized files (§4.4).

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::language::{is_allowed_extension, path_is_excluded, MAX_FILE_SIZE_BYTES};

/// One file selected for chunking.
pub struct ScannedFile {
    pub path: PathBuf,
    pub repo_relative: String,
    pub size_bytes: u64,
}

pub fn scan_source_files(root: &Path) -> Vec<ScannedFile> {
    let mut out = Vec::new();
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path_is_excluded(path) {
            continue;
        }
        let ext = path.extension().and_then(|x| x.to_str()).unwrap_or("");
        if !is_allowed_extension(ext) {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if metadata.len() > MAX_FILE_SIZE_BYTES {
            continue;
        }
        let repo_relative = pathdiff::diff_paths(path, root)
            .unwrap_or_else(|| path.to_path_buf())
            .to_string_lossy()
            .replace('\\', "/");

        out.push(ScannedFile {
            path: path.to_path_buf(),
            repo_relative,
            size_bytes: metadata.len(),
        });
    }
    out
}
