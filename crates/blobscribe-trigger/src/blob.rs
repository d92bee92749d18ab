use blobscribe_core::{BlobInput, TriggerError};
use std::fs::File;
use std::path::{Path, PathBuf};

/// A file in the watched container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef {
    pub name: String,
    pub path: PathBuf,
}

impl BlobRef {
    pub fn from_path(path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self { name, path }
    }
}

pub fn open_blob(blob: &BlobRef) -> Result<BlobInput<File>, TriggerError> {
    let file = File::open(&blob.path)?;
    let size = file.metadata()?.len();
    Ok(BlobInput::new(blob.name.clone(), Some(size), file))
}

/// Case-insensitive extension filter; an empty list accepts every path.
pub fn matches_extension(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    extensions
        .iter()
        .any(|wanted| wanted.trim_start_matches('.').eq_ignore_ascii_case(ext))
}

/// Files already present in `dir`, sorted by name.
pub fn list_existing(dir: &Path, extensions: &[String]) -> Result<Vec<BlobRef>, TriggerError> {
    let mut blobs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && matches_extension(&path, extensions) {
            blobs.push(BlobRef::from_path(path));
        }
    }
    blobs.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(blobs)
}
