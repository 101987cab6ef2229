//! Write-then-rename file replacement.

use super::{StorageError, StorageResult};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

/// Replaces `path` with `bytes` atomically.
///
/// Bytes go to a sibling `*.tmp` file which is flushed to disk and then
/// renamed over the target. On failure the temp file is removed and the
/// target keeps its previous contents.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> StorageResult<()> {
    let tmp_path = path.with_extension(match path.extension() {
        Some(ext) => format!("{}.tmp", ext.to_string_lossy()),
        None => "tmp".to_string(),
    });

    let written = File::create(&tmp_path).and_then(|mut file| {
        file.write_all(bytes)?;
        file.sync_all()
    });
    if let Err(err) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(StorageError::io(&tmp_path, err));
    }

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(StorageError::io(path, err));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::write_atomic;
    use tempfile::TempDir;

    #[test]
    fn replaces_existing_file_and_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.json");
        std::fs::write(&path, b"old").unwrap();

        write_atomic(&path, b"new").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new");
        assert!(!dir.path().join("notes.json.tmp").exists());
    }

    #[test]
    fn failed_write_keeps_previous_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("notes.json");

        assert!(write_atomic(&path, b"new").is_err());
        assert!(!path.exists());
    }
}
