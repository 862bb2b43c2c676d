//! Directory listing: one watched directory -> file observations.

use std::fs;
use std::path::Path;

use crate::error::{BucketError, BucketResult};
use crate::types::FileObservation;

/// List the direct entries of `dir`, sorted by name.
///
/// Dot-names are skipped unless `include_hidden` is set; on Windows the
/// hidden and system attributes are honored as well. Names that are not
/// valid UTF-8 are skipped.
pub fn list_directory(dir: &Path, include_hidden: bool) -> BucketResult<Vec<FileObservation>> {
    let unavailable = |reason: String| BucketError::DirectoryUnavailable {
        path: dir.to_path_buf(),
        reason,
    };

    let entries = fs::read_dir(dir).map_err(|e| unavailable(e.to_string()))?;
    let mut files = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| unavailable(e.to_string()))?;
        let Ok(name) = entry.file_name().into_string() else {
            crate::debug_event!("listing", "skipped", "non UTF-8 name in {}", dir.display());
            continue;
        };

        // Entries can vanish between read_dir and stat; treat them as gone
        let Ok(metadata) = entry.metadata() else {
            continue;
        };

        if !include_hidden && is_hidden(&name, &metadata) {
            continue;
        }

        files.push(if metadata.is_dir() {
            FileObservation::directory(name)
        } else {
            FileObservation::file(name)
        });
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

#[cfg(windows)]
fn is_hidden(name: &str, metadata: &fs::Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    const FILE_ATTRIBUTE_SYSTEM: u32 = 0x4;

    name.starts_with('.')
        || metadata.file_attributes() & (FILE_ATTRIBUTE_HIDDEN | FILE_ATTRIBUTE_SYSTEM) != 0
}

#[cfg(not(windows))]
fn is_hidden(name: &str, _metadata: &fs::Metadata) -> bool {
    name.starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_lists_files_and_directories() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.pdf"), "").unwrap();
        fs::write(temp_dir.path().join("a.jpg"), "").unwrap();
        fs::create_dir(temp_dir.path().join("Projects")).unwrap();

        let files = list_directory(temp_dir.path(), false).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Projects", "a.jpg", "b.pdf"]);
        assert!(files[0].is_dir);
        assert!(files[0].extension.is_none());
        assert_eq!(files[1].extension.as_ref().unwrap().as_str(), ".jpg");
    }

    #[test]
    fn test_hidden_entries_skipped_unless_requested() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(".DS_Store"), "").unwrap();
        fs::create_dir(temp_dir.path().join(".git")).unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "").unwrap();

        assert_eq!(list_directory(temp_dir.path(), false).unwrap().len(), 1);
        assert_eq!(list_directory(temp_dir.path(), true).unwrap().len(), 3);
    }

    #[test]
    fn test_missing_directory_is_unavailable() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("gone");

        let err = list_directory(&missing, false).unwrap_err();
        assert!(matches!(err, BucketError::DirectoryUnavailable { .. }));
    }
}
