//! Picking files from disk for upload.
//!
//! A path may name a single file or a directory. Directories are read one
//! level deep and only files with an accepted extension are kept.

use std::io;
use std::path::Path;

use ragchat_config::expand_tilde;
use ragchat_core::is_accepted_upload;
use tracing::debug;

use crate::gateway::UploadFile;

/// Files read from a path, plus the names that were passed over
#[derive(Debug, Default)]
pub struct UploadSelection {
    pub files: Vec<UploadFile>,
    pub skipped: Vec<String>,
}

impl UploadSelection {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Read a file, or the accepted files of a directory, in name order
pub async fn collect_upload_files(path: &str) -> io::Result<UploadSelection> {
    let path = expand_tilde(path.trim()).ok_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "Could not find home directory")
    })?;

    let mut candidates = Vec::new();
    if tokio::fs::metadata(&path).await?.is_dir() {
        let mut entries = tokio::fs::read_dir(&path).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                candidates.push(entry.path());
            }
        }
        candidates.sort();
    } else {
        candidates.push(path);
    }

    let mut selection = UploadSelection::default();
    for candidate in candidates {
        let name = file_name(&candidate);
        if !is_accepted_upload(&name) {
            debug!("Skipping {:?}", candidate);
            selection.skipped.push(name);
            continue;
        }
        selection.files.push(UploadFile::from_path(&candidate).await?);
    }

    Ok(selection)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Collect from several paths, stopping at the first unreadable one
pub async fn collect_from_paths<P: AsRef<Path>>(paths: &[P]) -> io::Result<UploadSelection> {
    let mut selection = UploadSelection::default();
    for path in paths {
        let next = collect_upload_files(&path.as_ref().to_string_lossy()).await?;
        selection.files.extend(next.files);
        selection.skipped.extend(next.skipped);
    }
    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_directory_keeps_accepted_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("b.md"), b"# b").await.unwrap();
        tokio::fs::write(dir.path().join("a.pdf"), b"%PDF").await.unwrap();
        tokio::fs::write(dir.path().join("photo.png"), b"png").await.unwrap();
        tokio::fs::create_dir(dir.path().join("nested.md")).await.unwrap();

        let selection = collect_upload_files(&dir.path().to_string_lossy()).await.unwrap();

        let names: Vec<&str> = selection.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.md"]);
        assert_eq!(selection.skipped, vec!["photo.png"]);
    }

    #[tokio::test]
    async fn test_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Report.DOCX");
        tokio::fs::write(&path, b"docx").await.unwrap();

        let selection = collect_upload_files(&path.to_string_lossy()).await.unwrap();
        assert_eq!(selection.files.len(), 1);
        assert_eq!(selection.files[0].name, "Report.DOCX");
    }

    #[tokio::test]
    async fn test_unsupported_single_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archive.zip");
        tokio::fs::write(&path, b"zip").await.unwrap();

        let selection = collect_upload_files(&path.to_string_lossy()).await.unwrap();
        assert!(selection.is_empty());
        assert_eq!(selection.skipped, vec!["archive.zip"]);
    }

    #[tokio::test]
    async fn test_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(collect_upload_files(&missing.to_string_lossy()).await.is_err());
    }

    #[tokio::test]
    async fn test_collect_from_several_paths() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        tokio::fs::write(&a, b"a").await.unwrap();
        tokio::fs::write(&b, b"b").await.unwrap();

        let selection = collect_from_paths(&[&b, &a]).await.unwrap();
        let names: Vec<&str> = selection.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["b.txt", "a.txt"]);
    }
}
