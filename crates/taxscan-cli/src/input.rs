//! Reading input files into documents.

use std::path::{Path, PathBuf};

use anyhow::Context;
use taxscan_core::Document;
use taxscan_core::types::media_type_from_extension;

use crate::TRACING_TARGET_COMMAND;

/// Media type given to explicitly named files with an unknown extension.
///
/// The batch reports such files as unsupported instead of dropping them.
const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

/// Reads every input into a [`Document`], in the order given.
///
/// Directories are read one level deep, in file-name order, keeping only files
/// with a recognized extension.
pub async fn read_documents(inputs: &[PathBuf]) -> anyhow::Result<Vec<Document>> {
    let mut documents = Vec::with_capacity(inputs.len());

    for input in inputs {
        let metadata = tokio::fs::metadata(input)
            .await
            .with_context(|| format!("failed to read {}", input.display()))?;

        if !metadata.is_dir() {
            documents.push(read_document(input).await?);
            continue;
        }

        for path in list_directory(input).await? {
            documents.push(read_document(&path).await?);
        }
    }

    Ok(documents)
}

/// Lists files with a recognized extension directly under `dir`.
async fn list_directory(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .with_context(|| format!("failed to list {}", dir.display()))?;

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }

        if media_type_of(&path).is_some() {
            paths.push(path);
        } else {
            tracing::debug!(
                target: TRACING_TARGET_COMMAND,
                path = %path.display(),
                "Skipping file with unrecognized extension"
            );
        }
    }

    paths.sort();
    Ok(paths)
}

async fn read_document(path: &Path) -> anyhow::Result<Document> {
    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let media_type = media_type_of(path).unwrap_or(UNKNOWN_MEDIA_TYPE);
    Ok(Document::new(name, media_type, content))
}

fn media_type_of(path: &Path) -> Option<&'static str> {
    path.extension()
        .and_then(|extension| extension.to_str())
        .and_then(media_type_from_extension)
}

#[cfg(test)]
mod tests {
    use taxscan_core::MediaKind;

    use super::*;

    #[tokio::test]
    async fn test_reads_files_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let scans = dir.path().join("scans");
        std::fs::create_dir(&scans).unwrap();
        std::fs::write(scans.join("b.png"), b"png").unwrap();
        std::fs::write(scans.join("a.JPG"), b"jpg").unwrap();
        std::fs::write(scans.join("notes.txt"), b"skip me").unwrap();
        std::fs::write(dir.path().join("march.pdf"), b"%PDF").unwrap();

        let documents = read_documents(&[dir.path().join("march.pdf"), scans])
            .await
            .unwrap();

        let names: Vec<_> = documents.iter().map(|d| d.name()).collect();
        assert_eq!(names, ["march.pdf", "a.JPG", "b.png"]);
        assert_eq!(documents[0].media_kind(), MediaKind::Pdf);
        assert_eq!(documents[1].media_type(), "image/jpeg");
    }

    #[tokio::test]
    async fn test_named_unknown_file_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.docx");
        std::fs::write(&path, b"docx").unwrap();

        let documents = read_documents(&[path]).await.unwrap();
        assert_eq!(documents.len(), 1);
        assert!(!documents[0].media_kind().is_supported());
    }

    #[tokio::test]
    async fn test_missing_file_fails() {
        let missing = PathBuf::from("/nonexistent/receipt.jpg");
        assert!(read_documents(&[missing]).await.is_err());
    }
}
