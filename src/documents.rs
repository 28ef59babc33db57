//! Enumeration of the PDF documents available for indexing.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const PDF_EXTENSION: &str = "pdf";

/// A PDF on local disk, identified by its filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    path: PathBuf,
    file_name: String,
}

impl DocumentRef {
    /// Full path of the document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Filename used as the document identity.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}

/// Lists the `.pdf` files directly inside a fixed directory.
#[derive(Debug, Clone)]
pub struct DocumentLister {
    dir: PathBuf,
}

impl DocumentLister {
    /// Create a lister for `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory scanned by this lister.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Return every regular `.pdf` file in the directory, sorted by filename.
    ///
    /// The directory is created when missing. Subdirectories are not visited, and the extension
    /// match is case-sensitive. An unreadable directory yields an empty list.
    pub fn list(&self) -> Vec<DocumentRef> {
        if let Err(err) = std::fs::create_dir_all(&self.dir) {
            tracing::warn!(dir = %self.dir.display(), error = %err, "Failed to create document directory");
            return Vec::new();
        }

        let documents: Vec<DocumentRef> = WalkDir::new(&self.dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    tracing::warn!(error = %err, "Skipping unreadable directory entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry.path().extension().and_then(|ext| ext.to_str()) == Some(PDF_EXTENSION)
            })
            .filter_map(|entry| {
                let file_name = entry.file_name().to_str()?.to_string();
                Some(DocumentRef {
                    path: entry.into_path(),
                    file_name,
                })
            })
            .collect();

        tracing::debug!(dir = %self.dir.display(), count = documents.len(), "Listed documents");
        documents
    }
}
