//! File discovery for logger export directories
//!
//! Handles discovering reading CSV files in a flat input directory and
//! counting unique site codes for processing statistics.

use crate::error::{QaqcError, Result};
use crate::naming::parse_file_name;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// File discovery component for logger export directories
#[derive(Debug)]
pub struct FileDiscovery {
    input_path: PathBuf,
    excluded: Vec<PathBuf>,
    site_count: usize,
}

impl FileDiscovery {
    /// Create a new file discovery instance
    pub fn new(input_path: PathBuf) -> Self {
        Self {
            input_path,
            excluded: Vec::new(),
            site_count: 0,
        }
    }

    /// Skip a file that lives in the input directory but is not a reading file
    pub fn with_excluded(mut self, path: PathBuf) -> Self {
        self.excluded.push(path);
        self
    }

    /// Get the current site count
    pub fn site_count(&self) -> usize {
        self.site_count
    }

    /// Discover all CSV files directly inside the input directory.
    ///
    /// Files are returned sorted by name so that the first of two
    /// conflicting variants is always the same one.
    pub async fn discover_csv_files(&mut self) -> Result<Vec<PathBuf>> {
        if !self.input_path.is_dir() {
            return Err(QaqcError::InputNotFound {
                path: self.input_path.clone(),
            });
        }

        debug!("Searching for CSV files in: {}", self.input_path.display());

        let mut files = Vec::new();
        let mut sites = HashSet::new();
        let mut dir = fs::read_dir(&self.input_path).await?;

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if !entry.file_type().await?.is_file() || !is_csv_file(&path) {
                continue;
            }
            if self.is_excluded(&path) {
                debug!("Skipping excluded file {}", path.display());
                continue;
            }

            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if let Ok(parsed) = parse_file_name(name) {
                    sites.insert(parsed.key.site_code);
                }
            }
            files.push(path);
        }

        files.sort();
        self.site_count = sites.len();
        debug!(
            "Found {} CSV files from {} sites",
            files.len(),
            self.site_count
        );

        Ok(files)
    }

    fn is_excluded(&self, path: &Path) -> bool {
        self.excluded
            .iter()
            .any(|excluded| excluded.file_name() == path.file_name() && same_dir(excluded, path))
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.parent(), b.parent()) {
        (Some(pa), Some(pb)) => {
            let pa = pa.canonicalize().unwrap_or_else(|_| pa.to_path_buf());
            let pb = pb.canonicalize().unwrap_or_else(|_| pb.to_path_buf());
            pa == pb
        }
        _ => false,
    }
}

/// Check if a path is a CSV file
pub(crate) fn is_csv_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "csv")
}
