use std::{
    io,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use tempfile::TempDir;
use tokio::fs::File;

use crate::{ArcPath, arc_path};

/// Mock implementation of the Fs actor for testing purposes.
///
/// Every path, absolute or relative, is re-rooted inside a temporary
/// directory owned by the mock, so tests never touch the real filesystem.
#[derive(Debug, Clone)]
pub struct Mock {
    temp_dir: Arc<TempDir>,
}

impl Mock {
    /// Creates a new mock instance with a temporary directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir for Fs mock");
        Self {
            temp_dir: Arc::new(temp_dir),
        }
    }

    /// Maps a logical path to its location inside the temporary directory.
    fn mock_path(&self, path: &Path) -> PathBuf {
        let mut real = self.temp_dir.path().to_path_buf();
        for component in path.components() {
            match component {
                Component::Normal(part) => real.push(part),
                Component::ParentDir => {
                    if real != self.temp_dir.path() {
                        real.pop();
                    }
                }
                Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            }
        }
        real
    }

    pub async fn read_to_string(&self, path: ArcPath) -> Result<String, io::Error> {
        tokio::fs::read_to_string(self.mock_path(&path)).await
    }

    pub async fn write_string(&self, path: ArcPath, content: String) -> Result<(), io::Error> {
        super::core::write_string(&self.mock_path(&path), content).await
    }

    pub async fn open(&self, path: ArcPath, truncate: bool) -> Result<File, io::Error> {
        super::core::open(&self.mock_path(&path), truncate).await
    }

    pub async fn remove_file(&self, path: ArcPath) -> Result<(), io::Error> {
        tokio::fs::remove_file(self.mock_path(&path)).await
    }

    /// Lists a directory, returning logical paths (as the caller named them)
    /// rather than the temporary locations.
    pub async fn read_dir(&self, path: ArcPath) -> Result<Vec<ArcPath>, io::Error> {
        let mut rd = tokio::fs::read_dir(self.mock_path(&path)).await?;
        let mut entries = Vec::new();
        while let Some(entry) = rd.next_entry().await? {
            entries.push(arc_path(path.join(entry.file_name())));
        }
        Ok(entries)
    }

    pub async fn mkdir(&self, path: ArcPath) -> Result<(), io::Error> {
        tokio::fs::create_dir_all(self.mock_path(&path)).await
    }
}
