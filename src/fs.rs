use std::io;

use anyhow::Context;
use tokio::{fs::File, sync::mpsc::Sender};

use crate::ArcPath;

mod core;
mod message;
mod mock;

use message::Message;

/// The fs actor is responsible for handling filesystem operations.
///
/// This enum represents either a real filesystem actor or a mock implementation
/// for testing purposes. It provides a unified interface for filesystem operations
/// regardless of the underlying implementation.
///
/// # Examples
/// ```ignore
/// let fs = Fs::spawn();
/// fs.write_string(ArcPath::from(Path::new("prefs.toml")), "darkMode = \"true\"".into()).await?;
/// ```
///
/// # Thread Safety
/// This type is designed to be safely shared between threads. Cloning is cheap as it only
/// copies the channel sender or mock reference.
#[derive(Debug, Clone)]
pub enum Fs {
    /// A real filesystem actor that interacts with the system
    Actual(Sender<Message>),
    /// A mock implementation rooted in a temporary directory
    Mock(mock::Mock),
}

impl Fs {
    /// Creates a new filesystem actor and spawns its core.
    pub fn spawn() -> Self {
        let (fs, _) = core::Core::new().spawn();
        fs
    }

    /// Creates a mock filesystem whose paths all resolve inside a fresh
    /// temporary directory.
    pub fn mock() -> Self {
        Self::Mock(mock::Mock::new())
    }

    /// Reads the whole file as UTF-8.
    pub async fn read_to_string(&self, path: ArcPath) -> Result<String, io::Error> {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = tokio::sync::oneshot::channel();
                sender
                    .send(Message::ReadToString { tx, path })
                    .await
                    .context("Reading file with Fs")
                    .expect("fs actor died");
                rx.await
                    .context("Awaiting response for file read with Fs")
                    .expect("fs actor died")
            }
            Self::Mock(mock) => mock.read_to_string(path).await,
        }
    }

    /// Replaces the file content, creating the file and its parent
    /// directories when needed.
    pub async fn write_string(&self, path: ArcPath, content: String) -> Result<(), io::Error> {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = tokio::sync::oneshot::channel();
                sender
                    .send(Message::WriteString { tx, path, content })
                    .await
                    .context("Writing file with Fs")
                    .expect("fs actor died");
                rx.await
                    .context("Awaiting response for file write with Fs")
                    .expect("fs actor died")
            }
            Self::Mock(mock) => mock.write_string(path, content).await,
        }
    }

    /// Opens a file for appending, creating it if needed.
    pub async fn append_file(&self, path: ArcPath) -> Result<File, io::Error> {
        self.open(path, false).await
    }

    /// Opens a file for writing, truncating any previous content.
    pub async fn truncate_file(&self, path: ArcPath) -> Result<File, io::Error> {
        self.open(path, true).await
    }

    async fn open(&self, path: ArcPath, truncate: bool) -> Result<File, io::Error> {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = tokio::sync::oneshot::channel();
                sender
                    .send(Message::OpenFile { tx, path, truncate })
                    .await
                    .context("Opening file with Fs")
                    .expect("fs actor died");
                rx.await
                    .context("Awaiting response for file open with Fs")
                    .expect("fs actor died")
            }
            Self::Mock(mock) => mock.open(path, truncate).await,
        }
    }

    /// Removes a file from the filesystem
    pub async fn remove_file(&self, path: ArcPath) -> Result<(), io::Error> {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = tokio::sync::oneshot::channel();
                sender
                    .send(Message::RemoveFile { tx, path })
                    .await
                    .context("Removing file with Fs")
                    .expect("fs actor died");
                rx.await
                    .context("Awaiting response for file removal with Fs")
                    .expect("fs actor died")
            }
            Self::Mock(mock) => mock.remove_file(path).await,
        }
    }

    /// Lists the entries of a directory
    pub async fn read_dir(&self, path: ArcPath) -> Result<Vec<ArcPath>, io::Error> {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = tokio::sync::oneshot::channel();
                sender
                    .send(Message::ReadDir { tx, path })
                    .await
                    .context("Reading directory with Fs")
                    .expect("fs actor died");
                rx.await
                    .context("Awaiting response for directory read with Fs")
                    .expect("fs actor died")
            }
            Self::Mock(mock) => mock.read_dir(path).await,
        }
    }

    /// Creates a directory and its parents if they don't exist
    pub async fn mkdir(&self, path: ArcPath) -> Result<(), io::Error> {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = tokio::sync::oneshot::channel();
                sender
                    .send(Message::MkDir { tx, path })
                    .await
                    .context("Creating directory with Fs")
                    .expect("fs actor died");
                rx.await
                    .context("Awaiting response for directory creation with Fs")
                    .expect("fs actor died")
            }
            Self::Mock(mock) => mock.mkdir(path).await,
        }
    }
}
