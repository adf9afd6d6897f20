use std::{io, path::Path};

use tokio::{
    fs::{File, OpenOptions},
    sync::{mpsc, oneshot},
};

use super::message::Message;
use crate::{ArcPath, arc_path};

/// The core of the Fs actor, responsible for handling filesystem operations.
///
/// Each message is served in its own task, so a slow disk operation never
/// holds back the rest of the queue.
#[derive(Debug, Default)]
pub struct Core;

impl Core {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn spawn(self) -> (super::Fs, tokio::task::JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel(crate::BUFFER_SIZE);
        let handle = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                tokio::spawn(Self::handle(msg));
            }
        });
        (super::Fs::Actual(tx), handle)
    }

    async fn handle(msg: Message) {
        use Message::*;
        match msg {
            ReadToString { tx, path } => {
                let _ = tx.send(tokio::fs::read_to_string(&path).await);
            }
            WriteString { tx, path, content } => {
                let _ = tx.send(write_string(&path, content).await);
            }
            OpenFile { tx, path, truncate } => {
                let _ = tx.send(open(&path, truncate).await);
            }
            RemoveFile { tx, path } => {
                let _ = tx.send(tokio::fs::remove_file(&path).await);
            }
            ReadDir { tx, path } => Self::read_dir(tx, path).await,
            MkDir { tx, path } => {
                let _ = tx.send(tokio::fs::create_dir_all(&path).await);
            }
        }
    }

    async fn read_dir(tx: oneshot::Sender<Result<Vec<ArcPath>, io::Error>>, path: ArcPath) {
        let res = async {
            let mut rd = tokio::fs::read_dir(&path).await?;
            let mut entries = Vec::new();
            while let Some(entry) = rd.next_entry().await? {
                entries.push(arc_path(entry.path()));
            }
            Ok(entries)
        }
        .await;
        let _ = tx.send(res);
    }
}

/// Writes `content` to `path`, creating missing parent directories.
pub(super) async fn write_string(path: &Path, content: String) -> Result<(), io::Error> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, content).await
}

/// Opens `path` for writing, creating missing parent directories.
pub(super) async fn open(path: &Path, truncate: bool) -> Result<File, io::Error> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    OpenOptions::new()
        .write(true)
        .create(true)
        .append(!truncate)
        .truncate(truncate)
        .open(path)
        .await
}
