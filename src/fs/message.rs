use std::io;

use tokio::{fs::File, sync::oneshot};

use crate::ArcPath;

/// Messages that can be sent to a [`Fs`](super::Fs) actor.
///
/// This enum defines the different types of filesystem operations that can be performed
/// through the actor system.
#[derive(Debug)]
pub enum Message {
    /// Reads a whole file as a string
    ReadToString {
        /// Channel to send the result back to the caller
        tx: oneshot::Sender<Result<String, io::Error>>,
        /// The path of the file to read
        path: ArcPath,
    },
    /// Replaces the content of a file
    WriteString {
        tx: oneshot::Sender<Result<(), io::Error>>,
        path: ArcPath,
        content: String,
    },
    /// Opens a file for writing, either appending or truncating
    OpenFile {
        tx: oneshot::Sender<Result<File, io::Error>>,
        path: ArcPath,
        truncate: bool,
    },
    /// Removes a file from the filesystem
    RemoveFile {
        tx: oneshot::Sender<Result<(), io::Error>>,
        path: ArcPath,
    },
    /// Reads the contents of a directory
    ReadDir {
        tx: oneshot::Sender<Result<Vec<ArcPath>, io::Error>>,
        path: ArcPath,
    },
    /// Creates a directory and its parents
    MkDir {
        tx: oneshot::Sender<Result<(), io::Error>>,
        path: ArcPath,
    },
}
