use tokio::sync::oneshot;

use crate::{ArcPath, ArcStr, log::LogLevel};

use super::data::{PathOpt, StrOpt, USizeOpt};

/// Messages that can be sent to the configuration actor.
///
/// Getters carry a channel to send the value back; setters are fire-and-forget.
#[derive(Debug)]
pub enum Message {
    /// Load configuration from file
    Load {
        tx: oneshot::Sender<anyhow::Result<()>>,
    },
    /// Save configuration to file
    Save {
        tx: oneshot::Sender<anyhow::Result<()>>,
    },
    GetPath {
        opt: PathOpt,
        tx: oneshot::Sender<ArcPath>,
    },
    GetLogLevel {
        tx: oneshot::Sender<LogLevel>,
    },
    GetUSize {
        opt: USizeOpt,
        tx: oneshot::Sender<usize>,
    },
    GetStr {
        opt: StrOpt,
        tx: oneshot::Sender<ArcStr>,
    },
    SetPath {
        opt: PathOpt,
        path: ArcPath,
    },
    SetLogLevel {
        level: LogLevel,
    },
    SetUSize {
        opt: USizeOpt,
        size: usize,
    },
    SetStr {
        opt: StrOpt,
        value: ArcStr,
    },
}
