use std::io::ErrorKind;

use anyhow::Context;

use crate::{ArcPath, fs::Fs};

use super::{data::Data, message::Message};

/// The core configuration actor that owns the configuration data and
/// persists it as TOML through the [`Fs`] actor.
pub struct Core {
    fs: Fs,
    /// The path to the configuration file
    path: ArcPath,
    data: Data,
}

impl Core {
    pub fn new(fs: Fs, path: ArcPath) -> Self {
        Self {
            fs,
            path,
            data: Data::default(),
        }
    }

    pub fn spawn(mut self) -> (super::Config, tokio::task::JoinHandle<()>) {
        let (tx, mut rx) = tokio::sync::mpsc::channel(crate::BUFFER_SIZE);
        let handle = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                match msg {
                    Message::Load { tx } => {
                        let res = self.load().await;
                        let _ = tx.send(res);
                    }
                    Message::Save { tx } => {
                        let res = self.save().await;
                        let _ = tx.send(res);
                    }
                    Message::GetPath { opt, tx } => {
                        let _ = tx.send(self.data.path(opt));
                    }
                    Message::GetLogLevel { tx } => {
                        let _ = tx.send(self.data.log_level());
                    }
                    Message::GetUSize { opt, tx } => {
                        let _ = tx.send(self.data.usize(opt));
                    }
                    Message::GetStr { opt, tx } => {
                        let _ = tx.send(self.data.str(opt));
                    }
                    Message::SetPath { opt, path } => {
                        self.data.set_path(opt, path);
                    }
                    Message::SetLogLevel { level } => {
                        self.data.set_log_level(level);
                    }
                    Message::SetUSize { opt, size } => {
                        self.data.set_usize(opt, size);
                    }
                    Message::SetStr { opt, value } => {
                        self.data.set_str(opt, value);
                    }
                }
            }
        });
        (super::Config::Actual(tx), handle)
    }

    /// Loads the configuration from the file. A missing file is created with
    /// the defaults; a malformed one leaves the defaults in place and reports
    /// the parse error.
    async fn load(&mut self) -> anyhow::Result<()> {
        let contents = match self.fs.read_to_string(self.path.clone()).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.data = Data::default();
                return self.save().await;
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read config file: {}", self.path.display())
                });
            }
        };
        self.data = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", self.path.display()))?;
        Ok(())
    }

    async fn save(&self) -> anyhow::Result<()> {
        let contents =
            toml::to_string_pretty(&self.data).context("Failed to serialize config")?;
        self.fs
            .write_string(self.path.clone(), contents)
            .await
            .with_context(|| format!("Failed to write config file: {}", self.path.display()))
    }
}
