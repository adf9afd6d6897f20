use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;

pub mod config;
pub mod list;
pub mod prefs;
pub mod queries;
pub mod search;
pub mod summary;
pub mod view;

mod core;
mod data;

pub use self::core::{API_URL_VAR, config_path};
pub use data::{Command, MockData};

use crate::ArcPath;

/// App - Central coordinator of the reader
///
/// Owns every actor (config, log, net, query client, prefs) and executes
/// the commands of the CLI on top of them.
#[derive(Debug, Clone)]
pub enum App {
    /// Fully built and ready to execute commands
    Ready(Arc<core::Core>),
    /// Mock implementation for testing
    Mock(Arc<Mutex<MockData>>),
}

impl App {
    /// Builds the App from the configuration file at `config_path`.
    ///
    /// This performs all necessary setup including:
    /// - Actor initialization (fs, config, log, net, query client)
    /// - Configuration loading, with the environment override of the
    ///   service URL
    pub async fn build(config_path: ArcPath) -> Result<Self> {
        let core = core::Core::build(config_path).await?;
        Ok(Self::Ready(Arc::new(core)))
    }

    /// Create a mock App for testing
    pub fn mock(data: MockData) -> Self {
        Self::Mock(Arc::new(Mutex::new(data)))
    }

    /// Executes a command and prints its output.
    pub async fn resolve(&self, command: Command) -> Result<()> {
        match self {
            Self::Ready(core) => {
                let out = core.execute(command).await?;
                if !out.is_empty() {
                    println!("{out}");
                }
                Ok(())
            }
            Self::Mock(data) => {
                data.lock().await.executed_commands.push(command);
                Ok(())
            }
        }
    }

    /// Flushes the logger. The App must not be used afterwards.
    pub async fn shutdown(self) -> Result<()> {
        match self {
            Self::Ready(core) => {
                core.log().clone().flush().await?;
                Ok(())
            }
            Self::Mock(data) => {
                data.lock().await.shutdown_called = true;
                Ok(())
            }
        }
    }
}
