use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;

use super::{LogLevel, LogMessage};

/// In-memory logger used by tests. Messages are recorded synchronously, so
/// a test can inspect them right after the call that logged.
#[derive(Debug, Clone, Default)]
pub struct Mock {
    messages: Arc<Mutex<Vec<LogMessage>>>,
}

impl Mock {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn log(&self, scope: &'static str, message: String, level: LogLevel) {
        let mut lock = self.messages.lock().unwrap_or_else(|e| e.into_inner());
        lock.push(LogMessage {
            level,
            scope,
            message,
        });
    }

    pub fn flush(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            for message in self.get_messages() {
                eprintln!("{message}");
            }
        })
    }

    pub fn get_messages(&self) -> Vec<LogMessage> {
        let lock = self.messages.lock().unwrap_or_else(|e| e.into_inner());
        lock.clone()
    }
}
