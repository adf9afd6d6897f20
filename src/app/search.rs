use std::time::Duration;

use crate::debounce::Debouncer;

use super::list::ArticleList;

/// Search box feeding the article list.
///
/// Keystrokes go through a [`Debouncer`]; only a settled keyword reaches the
/// list, so typing "rust" costs one request instead of four.
#[derive(Debug, Clone)]
pub struct SearchBox {
    text: Debouncer<String>,
}

impl SearchBox {
    pub fn spawn(delay: Duration) -> Self {
        Self {
            text: Debouncer::spawn(String::new(), delay),
        }
    }

    /// The raw content of the box after a keystroke.
    pub async fn input(&self, text: &str) {
        self.text.set(text.to_string()).await;
    }

    /// The settled keyword, `None` when the box is blank.
    pub fn keyword(&self) -> Option<String> {
        keyword(&self.text.value())
    }

    /// Waits for the next settled keyword. The outer `None` means the box
    /// is gone.
    pub async fn settled(&mut self) -> Option<Option<String>> {
        let text = self.text.changed().await?;
        Some(keyword(&text))
    }

    /// Waits for the next settled keyword and applies it to `list`.
    pub async fn apply_next(&mut self, list: &mut ArticleList) -> bool {
        match self.settled().await {
            Some(keyword) => {
                list.set_keyword(keyword).await;
                true
            }
            None => false,
        }
    }
}

fn keyword(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}
