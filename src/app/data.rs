/// Commands that can be executed by the App
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// One page of the article list
    Articles {
        page: u32,
        /// Falls back to the configured page size
        page_size: Option<u32>,
        feed_id: Option<i64>,
        category: Option<String>,
        keyword: Option<String>,
    },
    /// Articles of the last 24 hours
    Latest { limit: u32 },
    /// One article with its summary
    Article { id: i64 },
    Feeds,
    Categories,
    Stats,
    Health,
    /// Suggest a feed to the service
    Recommend {
        url: String,
        name: Option<String>,
        reason: Option<String>,
        contact: Option<String>,
    },
    /// Show the theme, or switch it when `dark` is given
    Theme { dark: Option<bool> },
    /// Interactive list with search, paging and summaries
    Browse,
}

/// Mock data for testing the App
#[derive(Debug, Default)]
pub struct MockData {
    /// Commands that have been executed
    pub executed_commands: Vec<Command>,
    /// Whether shutdown has been called
    pub shutdown_called: bool,
}
