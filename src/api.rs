//! API module providing high-level interfaces for external services.
//!
//! Intermediates calls to the networking actor: builds URLs, checks statuses
//! and decodes JSON bodies into domain types.

pub mod reader;

pub use reader::{
    Article, ArticleDetail, ArticleQuery, Feed, Health, Page, ReaderApi, Recommendation,
    RecommendationReceipt, Stats, SummaryStatus,
};
