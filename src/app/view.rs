//! Plain-text rendering of the view-states, for the CLI.

use std::fmt::Write;

use crate::api::{Article, ArticleDetail, Feed, Health, Stats};

use super::{list::ListView, summary::SummaryView};

pub fn article_line(article: &Article) -> String {
    let mut line = format!("[{}] {} ({})", article.id, article.title, article.feed_title);
    if let Some(published) = article.published_at {
        let _ = write!(line, " {}", published.format("%Y-%m-%d %H:%M"));
    }
    if let Some(one_liner) = &article.one_liner {
        let _ = write!(line, "\n      {one_liner}");
    }
    line
}

pub fn list(view: &ListView) -> String {
    match view {
        ListView::Loading => "Loading articles...".to_string(),
        ListView::Failed(err) => format!("Failed to load articles, please retry later ({err})"),
        ListView::NoMatches { keyword } => format!("No articles matching \"{keyword}\""),
        ListView::Collecting => "No articles yet, they are being collected".to_string(),
        ListView::Page {
            page,
            is_previous,
            is_error,
            is_fetching,
        } => {
            let mut out = String::new();
            for article in &page.items {
                let _ = writeln!(out, "{}", article_line(article));
            }
            let _ = write!(
                out,
                "Page {} ({} articles){}",
                page.page,
                page.total,
                if page.has_next { ", more with :n" } else { "" }
            );
            if *is_previous || *is_fetching {
                out.push_str(" [updating]");
            }
            if *is_error {
                out.push_str(" [refresh failed, showing cached data]");
            }
            out
        }
    }
}

pub fn summary(view: &SummaryView) -> String {
    match view {
        SummaryView::Loading => "Loading summary...".to_string(),
        SummaryView::Unavailable(err) => format!("Could not load the article ({err})"),
        SummaryView::Pending => "Summary is being generated".to_string(),
        SummaryView::Completed { summary, one_liner } => match one_liner {
            Some(one_liner) => format!("{one_liner}\n\n{summary}"),
            None => summary.clone(),
        },
        SummaryView::Failed => {
            "Summary generation failed, the server will retry automatically".to_string()
        }
    }
}

pub fn detail(detail: &ArticleDetail, summary_view: &SummaryView) -> String {
    let mut out = format!("{}\n{}\n", detail.title, detail.url);
    let _ = writeln!(out, "Feed: {}", detail.feed_title);
    if let Some(author) = &detail.author {
        let _ = writeln!(out, "Author: {author}");
    }
    if let Some(published) = detail.published_at {
        let _ = writeln!(out, "Published: {}", published.format("%Y-%m-%d %H:%M UTC"));
    }
    if !detail.keywords.is_empty() {
        let _ = writeln!(out, "Keywords: {}", detail.keywords.join(", "));
    }
    let _ = write!(out, "\n{}", summary(summary_view));
    out
}

pub fn feeds(feeds: &[Feed]) -> String {
    let mut out = String::new();
    for feed in feeds {
        let _ = write!(out, "[{}] {}", feed.id, feed.title);
        if let Some(category) = &feed.category {
            let _ = write!(out, " <{category}>");
        }
        if !feed.is_active {
            out.push_str(" (inactive)");
        }
        let _ = writeln!(out, "\n      {}", feed.url);
    }
    if out.is_empty() {
        out.push_str("No feeds");
    }
    out.trim_end().to_string()
}

pub fn stats(stats: &Stats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Feeds: {} ({} active)", stats.total_feeds, stats.active_feeds);
    let _ = writeln!(
        out,
        "Articles: {} ({} today)",
        stats.total_articles, stats.articles_today
    );
    let _ = write!(
        out,
        "Summaries: {} completed, {} pending, {} failed ({:.1}% done)",
        stats.summaries_completed,
        stats.summaries_pending,
        stats.summaries_failed,
        stats.completion_rate
    );
    if let Some(last) = stats.last_fetch_at {
        let _ = write!(out, "\nLast fetch: {}", last.format("%Y-%m-%d %H:%M UTC"));
    }
    out
}

pub fn health(health: &Health) -> String {
    match health.timestamp {
        Some(ts) => format!("{} at {}", health.status, ts.to_rfc3339()),
        None => health.status.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_states_differ() {
        let no_matches = list(&ListView::NoMatches {
            keyword: "rust".into(),
        });
        let collecting = list(&ListView::Collecting);
        assert!(no_matches.contains("rust"));
        assert_ne!(no_matches, collecting);
    }

    #[test]
    fn test_summary_failures_differ() {
        let failed = summary(&SummaryView::Failed);
        let unavailable = summary(&SummaryView::Unavailable(
            crate::net::FetchError::network("timed out"),
        ));
        assert!(failed.contains("retry automatically"));
        assert!(unavailable.contains("timed out"));
    }

    #[test]
    fn test_article_line() {
        let article: Article = serde_json::from_str(
            r#"{"id": 3, "title": "Async Rust", "url": "u", "feed_title": "Blog",
                "one_liner": "Futures explained", "published_at": "2024-05-01T08:30:00Z"}"#,
        )
        .unwrap();
        assert_eq!(
            article_line(&article),
            "[3] Async Rust (Blog) 2024-05-01 08:30\n      Futures explained"
        );
    }
}
