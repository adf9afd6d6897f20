use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Timestamps come either as RFC 3339 or as naive ISO-8601 (implicitly UTC).
fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }
    NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| Some(naive.and_utc()))
        .map_err(serde::de::Error::custom)
}

/// An article as shown in lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub one_liner: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, deserialize_with = "timestamp")]
    pub published_at: Option<DateTime<Utc>>,
    pub feed_title: String,
    #[serde(default)]
    pub feed_category: Option<String>,
}

/// Progress of the server-side summarization of an article.
///
/// Anything the server sends that we don't know about is read as `Pending`:
/// it is the only state that promises nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryStatus {
    Completed,
    Failed,
    #[default]
    #[serde(other)]
    Pending,
}

/// Full article with its summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleDetail {
    pub id: i64,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub content_hash: String,
    #[serde(default)]
    pub summary_cn: Option<String>,
    #[serde(default)]
    pub one_liner: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub summary_status: SummaryStatus,
    #[serde(default, deserialize_with = "timestamp")]
    pub published_at: Option<DateTime<Utc>>,
    pub feed_title: String,
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub has_next: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub id: i64,
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default = "default_interval")]
    pub fetch_interval_minutes: u32,
    #[serde(default, deserialize_with = "timestamp")]
    pub last_fetched_at: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

fn default_interval() -> u32 {
    30
}

/// Aggregate counters of the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub total_feeds: u64,
    pub active_feeds: u64,
    pub total_articles: u64,
    pub articles_today: u64,
    pub summaries_pending: u64,
    pub summaries_failed: u64,
    pub summaries_completed: u64,
    #[serde(default, deserialize_with = "timestamp")]
    pub last_fetch_at: Option<DateTime<Utc>>,
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    #[serde(default, deserialize_with = "timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Parameters of the article listing. `None` filters are not sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArticleQuery {
    pub page: u32,
    pub page_size: u32,
    pub feed_id: Option<i64>,
    pub category: Option<String>,
    pub keyword: Option<String>,
}

impl ArticleQuery {
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("page_size".to_string(), self.page_size.to_string()),
        ];
        if let Some(feed_id) = self.feed_id {
            pairs.push(("feed_id".to_string(), feed_id.to_string()));
        }
        if let Some(category) = &self.category {
            pairs.push(("category".to_string(), category.clone()));
        }
        if let Some(keyword) = &self.keyword {
            pairs.push(("keyword".to_string(), keyword.clone()));
        }
        pairs
    }
}

/// A feed suggested by a reader. Built through [`Recommendation::new`], which
/// refuses blank URLs so they never reach the service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    feed_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    feed_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    contact: Option<String>,
}

impl Recommendation {
    pub fn new(feed_url: &str) -> anyhow::Result<Self> {
        let feed_url = feed_url.trim();
        if feed_url.is_empty() {
            anyhow::bail!("Feed URL must not be empty");
        }
        Ok(Self {
            feed_url: feed_url.to_string(),
            feed_name: None,
            reason: None,
            contact: None,
        })
    }

    pub fn feed_name(mut self, name: Option<String>) -> Self {
        self.feed_name = name.filter(|n| !n.trim().is_empty());
        self
    }

    pub fn reason(mut self, reason: Option<String>) -> Self {
        self.reason = reason.filter(|r| !r.trim().is_empty());
        self
    }

    pub fn contact(mut self, contact: Option<String>) -> Self {
        self.contact = contact.filter(|c| !c.trim().is_empty());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationReceipt {
    pub success: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_defaults() {
        let detail: ArticleDetail = serde_json::from_str(
            r#"{"id": 42, "title": "t", "url": "u", "content": "c",
                "content_hash": "h", "feed_title": "f",
                "published_at": "2024-05-01T08:30:00"}"#,
        )
        .unwrap();
        assert_eq!(detail.summary_status, SummaryStatus::Pending);
        assert!(detail.keywords.is_empty());
        assert_eq!(
            detail.published_at.unwrap().to_rfc3339(),
            "2024-05-01T08:30:00+00:00"
        );
    }

    #[test]
    fn test_summary_status_parsing() {
        let parse = |s: &str| serde_json::from_str::<SummaryStatus>(s).unwrap();
        assert_eq!(parse(r#""completed""#), SummaryStatus::Completed);
        assert_eq!(parse(r#""failed""#), SummaryStatus::Failed);
        assert_eq!(parse(r#""pending""#), SummaryStatus::Pending);
        assert_eq!(parse(r#""processing""#), SummaryStatus::Pending);
    }

    #[test]
    fn test_rfc3339_timestamp() {
        let health: Health =
            serde_json::from_str(r#"{"status":"ok","timestamp":"2024-05-01T08:30:00Z"}"#).unwrap();
        assert!(health.timestamp.is_some());
    }

    #[test]
    fn test_query_pairs_omit_missing_filters() {
        let query = ArticleQuery {
            page: 2,
            page_size: 20,
            feed_id: None,
            category: None,
            keyword: Some("rust".into()),
        };
        assert_eq!(
            query.to_pairs(),
            vec![
                ("page".to_string(), "2".to_string()),
                ("page_size".to_string(), "20".to_string()),
                ("keyword".to_string(), "rust".to_string()),
            ]
        );
    }

    #[test]
    fn test_blank_recommendation_rejected() {
        assert!(Recommendation::new("   ").is_err());
        let rec = Recommendation::new(" https://blog.example/rss ")
            .unwrap()
            .reason(Some(String::new()));
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json, serde_json::json!({"feed_url": "https://blog.example/rss"}));
    }
}
