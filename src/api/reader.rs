use serde::de::DeserializeOwned;

use crate::{
    ArcStr,
    net::{FetchError, Net, NetResponse},
};

pub mod data;
#[cfg(test)]
mod tests;

pub use data::{
    Article, ArticleDetail, ArticleQuery, Feed, Health, Page, Recommendation,
    RecommendationReceipt, Stats, SummaryStatus,
};

/// Typed client of the content service.
///
/// Holds no state besides the base URL, so it is cloned freely into fetch
/// closures; concurrency is handled by the [`Net`] actor underneath.
///
/// # Examples
/// ```ignore
/// let api = ReaderApi::new(net, "http://localhost:8000/api".into());
/// let detail = api.get_article(42).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ReaderApi {
    net: Net,
    base_url: ArcStr,
}

impl ReaderApi {
    pub fn new(net: Net, base_url: ArcStr) -> Self {
        let base_url = ArcStr::from(base_url.trim_end_matches('/'));
        Self { net, base_url }
    }

    fn url(&self, path: &str) -> ArcStr {
        ArcStr::from(format!("{}{}", self.base_url, path))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(String, String)>,
    ) -> Result<T, FetchError> {
        let response = self.net.get(self.url(path), query).await?;
        decode(response)
    }

    /// `GET /articles/` with pagination and optional filters.
    pub async fn list_articles(&self, query: &ArticleQuery) -> Result<Page<Article>, FetchError> {
        self.get("/articles/", query.to_pairs()).await
    }

    /// `GET /articles/latest`: articles of the last 24 hours.
    pub async fn latest(&self, limit: u32) -> Result<Vec<Article>, FetchError> {
        self.get("/articles/latest", vec![("limit".into(), limit.to_string())])
            .await
    }

    /// `GET /articles/{id}`: full article with its summary.
    pub async fn get_article(&self, id: i64) -> Result<ArticleDetail, FetchError> {
        self.get(&format!("/articles/{id}"), vec![]).await
    }

    pub async fn list_feeds(&self) -> Result<Vec<Feed>, FetchError> {
        self.get("/feeds/", vec![]).await
    }

    pub async fn get_categories(&self) -> Result<Vec<String>, FetchError> {
        self.get("/feeds/categories", vec![]).await
    }

    pub async fn get_stats(&self) -> Result<Stats, FetchError> {
        self.get("/stats", vec![]).await
    }

    pub async fn health(&self) -> Result<Health, FetchError> {
        self.get("/health", vec![]).await
    }

    /// `POST /recommendations/`. Fire once, nothing is cached.
    pub async fn submit_recommendation(
        &self,
        recommendation: &Recommendation,
    ) -> Result<RecommendationReceipt, FetchError> {
        let body = serde_json::to_value(recommendation)?;
        let response = self
            .net
            .post_json(self.url("/recommendations/"), body)
            .await?;
        decode(response)
    }
}

/// Maps a raw response to the expected type: non-2xx statuses become
/// [`FetchError::Server`] with the service's `detail`/`message` when it sent
/// one, undecodable bodies become [`FetchError::Decode`].
fn decode<T: DeserializeOwned>(response: NetResponse) -> Result<T, FetchError> {
    if !response.is_success() {
        return Err(FetchError::server(
            response.status,
            error_message(&response.body),
        ));
    }
    Ok(serde_json::from_str(&response.body)?)
}

fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let field = parsed.as_ref().and_then(|json| {
        ["detail", "message"]
            .iter()
            .find_map(|name| json.get(name).and_then(|v| v.as_str()))
    });
    match field {
        Some(message) => message.to_string(),
        None if body.trim().is_empty() => "empty response".to_string(),
        None => body.trim().to_string(),
    }
}
