use super::*;
use crate::net::{Canned, NetMock};

const BASE: &str = "http://reader.test/api";

fn api() -> (ReaderApi, NetMock) {
    let mock = NetMock::new();
    let api = ReaderApi::new(Net::from(mock.clone()), format!("{BASE}/").into());
    (api, mock)
}

const PAGE: &str = r#"{
    "items": [{"id": 1, "title": "Rust 2024", "url": "https://a/1",
               "one_liner": null, "keywords": ["rust"],
               "published_at": "2024-05-01T08:30:00", "feed_title": "Blog",
               "feed_category": "tech"}],
    "total": 21, "page": 1, "page_size": 20, "has_next": true
}"#;

#[tokio::test]
async fn test_list_articles() {
    let (api, mock) = api();
    mock.on_get(
        &format!("{BASE}/articles/"),
        &[("page", "1"), ("page_size", "20"), ("keyword", "rust")],
        Canned::json(200, PAGE),
    );

    let page = api
        .list_articles(&ArticleQuery {
            page: 1,
            page_size: 20,
            feed_id: None,
            category: None,
            keyword: Some("rust".into()),
        })
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].keywords, vec!["rust".to_string()]);
    assert!(page.has_next);
    assert_eq!(page.total, 21);
}

#[tokio::test]
async fn test_not_found_uses_detail() {
    let (api, mock) = api();
    mock.on_get(
        &format!("{BASE}/articles/99"),
        &[],
        Canned::json(404, r#"{"detail": "Article not found"}"#),
    );
    let err = api.get_article(99).await.unwrap_err();
    assert_eq!(err, FetchError::server(404, "Article not found"));
}

#[tokio::test]
async fn test_server_error_falls_back_to_body() {
    let (api, mock) = api();
    mock.on_get(
        &format!("{BASE}/stats"),
        &[],
        Canned::json(502, "Bad Gateway"),
    );
    let err = api.get_stats().await.unwrap_err();
    assert_eq!(err, FetchError::server(502, "Bad Gateway"));
}

#[tokio::test]
async fn test_malformed_json_is_decode_error() {
    let (api, mock) = api();
    mock.on_get(
        &format!("{BASE}/feeds/categories"),
        &[],
        Canned::json(200, r#"["tech", "#),
    );
    let err = api.get_categories().await.unwrap_err();
    assert!(matches!(err, FetchError::Decode { .. }));
}

#[tokio::test]
async fn test_detail_and_latest() {
    let (api, mock) = api();
    mock.on_get(
        &format!("{BASE}/articles/42"),
        &[],
        Canned::json(
            200,
            r#"{"id": 42, "title": "t", "url": "u", "content": "c", "content_hash": "h",
                "summary_cn": "摘要", "one_liner": "short", "keywords": [],
                "summary_status": "completed", "feed_title": "f"}"#,
        ),
    );
    mock.on_get(
        &format!("{BASE}/articles/latest"),
        &[("limit", "5")],
        Canned::json(200, "[]"),
    );

    let detail = api.get_article(42).await.unwrap();
    assert_eq!(detail.summary_status, SummaryStatus::Completed);
    assert_eq!(detail.summary_cn.as_deref(), Some("摘要"));
    assert!(api.latest(5).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_feeds_stats_health() {
    let (api, mock) = api();
    mock.on_get(
        &format!("{BASE}/feeds/"),
        &[],
        Canned::json(
            200,
            r#"[{"id": 5, "url": "https://b/rss", "title": "B", "is_active": true,
                 "fetch_interval_minutes": 30, "created_at": "2024-01-01T00:00:00"}]"#,
        ),
    );
    mock.on_get(
        &format!("{BASE}/stats"),
        &[],
        Canned::json(
            200,
            r#"{"total_feeds": 3, "active_feeds": 2, "total_articles": 100,
                "articles_today": 7, "summaries_pending": 4, "summaries_failed": 1,
                "summaries_completed": 95, "last_fetch_at": null, "completion_rate": 0.95}"#,
        ),
    );
    mock.on_get(
        &format!("{BASE}/health"),
        &[],
        Canned::json(200, r#"{"status": "ok"}"#),
    );

    assert_eq!(api.list_feeds().await.unwrap()[0].id, 5);
    assert_eq!(api.get_stats().await.unwrap().summaries_completed, 95);
    assert_eq!(api.health().await.unwrap().status, "ok");
}

#[tokio::test]
async fn test_submit_recommendation() {
    let (api, mock) = api();
    mock.on_post(
        &format!("{BASE}/recommendations/"),
        Canned::json(200, r#"{"success": true, "message": "thanks"}"#),
    );

    let rec = Recommendation::new("https://c/feed.xml")
        .unwrap()
        .feed_name(Some("C".into()));
    let receipt = api.submit_recommendation(&rec).await.unwrap();
    assert!(receipt.success);

    let posted = mock.posted();
    assert_eq!(posted[0].0, format!("{BASE}/recommendations/"));
    assert_eq!(posted[0].1["feed_name"], "C");
}
