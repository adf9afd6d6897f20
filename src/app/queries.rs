//! Cache keys and fetchers of every resource the reader consumes.
//!
//! Each function returns the key identifying the resource together with the
//! fetcher that loads it, so that two views asking for the same thing always
//! agree on the key and share one cache entry.

use crate::{
    api::{ArticleQuery, ReaderApi},
    query::{QueryFn, QueryKey, query_fn},
};

/// A cache key with the fetcher that fills it.
pub type Resource = (QueryKey, QueryFn);

pub const ARTICLES: &str = "articles";
pub const ARTICLES_LATEST: &str = "articlesLatest";
pub const ARTICLE_DETAIL: &str = "articleDetail";
pub const FEEDS: &str = "feeds";
pub const CATEGORIES: &str = "categories";
pub const STATS: &str = "stats";
pub const HEALTH: &str = "health";

/// One page of the article list. Filters left unset are not part of the key.
pub fn articles(api: &ReaderApi, query: &ArticleQuery) -> Resource {
    let key = QueryKey::new(ARTICLES)
        .param("page", query.page)
        .param("page_size", query.page_size)
        .param_opt("feed_id", query.feed_id)
        .param_opt("category", query.category.clone())
        .param_opt("keyword", query.keyword.clone());
    let api = api.clone();
    let query = query.clone();
    let fetch = query_fn(move || {
        let api = api.clone();
        let query = query.clone();
        async move { api.list_articles(&query).await }
    });
    (key, fetch)
}

pub fn latest(api: &ReaderApi, limit: u32) -> Resource {
    let key = QueryKey::new(ARTICLES_LATEST).param("limit", limit);
    let api = api.clone();
    let fetch = query_fn(move || {
        let api = api.clone();
        async move { api.latest(limit).await }
    });
    (key, fetch)
}

/// Article detail, summary included. Keyed by the article id alone.
pub fn article_detail(api: &ReaderApi, id: i64) -> Resource {
    let key = QueryKey::new(ARTICLE_DETAIL).param("id", id);
    let api = api.clone();
    let fetch = query_fn(move || {
        let api = api.clone();
        async move { api.get_article(id).await }
    });
    (key, fetch)
}

pub fn feeds(api: &ReaderApi) -> Resource {
    let api = api.clone();
    let fetch = query_fn(move || {
        let api = api.clone();
        async move { api.list_feeds().await }
    });
    (QueryKey::new(FEEDS), fetch)
}

pub fn categories(api: &ReaderApi) -> Resource {
    let api = api.clone();
    let fetch = query_fn(move || {
        let api = api.clone();
        async move { api.get_categories().await }
    });
    (QueryKey::new(CATEGORIES), fetch)
}

pub fn stats(api: &ReaderApi) -> Resource {
    let api = api.clone();
    let fetch = query_fn(move || {
        let api = api.clone();
        async move { api.get_stats().await }
    });
    (QueryKey::new(STATS), fetch)
}

pub fn health(api: &ReaderApi) -> Resource {
    let api = api.clone();
    let fetch = query_fn(move || {
        let api = api.clone();
        async move { api.health().await }
    });
    (QueryKey::new(HEALTH), fetch)
}
