//! Paginated, filterable article list.

use std::sync::Arc;

use crate::{
    api::{Article, ArticleQuery, Page, ReaderApi},
    log::Log,
    net::FetchError,
    query::{Query, QueryClient, QueryOptions, QueryState},
};

use super::queries;

const SCOPE: &str = "app.list";

/// Active filters of the list. Unset filters are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub feed_id: Option<i64>,
    pub category: Option<String>,
    pub keyword: Option<String>,
}

/// What the list shows.
#[derive(Debug, Clone)]
pub enum ListView {
    /// First load, nothing to show yet
    Loading,
    /// Loading failed and there is no data to fall back to
    Failed(FetchError),
    /// The keyword search matched nothing
    NoMatches { keyword: String },
    /// No articles at all; the service is still collecting them
    Collecting,
    Page {
        page: Arc<Page<Article>>,
        /// The page shown belongs to the previous filters or page number
        is_previous: bool,
        /// The latest refresh failed; the page shown is the cached one
        is_error: bool,
        is_fetching: bool,
    },
}

/// Pagination controller over the article list query.
///
/// Holds the page number (1-based) and the filters, and keeps a single
/// [`Query`] bound to the matching `articles` key. Moving between pages or
/// changing a filter rebinds the query; the last page stays on screen
/// until the new one arrives.
pub struct ArticleList {
    api: ReaderApi,
    log: Log,
    page: u32,
    page_size: u32,
    filters: Filters,
    query: Query<Page<Article>>,
}

impl ArticleList {
    /// Binds the list at the page and filters of `request`.
    pub async fn bind(
        client: QueryClient,
        log: Log,
        api: ReaderApi,
        request: ArticleQuery,
        options: QueryOptions,
    ) -> Self {
        let request = ArticleQuery {
            page: request.page.max(1),
            keyword: normalize(request.keyword),
            ..request
        };
        let (key, fetch) = queries::articles(&api, &request);
        let query = Query::bind(
            client,
            log.clone(),
            key,
            fetch,
            options.keep_previous_data(true),
        )
        .await;
        Self {
            api,
            log,
            page: request.page,
            page_size: request.page_size,
            filters: Filters {
                feed_id: request.feed_id,
                category: request.category,
                keyword: request.keyword,
            },
            query,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    /// Parameters of the request for the current page and filters.
    pub fn request(&self) -> ArticleQuery {
        request(self.page, self.page_size, &self.filters)
    }

    pub fn state(&self) -> QueryState<Page<Article>> {
        self.query.state()
    }

    /// Whether the server said there is a page after the current one.
    ///
    /// Only the current page's own response counts: while it loads, the
    /// previous page on screen says nothing about it.
    pub fn has_next(&self) -> bool {
        let state = self.query.state();
        !state.is_previous_data && state.data.is_some_and(|page| page.has_next)
    }

    /// Moves to the next page. Does nothing unless [`has_next`](Self::has_next).
    pub async fn next(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        self.page += 1;
        self.rebind().await;
        true
    }

    /// Moves to the previous page. Does nothing on the first one.
    pub async fn prev(&mut self) -> bool {
        if self.page <= 1 {
            return false;
        }
        self.page -= 1;
        self.rebind().await;
        true
    }

    /// Blank keywords clear the search.
    pub async fn set_keyword(&mut self, keyword: Option<String>) {
        let filters = Filters {
            keyword: normalize(keyword),
            ..self.filters.clone()
        };
        self.set_filters(filters).await;
    }

    pub async fn set_feed(&mut self, feed_id: Option<i64>) {
        let filters = Filters {
            feed_id,
            ..self.filters.clone()
        };
        self.set_filters(filters).await;
    }

    pub async fn set_category(&mut self, category: Option<String>) {
        let filters = Filters {
            category,
            ..self.filters.clone()
        };
        self.set_filters(filters).await;
    }

    /// Replaces the filters; any actual change goes back to page 1.
    pub async fn set_filters(&mut self, filters: Filters) {
        if filters == self.filters {
            return;
        }
        self.log.info(SCOPE, format!("filters changed to {filters:?}"));
        self.filters = filters;
        self.page = 1;
        self.rebind().await;
    }

    async fn rebind(&mut self) {
        let (key, fetch) = queries::articles(&self.api, &self.request());
        self.query.set_key(key, fetch).await;
    }

    pub async fn refetch(&self) {
        self.query.refetch().await;
    }

    pub async fn changed(&mut self) -> bool {
        self.query.changed().await
    }

    pub async fn settled(&mut self) -> ListView {
        self.query.settled().await;
        self.view()
    }

    pub fn view(&self) -> ListView {
        let state = self.query.state();
        let Some(page) = state.data else {
            return match state.error {
                Some(error) if state.is_error => ListView::Failed(error),
                _ => ListView::Loading,
            };
        };
        if page.items.is_empty() && !state.is_previous_data {
            return match &self.filters.keyword {
                Some(keyword) => ListView::NoMatches {
                    keyword: keyword.clone(),
                },
                None => ListView::Collecting,
            };
        }
        ListView::Page {
            page,
            is_previous: state.is_previous_data,
            is_error: state.is_error,
            is_fetching: state.is_fetching,
        }
    }
}

fn normalize(keyword: Option<String>) -> Option<String> {
    keyword
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

fn request(page: u32, page_size: u32, filters: &Filters) -> ArticleQuery {
    ArticleQuery {
        page,
        page_size,
        feed_id: filters.feed_id,
        category: filters.category.clone(),
        keyword: filters.keyword.clone(),
    }
}
