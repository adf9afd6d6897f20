//! Article cards and the lifecycle of their AI summary.

use std::time::Duration;

use crate::{
    api::{Article, ArticleDetail, ReaderApi, SummaryStatus},
    log::Log,
    net::FetchError,
    query::{Query, QueryClient, QueryOptions, QueryState},
};

use super::queries;

const SCOPE: &str = "app.summary";

/// What an expanded card shows in place of the summary.
#[derive(Debug, Clone, PartialEq)]
pub enum SummaryView {
    /// The detail has not arrived yet
    Loading,
    /// The detail could not be loaded at all
    Unavailable(FetchError),
    /// The service has not summarized the article yet
    Pending,
    Completed {
        summary: String,
        one_liner: Option<String>,
    },
    /// Summarization failed; the service retries on its own
    Failed,
}

/// Projects the detail query of article `id` onto a [`SummaryView`].
///
/// Only a snapshot of that very article counts, and a summary is only ever
/// shown for a `completed` status. A completed status without text is
/// treated as still pending.
pub fn project(id: i64, state: &QueryState<ArticleDetail>) -> SummaryView {
    let Some(detail) = state.data.as_deref().filter(|detail| detail.id == id) else {
        return match &state.error {
            Some(error) if state.is_error => SummaryView::Unavailable(error.clone()),
            _ => SummaryView::Loading,
        };
    };
    match detail.summary_status {
        SummaryStatus::Completed => match &detail.summary_cn {
            Some(summary) => SummaryView::Completed {
                summary: summary.clone(),
                one_liner: detail.one_liner.clone(),
            },
            None => SummaryView::Pending,
        },
        SummaryStatus::Pending => SummaryView::Pending,
        SummaryStatus::Failed => SummaryView::Failed,
    }
}

/// An article in the list, which can be expanded to read its summary.
///
/// Expanding binds the `articleDetail` query of the article and collapsing
/// releases it, so the cached detail is shared with any other card showing
/// the same article and survives a collapse until garbage collection.
pub struct ArticleCard {
    article: Article,
    client: QueryClient,
    log: Log,
    api: ReaderApi,
    stale_time: Duration,
    detail: Option<Query<ArticleDetail>>,
}

impl ArticleCard {
    pub fn new(
        client: QueryClient,
        log: Log,
        api: ReaderApi,
        article: Article,
        stale_time: Duration,
    ) -> Self {
        Self {
            article,
            client,
            log,
            api,
            stale_time,
            detail: None,
        }
    }

    pub fn id(&self) -> i64 {
        self.article.id
    }

    pub fn article(&self) -> &Article {
        &self.article
    }

    pub fn is_expanded(&self) -> bool {
        self.detail.is_some()
    }

    /// Binds the detail query. Fresh cached details are shown as they are,
    /// except a pending summary, which is always asked for again.
    pub async fn expand(&mut self) {
        if self.detail.is_some() {
            return;
        }
        let (key, fetch) = queries::article_detail(&self.api, self.article.id);
        let options = QueryOptions::default().stale_time(self.stale_time);
        let detail: Query<ArticleDetail> =
            Query::bind(self.client.clone(), self.log.clone(), key, fetch, options).await;

        // Binding already asked if the cached detail was missing or stale
        if !detail.started_fetch()
            && project(self.article.id, &detail.state()) == SummaryView::Pending
        {
            self.log.info(
                SCOPE,
                format!("summary of {} still pending, asking again", self.article.id),
            );
            detail.revalidate().await;
        }
        self.detail = Some(detail);
    }

    pub fn collapse(&mut self) {
        self.detail = None;
    }

    pub async fn toggle(&mut self) {
        if self.is_expanded() {
            self.collapse();
        } else {
            self.expand().await;
        }
    }

    /// Forces a new fetch of the detail. No-op while collapsed.
    pub async fn refresh(&mut self) {
        if let Some(detail) = &self.detail {
            detail.refetch().await;
        }
    }

    /// `None` while collapsed.
    pub fn summary(&self) -> Option<SummaryView> {
        self.detail
            .as_ref()
            .map(|detail| project(self.article.id, &detail.state()))
    }

    /// Waits for the detail fetch to settle. `None` while collapsed.
    pub async fn settled(&mut self) -> Option<SummaryView> {
        let id = self.article.id;
        let detail = self.detail.as_mut()?;
        let state = detail.settled().await;
        Some(project(id, &state))
    }
}
