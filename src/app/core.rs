use std::{any::Any, collections::HashMap, path::Path, sync::Arc};

use anyhow::{Context, Result, anyhow};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    ArcPath, ArcStr,
    api::{Article, ArticleDetail, ArticleQuery, Feed, Health, Recommendation, ReaderApi, Stats},
    fs::Fs,
    log::Log,
    net::Net,
    query::{GcPolicy, Query, QueryClient, QueryOptions, QueryStatus, with_retry},
};

use super::{
    config::{Config, PathOpt, StrOpt, USizeOpt},
    data::Command,
    list::ArticleList,
    prefs::Prefs,
    queries::{self, Resource},
    search::SearchBox,
    summary::{self, ArticleCard},
    view,
};

const SCOPE: &str = "app";

/// Environment variable overriding the configured service URL.
pub const API_URL_VAR: &str = "RSS_READER_API_URL";

const BROWSE_HELP: &str =
    "Type to search, :n next page, :p previous page, :o <id> open/close an article, :r refresh, :q quit";

/// Core of the App: every actor the reader needs, wired together.
#[derive(Debug)]
pub struct Core {
    config: Config,
    log: Log,
    api: ReaderApi,
    client: QueryClient,
    prefs: Prefs,
}

impl Core {
    /// Builds every actor from the configuration file at `config_path`.
    pub async fn build(config_path: ArcPath) -> Result<Self> {
        let fs = Fs::spawn();

        let config = Config::spawn(fs.clone(), config_path);
        let loaded = config.load().await;
        if let Ok(url) = std::env::var(API_URL_VAR) {
            config.set_str(StrOpt::ApiBaseUrl, ArcStr::from(url)).await;
        }

        let log = Log::spawn(
            fs.clone(),
            config.log_level().await,
            config.usize(USizeOpt::MaxAge).await,
            config.path(PathOpt::LogDir).await,
        )
        .await?;
        // Unreadable config: keep going on the defaults
        let _ = log.warn_on_error(SCOPE, loaded);
        log.collect_garbage().await;

        let net = Net::spawn(config.clone(), log.clone()).await?;
        let core = Self::assemble(config, log, net, fs).await;
        core.log.info(SCOPE, "App initialized");
        Ok(core)
    }

    /// Wires the query layer and the API on top of already running actors.
    pub async fn assemble(config: Config, log: Log, net: Net, fs: Fs) -> Self {
        let api = ReaderApi::new(net, config.str(StrOpt::ApiBaseUrl).await);
        let client = QueryClient::spawn(
            log.clone(),
            GcPolicy {
                gc_time: config.millis(USizeOpt::GcTimeMs).await,
                interval: config.millis(USizeOpt::GcIntervalMs).await,
            },
        );
        let prefs = Prefs::new(fs, log.clone(), config.path(PathOpt::PrefsPath).await);
        Self {
            config,
            log,
            api,
            client,
            prefs,
        }
    }

    pub fn log(&self) -> &Log {
        &self.log
    }

    async fn options(&self, stale: USizeOpt) -> QueryOptions {
        QueryOptions::default()
            .stale_time(self.config.millis(stale).await)
            .retry(self.config.usize(USizeOpt::Retry).await)
    }

    async fn page_size(&self) -> u32 {
        let size = self.config.usize(USizeOpt::PageSize).await;
        u32::try_from(size).unwrap_or(u32::MAX).clamp(1, 100)
    }

    /// Loads a resource through the cache and hands back its data.
    async fn fetch<T: Any + Send + Sync>(&self, (key, fetch): Resource) -> Result<Arc<T>> {
        let retry = self.config.usize(USizeOpt::Retry).await;
        let fetch = with_retry(fetch, retry, key.clone(), self.log.clone());
        let snapshot = self.client.run(&key, fetch).await;
        match (snapshot.status, snapshot.data::<T>(), snapshot.error) {
            (QueryStatus::Success, Some(data), _) => Ok(data),
            (_, _, Some(err)) => Err(err).with_context(|| format!("Loading {key}")),
            _ => Err(anyhow!("Loading {key} gave no data")),
        }
    }

    /// Executes a one-shot command and returns what it prints.
    pub async fn execute(&self, command: Command) -> Result<String> {
        match command {
            Command::Articles {
                page,
                page_size,
                feed_id,
                category,
                keyword,
            } => {
                let page_size = match page_size {
                    Some(size) => size.clamp(1, 100),
                    None => self.page_size().await,
                };
                let request = ArticleQuery {
                    page,
                    page_size,
                    feed_id,
                    category,
                    keyword,
                };
                let options = self.options(USizeOpt::StaleTimeMs).await;
                let mut list = ArticleList::bind(
                    self.client.clone(),
                    self.log.clone(),
                    self.api.clone(),
                    request,
                    options,
                )
                .await;
                Ok(view::list(&list.settled().await))
            }
            Command::Latest { limit } => {
                let articles: Arc<Vec<Article>> = self
                    .fetch(queries::latest(&self.api, limit.clamp(1, 50)))
                    .await?;
                if articles.is_empty() {
                    return Ok("No articles in the last 24 hours".to_string());
                }
                let lines: Vec<String> = articles.iter().map(view::article_line).collect();
                Ok(lines.join("\n"))
            }
            Command::Article { id } => self.article(id).await,
            Command::Feeds => {
                let feeds: Arc<Vec<Feed>> = self.fetch(queries::feeds(&self.api)).await?;
                Ok(view::feeds(&feeds))
            }
            Command::Categories => {
                let categories: Arc<Vec<String>> =
                    self.fetch(queries::categories(&self.api)).await?;
                Ok(categories.join("\n"))
            }
            Command::Stats => {
                let stats: Arc<Stats> = self.fetch(queries::stats(&self.api)).await?;
                Ok(view::stats(&stats))
            }
            Command::Health => {
                let health: Arc<Health> = self.fetch(queries::health(&self.api)).await?;
                Ok(view::health(&health))
            }
            Command::Recommend {
                url,
                name,
                reason,
                contact,
            } => {
                let recommendation = Recommendation::new(&url)?
                    .feed_name(name)
                    .reason(reason)
                    .contact(contact);
                let receipt = self
                    .api
                    .submit_recommendation(&recommendation)
                    .await
                    .context("Submitting recommendation")?;
                self.log
                    .info(SCOPE, format!("recommended {url}: {}", receipt.message));
                Ok(receipt.message)
            }
            Command::Theme { dark } => {
                if let Some(dark) = dark {
                    self.prefs.set_dark_mode(dark).await?;
                }
                let dark = self.prefs.dark_mode().await;
                Ok(format!("Theme: {}", if dark { "dark" } else { "light" }))
            }
            Command::Browse => {
                self.browse().await?;
                Ok(String::new())
            }
        }
    }

    async fn article(&self, id: i64) -> Result<String> {
        let (key, fetch) = queries::article_detail(&self.api, id);
        let options = self.options(USizeOpt::DetailStaleTimeMs).await;
        let mut query: Query<ArticleDetail> =
            Query::bind(self.client.clone(), self.log.clone(), key, fetch, options).await;
        let state = query.settled().await;
        let summary_view = summary::project(id, &state);
        match (&state.data, state.error) {
            (Some(detail), _) => Ok(view::detail(detail, &summary_view)),
            (None, Some(err)) => Err(err).with_context(|| format!("Loading article {id}")),
            (None, None) => Err(anyhow!("Article {id} gave no data")),
        }
    }

    /// Interactive loop over stdin: the list, its search box and the cards
    /// opened on the current page.
    pub async fn browse(&self) -> Result<()> {
        let request = ArticleQuery {
            page: 1,
            page_size: self.page_size().await,
            feed_id: None,
            category: None,
            keyword: None,
        };
        let options = self.options(USizeOpt::StaleTimeMs).await;
        let detail_stale = self.config.millis(USizeOpt::DetailStaleTimeMs).await;
        let mut list = ArticleList::bind(
            self.client.clone(),
            self.log.clone(),
            self.api.clone(),
            request,
            options,
        )
        .await;
        let mut search = SearchBox::spawn(self.config.millis(USizeOpt::DebounceMs).await);
        let mut cards: HashMap<i64, ArticleCard> = HashMap::new();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        println!("{BROWSE_HELP}");
        loop {
            render(&list, &cards);
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context("Reading from stdin")? else {
                        break;
                    };
                    match Input::parse(&line) {
                        Input::Quit => break,
                        Input::Next => {
                            if !turn_page(&mut list, &mut cards, true).await {
                                println!("No next page");
                            }
                        }
                        Input::Prev => {
                            if !turn_page(&mut list, &mut cards, false).await {
                                println!("Already on the first page");
                            }
                        }
                        Input::Open(id) => {
                            let article = list
                                .state()
                                .data
                                .and_then(|page| page.items.iter().find(|a| a.id == id).cloned());
                            if let Some(card) = cards.get_mut(&id) {
                                card.toggle().await;
                            } else if let Some(article) = article {
                                let mut card = ArticleCard::new(
                                    self.client.clone(),
                                    self.log.clone(),
                                    self.api.clone(),
                                    article,
                                    detail_stale,
                                );
                                card.expand().await;
                                cards.insert(id, card);
                            } else {
                                println!("Article {id} is not on this page");
                            }
                            if let Some(card) = cards.get_mut(&id) {
                                card.settled().await;
                            }
                        }
                        Input::Refresh => {
                            list.refetch().await;
                            for card in cards.values_mut() {
                                card.refresh().await;
                            }
                        }
                        Input::Search(text) => search.input(&text).await,
                        Input::Invalid(reason) => println!("{reason}\n{BROWSE_HELP}"),
                    }
                }
                keyword = search.settled() => match keyword {
                    Some(keyword) => {
                        list.set_keyword(keyword).await;
                        // Cards of the old page are gone from view
                        cards.clear();
                    }
                    None => break,
                },
                alive = list.changed() => {
                    if !alive {
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Moves the list one page and closes the cards of the page left behind.
/// Returns whether the page changed.
async fn turn_page(
    list: &mut ArticleList,
    cards: &mut HashMap<i64, ArticleCard>,
    forward: bool,
) -> bool {
    let moved = if forward {
        list.next().await
    } else {
        list.prev().await
    };
    if moved {
        cards.clear();
    }
    moved
}

fn render(list: &ArticleList, cards: &HashMap<i64, ArticleCard>) {
    println!("{}", view::list(&list.view()));
    let mut open: Vec<&ArticleCard> = cards.values().filter(|c| c.is_expanded()).collect();
    open.sort_by_key(|card| card.id());
    for card in open {
        if let Some(summary_view) = card.summary() {
            println!("--- {} ---\n{}", card.article().title, view::summary(&summary_view));
        }
    }
}

/// One line typed in the browse loop.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Next,
    Prev,
    Open(i64),
    Refresh,
    Quit,
    /// Anything that is not a command is search text, blank included
    Search(String),
    Invalid(String),
}

impl Input {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(command) = line.strip_prefix(':') else {
            return Self::Search(line.to_string());
        };
        let mut parts = command.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("n"), None) => Self::Next,
            (Some("p"), None) => Self::Prev,
            (Some("r"), None) => Self::Refresh,
            (Some("q"), None) => Self::Quit,
            (Some("o"), Some(id)) => match id.parse() {
                Ok(id) => Self::Open(id),
                Err(_) => Self::Invalid(format!("Not an article id: {id}")),
            },
            _ => Self::Invalid(format!("Unknown command: {line}")),
        }
    }
}

/// Location of the configuration file under `home`.
pub fn config_path(home: &Path) -> ArcPath {
    crate::arc_path(home.join(".config").join("rss-reader").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        app::{config::Data, list::ListView},
        net::{Canned, FetchError, NetMock},
    };

    const BASE: &str = "http://reader.test/api";

    async fn core(mock: &NetMock) -> Core {
        let mut data = Data::default();
        data.set_str(StrOpt::ApiBaseUrl, BASE.into());
        let config = Config::mock(data);
        Core::assemble(config, Log::mock(), Net::from(mock.clone()), Fs::mock()).await
    }

    #[test]
    fn test_parse_input() {
        assert_eq!(Input::parse(":n"), Input::Next);
        assert_eq!(Input::parse(" :p "), Input::Prev);
        assert_eq!(Input::parse(":o 42"), Input::Open(42));
        assert_eq!(Input::parse(":r"), Input::Refresh);
        assert_eq!(Input::parse(":q"), Input::Quit);
        assert_eq!(Input::parse("rust async"), Input::Search("rust async".into()));
        assert_eq!(Input::parse(""), Input::Search(String::new()));
        assert!(matches!(Input::parse(":o x"), Input::Invalid(_)));
        assert!(matches!(Input::parse(":x"), Input::Invalid(_)));
    }

    #[tokio::test]
    async fn test_turning_page_closes_cards() {
        let mock = NetMock::new();
        let page = |n: u32, id: i64, has_next: bool| {
            serde_json::json!({
                "items": [{
                    "id": id, "title": format!("Article {id}"),
                    "url": format!("https://blog.test/{id}"), "feed_title": "Blog"
                }],
                "total": 2, "page": n, "page_size": 20, "has_next": has_next,
            })
            .to_string()
        };
        let url = format!("{BASE}/articles/");
        mock.on_get(
            &url,
            &[("page", "1"), ("page_size", "20")],
            Canned::json(200, page(1, 1, true)),
        );
        mock.on_get(
            &url,
            &[("page", "2"), ("page_size", "20")],
            Canned::json(200, page(2, 2, false)),
        );
        let core = core(&mock).await;

        let request = ArticleQuery {
            page: 1,
            page_size: 20,
            feed_id: None,
            category: None,
            keyword: None,
        };
        let mut list = ArticleList::bind(
            core.client.clone(),
            core.log.clone(),
            core.api.clone(),
            request,
            QueryOptions::default(),
        )
        .await;
        let first = list.settled().await;
        let ListView::Page { page, .. } = first else {
            panic!("expected the first page, got {first:?}");
        };
        let article = page.items[0].clone();

        let mut cards = HashMap::new();
        let card = ArticleCard::new(
            core.client.clone(),
            core.log.clone(),
            core.api.clone(),
            article,
            Duration::from_secs(60),
        );
        cards.insert(card.id(), card);

        // Nothing before the first page: the cards stay
        assert!(!turn_page(&mut list, &mut cards, false).await);
        assert_eq!(cards.len(), 1);

        assert!(turn_page(&mut list, &mut cards, true).await);
        assert!(cards.is_empty());
        assert_eq!(list.page(), 2);
    }

    #[test]
    fn test_config_path() {
        assert_eq!(
            &*config_path(Path::new("/home/reader")),
            Path::new("/home/reader/.config/rss-reader/config.toml")
        );
    }

    #[tokio::test]
    async fn test_articles_with_keyword_and_no_match() {
        let mock = NetMock::new();
        mock.on_get(
            &format!("{BASE}/articles/"),
            &[("page", "1"), ("page_size", "20"), ("keyword", "rust")],
            Canned::json(
                200,
                r#"{"items": [], "total": 0, "page": 1, "page_size": 20, "has_next": false}"#,
            ),
        );
        let core = core(&mock).await;

        let out = core
            .execute(Command::Articles {
                page: 1,
                page_size: None,
                feed_id: None,
                category: None,
                keyword: Some("rust".into()),
            })
            .await
            .unwrap();
        let expected = ListView::NoMatches {
            keyword: "rust".into(),
        };
        assert_eq!(out, view::list(&expected));
    }

    #[tokio::test]
    async fn test_article_command() {
        let mock = NetMock::new();
        mock.on_get(
            &format!("{BASE}/articles/42"),
            &[],
            Canned::json(
                200,
                r#"{"id": 42, "title": "Rust 2024", "url": "https://blog.test/rust",
                    "content": "", "content_hash": "", "feed_title": "Blog",
                    "summary_status": "failed"}"#,
            ),
        );
        let core = core(&mock).await;

        let out = core.execute(Command::Article { id: 42 }).await.unwrap();
        assert!(out.starts_with("Rust 2024\nhttps://blog.test/rust\n"));
        assert!(out.ends_with(&view::summary(&summary::SummaryView::Failed)));
    }

    #[tokio::test]
    async fn test_fetch_errors_surface() {
        let mock = NetMock::new();
        mock.on_get(
            &format!("{BASE}/stats"),
            &[],
            Canned::error(FetchError::network("connection refused")),
        );
        let core = core(&mock).await;

        let err = core.execute(Command::Stats).await.unwrap_err();
        assert_eq!(
            err.downcast_ref::<FetchError>(),
            Some(&FetchError::network("connection refused"))
        );
    }

    #[tokio::test]
    async fn test_one_shot_commands_always_ask() {
        let mock = NetMock::new();
        mock.on_get(
            &format!("{BASE}/feeds/categories"),
            &[],
            Canned::json(200, r#"["tech", "science"]"#),
        );
        let core = core(&mock).await;

        assert_eq!(core.execute(Command::Categories).await.unwrap(), "tech\nscience");
        assert_eq!(core.execute(Command::Categories).await.unwrap(), "tech\nscience");
        // Only concurrent requests are shared; each command asks again
        assert_eq!(mock.get_calls(&format!("{BASE}/feeds/categories"), &[]), 2);
    }

    #[tokio::test]
    async fn test_blank_recommendation_is_not_sent() {
        let mock = NetMock::new();
        let core = core(&mock).await;

        let res = core
            .execute(Command::Recommend {
                url: "   ".into(),
                name: None,
                reason: None,
                contact: None,
            })
            .await;
        assert!(res.is_err());
        assert!(mock.posted().is_empty());
    }

    #[tokio::test]
    async fn test_recommendation() {
        let mock = NetMock::new();
        mock.on_post(
            &format!("{BASE}/recommendations/"),
            Canned::json(200, r#"{"success": true, "message": "Thanks!"}"#),
        );
        let core = core(&mock).await;

        let out = core
            .execute(Command::Recommend {
                url: "https://blog.test/feed.xml".into(),
                name: Some("Blog".into()),
                reason: None,
                contact: None,
            })
            .await
            .unwrap();
        assert_eq!(out, "Thanks!");
        let posted = mock.posted();
        assert_eq!(posted[0].1["feed_url"], "https://blog.test/feed.xml");
        assert_eq!(posted[0].1["feed_name"], "Blog");
    }

    #[tokio::test]
    async fn test_theme() {
        let mock = NetMock::new();
        let core = core(&mock).await;

        assert_eq!(core.execute(Command::Theme { dark: None }).await.unwrap(), "Theme: light");
        assert_eq!(
            core.execute(Command::Theme { dark: Some(true) }).await.unwrap(),
            "Theme: dark"
        );
        assert_eq!(core.execute(Command::Theme { dark: None }).await.unwrap(), "Theme: dark");
    }
}
