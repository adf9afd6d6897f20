use std::path::Path;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rss_reader::app::{App, Command, config_path};

#[derive(Parser)]
#[command(name = "rss-reader")]
#[command(about = "A CLI reader for an RSS aggregation service with AI summaries")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List articles, newest first
    Articles {
        /// Page number (1-based)
        #[arg(short, long, default_value = "1")]
        page: u32,
        /// Number of articles per page (defaults to the configured one)
        #[arg(short = 's', long)]
        page_size: Option<u32>,
        /// Only articles of this feed
        #[arg(short, long)]
        feed: Option<i64>,
        /// Only articles of this category
        #[arg(short, long)]
        category: Option<String>,
        /// Search article titles
        #[arg(short, long)]
        keyword: Option<String>,
    },
    /// Articles of the last 24 hours
    Latest {
        #[arg(short, long, default_value = "10")]
        limit: u32,
    },
    /// Show an article with its summary
    Article {
        #[arg(required = true)]
        id: i64,
    },
    /// List the subscribed feeds
    Feeds,
    /// List the feed categories
    Categories,
    /// Show service statistics
    Stats,
    /// Check that the service is up
    Health,
    /// Suggest a feed to subscribe to
    Recommend {
        #[arg(required = true)]
        url: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        reason: Option<String>,
        #[arg(short, long)]
        contact: Option<String>,
    },
    /// Show or set the display theme
    Theme {
        /// "dark" or "light"
        mode: Option<String>,
    },
    /// Browse articles interactively
    Browse,
}

impl TryFrom<Commands> for Command {
    type Error = anyhow::Error;

    fn try_from(value: Commands) -> Result<Self, Self::Error> {
        Ok(match value {
            Commands::Articles {
                page,
                page_size,
                feed,
                category,
                keyword,
            } => Command::Articles {
                page,
                page_size,
                feed_id: feed,
                category,
                keyword,
            },
            Commands::Latest { limit } => Command::Latest { limit },
            Commands::Article { id } => Command::Article { id },
            Commands::Feeds => Command::Feeds,
            Commands::Categories => Command::Categories,
            Commands::Stats => Command::Stats,
            Commands::Health => Command::Health,
            Commands::Recommend {
                url,
                name,
                reason,
                contact,
            } => Command::Recommend {
                url,
                name,
                reason,
                contact,
            },
            Commands::Theme { mode } => {
                let dark = match mode.as_deref() {
                    None => None,
                    Some("dark") => Some(true),
                    Some("light") => Some(false),
                    Some(other) => anyhow::bail!("Unknown theme {other:?}, use dark or light"),
                };
                Command::Theme { dark }
            }
            Commands::Browse => Command::Browse,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = Command::try_from(cli.command)?;

    let home = std::env::var("HOME").context("Reading HOME")?;
    let app = App::build(config_path(Path::new(&home))).await?;

    let res = app.resolve(command).await;
    app.shutdown().await?;
    res
}
