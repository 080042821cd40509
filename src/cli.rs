use clap::{Parser, Subcommand};
use std::path::PathBuf;

use boxd::diary::DiaryFilter;

/// Scrape films, lists, diaries and profiles from Letterboxd
#[derive(Parser)]
#[command(name = "boxd", version)]
#[command(about = "Collect Letterboxd films, lists, diaries and profiles as JSON lines", long_about = None)]
pub struct Cli {
    /// Config file (defaults to $BOXD_CONFIG, then the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Skip the on-disk cache entirely
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Pages fetched at the same time
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Look up one film by slug
    Film { slug: String },
    /// Every film a person worked on
    Filmography {
        /// actor, director, producer or writer
        profession: String,
        person: String,
    },
    /// Films a user has watched
    Watched { user: String },
    /// Films on a user's watchlist
    Watchlist { user: String },
    /// Films on a list, given as owner/slug
    List { list: String },
    /// Diary entries, most recent first
    Diary {
        user: String,
        #[command(flatten)]
        filter: DiaryFilter,
    },
    /// Profile with following and followers
    Profile { user: String },
    /// Films from the site-wide browser
    Popular {
        #[arg(long, default_value = "popular")]
        sort: String,
        #[arg(long, default_value_t = 1)]
        pages: u32,
        /// Sample pages at random instead of reading them in order
        #[arg(long)]
        shuffle: bool,
    },
    /// Several collections on one stream
    Batch {
        #[arg(long)]
        watched: Vec<String>,
        /// owner/slug
        #[arg(long)]
        list: Vec<String>,
        #[arg(long)]
        watchlist: Vec<String>,
        /// JSON file with `watched`, `lists` and `watchlist` keys
        #[arg(long)]
        spec: Option<PathBuf>,
        /// Stop at the first failing collection
        #[arg(long)]
        abort_on_error: bool,
    },
    /// Films behind a site URL
    Url { url: String },
    /// Inspect or clean the cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Delete entries, optionally only keys starting with a prefix (e.g. "film|")
    Clear {
        #[arg(long)]
        prefix: Option<String>,
    },
    /// Entry counts
    Stats,
    /// Drop expired entries and compact the database
    Vacuum,
}
