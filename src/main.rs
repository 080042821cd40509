mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use std::io::Write;

use boxd::batch::BatchSpec;
use boxd::config::{BatchErrorPolicy, ClientConfig};
use boxd::films::{FilmListOptions, FilmographyRequest};
use boxd::lists::{parse_list_args, ListId};
use boxd::storage::current_epoch;
use boxd::stream::ItemStream;
use boxd::Boxd;
use cli::{CacheAction, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("boxd=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if cli.no_cache {
        config.cache.enabled = false;
    }
    if let Some(n) = cli.concurrency {
        config.page_concurrency = n.max(1);
    }
    let boxd = Boxd::new(config).await.context("starting client")?;

    match cli.command {
        Commands::Film { slug } => print_line(&boxd.film(&slug).await?)?,
        Commands::Filmography { profession, person } => {
            print_all(&boxd.filmography(&FilmographyRequest::new(profession, person)).await?)?
        }
        Commands::Watched { user } => print_stream(boxd.stream_watched(&user)).await?,
        Commands::Watchlist { user } => print_stream(boxd.stream_watchlist(&user)).await?,
        Commands::List { list } => {
            let id = ListId::parse(&list)?;
            print_stream(boxd.stream_list(&id.owner, &id.slug)).await?
        }
        Commands::Diary { user, filter } => print_all(&filter.apply(boxd.diary(&user).await?))?,
        Commands::Profile { user } => print_line(&boxd.profile(&user).await?)?,
        Commands::Popular { sort, pages, shuffle } => {
            print_all(&boxd.popular_films(&FilmListOptions { sort_by: sort, page_count: pages, shuffle }).await?)?
        }
        Commands::Batch { watched, list, watchlist, spec, abort_on_error } => {
            let mut batch = match spec {
                Some(path) => {
                    let raw = std::fs::read_to_string(&path)
                        .with_context(|| format!("reading batch spec: {}", path.display()))?;
                    serde_json::from_str::<BatchSpec>(&raw)
                        .with_context(|| format!("parsing batch spec: {}", path.display()))?
                }
                None => BatchSpec::default(),
            };
            batch.watched.extend(watched);
            batch.lists.extend(parse_list_args(&list)?);
            batch.watchlist.extend(watchlist);
            if batch.is_empty() {
                bail!("nothing to fetch: pass --watched, --list, --watchlist or --spec");
            }
            let policy = if abort_on_error { BatchErrorPolicy::Abort } else { boxd.config().batch_errors };
            print_stream(boxd.stream_batch_with(&batch, policy)).await?
        }
        Commands::Url { url } => print_all(&boxd.items_for_url(&url).await?)?,
        Commands::Cache { action } => {
            let Some(db) = boxd.database() else {
                bail!("cache is disabled");
            };
            match action {
                CacheAction::Clear { prefix } => {
                    let removed = db.clear_cache_prefix(prefix.as_deref()).await?;
                    tracing::info!(removed, "cache cleared");
                }
                CacheAction::Stats => print_line(&db.cache_stats(current_epoch()).await?)?,
                CacheAction::Vacuum => {
                    let purged = db.purge_expired(current_epoch()).await?;
                    db.vacuum().await?;
                    tracing::info!(purged, "cache vacuumed");
                }
            }
        }
    }
    Ok(())
}

fn print_line<T: Serialize>(value: &T) -> Result<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

fn print_all<T: Serialize>(values: &[T]) -> Result<()> {
    values.iter().try_for_each(print_line)
}

/// Print items as they arrive, then surface the stream's terminal error.
async fn print_stream<T: Serialize>(mut stream: ItemStream<T>) -> Result<()> {
    let mut count = 0usize;
    while let Some(item) = stream.next().await {
        print_line(&item)?;
        count += 1;
    }
    let result = stream.finish().await;
    tracing::info!(count, "done");
    result?;
    Ok(())
}
