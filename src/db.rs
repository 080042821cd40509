use anyhow::{Context, Result};
use directories::ProjectDirs;
use sqlx::{any::AnyConnectOptions, AnyPool, ConnectOptions, migrate::Migrator};
use sqlx::any::AnyPoolOptions;
use std::{path::PathBuf, str::FromStr};
use std::sync::Once;

use crate::storage::Storage;

// Ensure drivers are installed exactly once for sqlx::any
static INSTALL_DRIVERS: Once = Once::new();

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Counts reported by `boxd cache stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct CacheStats {
    pub entries: u64,
    pub expired: u64,
    pub pages: u64,
    pub films: u64,
}

/// Sqlite-backed (by default) persistent cache for fetched pages and film lookups.
#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
}

impl Database {
    // If database_url is None, use a SQLite file in the user's data directory.
    pub async fn connect(database_url: Option<&str>) -> Result<Self> {
        INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);

        let url = match database_url {
            Some(u) if !u.trim().is_empty() => u.to_string(),
            _ => default_sqlite_url()?,
        };

        let opts = AnyConnectOptions::from_str(&url)
            .with_context(|| format!("invalid database URL: {url}"))?;
        // Quiet by default; callers can enable SQLX_LOG if they want
        let opts = opts.disable_statement_logging();

        let pool = AnyPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await
            .with_context(|| format!("failed to connect to database: {url}"))?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        match MIGRATOR.run(&self.pool).await {
            Ok(_) => Ok(()),
            Err(e) => {
                let msg = e.to_string();
                let looks_modified = msg.contains("was previously applied but has been modified");
                if looks_modified {
                    // The cache holds nothing that cannot be refetched; reset the ledger and go again.
                    tracing::warn!(error = %msg, "cache migration ledger out of date, resetting");
                    let _ = sqlx::query("DELETE FROM _sqlx_migrations").execute(&self.pool).await;
                    MIGRATOR.run(&self.pool).await.context("running migrations after ledger reset")
                } else {
                    Err(e).context("running migrations")
                }
            }
        }
    }

    pub fn pool(&self) -> &AnyPool { &self.pool }

    pub async fn clear_cache_prefix(&self, prefix: Option<&str>) -> Result<u64> {
        let result = if let Some(p) = prefix {
            let like = format!("{}%", p);
            sqlx::query("DELETE FROM cache WHERE key LIKE ?")
                .bind(like)
                .execute(&self.pool)
                .await?
        } else {
            sqlx::query("DELETE FROM cache")
                .execute(&self.pool)
                .await?
        };
        Ok(result.rows_affected())
    }

    pub async fn purge_expired(&self, now: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM cache WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn cache_stats(&self, now: i64) -> Result<CacheStats> {
        let entries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cache").fetch_one(&self.pool).await?;
        let expired: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cache WHERE expires_at <= ?")
            .bind(now)
            .fetch_one(&self.pool)
            .await?;
        let pages: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cache WHERE key LIKE 'page|%'").fetch_one(&self.pool).await?;
        let films: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cache WHERE key LIKE 'film|%'").fetch_one(&self.pool).await?;
        Ok(CacheStats { entries: entries as u64, expired: expired as u64, pages: pages as u64, films: films as u64 })
    }

    pub async fn vacuum(&self) -> Result<()> {
        sqlx::query("VACUUM").execute(&self.pool).await.context("vacuuming cache database")?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Storage for Database {
    async fn get_cache(&self, key: &str, now: i64) -> Result<Option<String>> {
        let row = sqlx::query_scalar::<_, String>(
            "SELECT payload FROM cache WHERE key = ? AND expires_at > ?",
        )
        .bind(key)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn put_cache(&self, key: &str, payload: &str, expires_at: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO cache(key, payload, expires_at) VALUES (?, ?, ?)\n             ON CONFLICT(key) DO UPDATE SET payload=excluded.payload, expires_at=excluded.expires_at",
        )
        .bind(key)
        .bind(payload)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn default_sqlite_url() -> Result<String> {
    let proj = ProjectDirs::from("dev", "boxd", "boxd")
        .context("unable to determine data directory for default sqlite path")?;
    let mut path: PathBuf = proj.data_dir().to_path_buf();
    std::fs::create_dir_all(&path).with_context(|| format!("creating data dir: {}", path.display()))?;
    path.push("cache.db");
    sqlite_url_for(&path)
}

pub(crate) fn sqlite_url_for(path: &std::path::Path) -> Result<String> {
    // Ensure the file exists so SQLite can open it in rw mode
    let _ = std::fs::OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path);

    // Encode spaces in the path for a valid sqlite URL
    let mut path_str = path.to_string_lossy().to_string();
    if path_str.contains(' ') { path_str = path_str.replace(' ', "%20"); }
    Ok(format!("sqlite://{path_str}?mode=rwc"))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_db(dir: &tempfile::TempDir) -> Database {
        let url = sqlite_url_for(&dir.path().join("cache.db")).unwrap();
        let db = Database::connect(Some(&url)).await.unwrap();
        db.run_migrations().await.unwrap();
        db
    }

    #[tokio::test]
    async fn put_then_get_respects_expiry_and_overwrite() {
        let tmp = tempfile::tempdir().unwrap();
        let db = temp_db(&tmp).await;
        db.put_cache("film|cure", "{\"title\":\"Cure\"}", 200).await.unwrap();
        assert_eq!(db.get_cache("film|cure", 100).await.unwrap().as_deref(), Some("{\"title\":\"Cure\"}"));
        assert!(db.get_cache("film|cure", 200).await.unwrap().is_none());

        db.put_cache("film|cure", "{}", 300).await.unwrap();
        assert_eq!(db.get_cache("film|cure", 250).await.unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn stats_and_prefix_clear() {
        let tmp = tempfile::tempdir().unwrap();
        let db = temp_db(&tmp).await;
        db.put_cache("page|/dave/films/page/1/", "{}", 50).await.unwrap();
        db.put_cache("page|/dave/films/page/2/", "{}", 500).await.unwrap();
        db.put_cache("film|cure", "{}", 500).await.unwrap();

        let stats = db.cache_stats(100).await.unwrap();
        assert_eq!(stats, CacheStats { entries: 3, expired: 1, pages: 2, films: 1 });

        assert_eq!(db.clear_cache_prefix(Some("page|")).await.unwrap(), 2);
        assert_eq!(db.cache_stats(100).await.unwrap().entries, 1);
        assert_eq!(db.purge_expired(1_000).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn vacuum_reports_failures() {
        let tmp = tempfile::tempdir().unwrap();
        let db = temp_db(&tmp).await;
        db.vacuum().await.unwrap();
        db.pool().close().await;
        assert!(db.vacuum().await.is_err());
    }
}
