//! Knowledge store overview.
//!
//! Lists every game collection with its passage count and when it was
//! first created, plus the database location and size. Used by
//! `lore collections` to see what has been cached so far.

use anyhow::Result;
use sqlx::Row;

use crate::config::Config;
use crate::{db, migrate};

struct CollectionStats {
    key: String,
    passages: i64,
    created_at: i64,
}

/// Run the collections command: query the database and print a summary.
pub async fn run_collections(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::migrate(&pool).await?;

    let rows = sqlx::query(
        r#"
        SELECT c.key, c.created_at, COUNT(p.id) AS passages
        FROM collections c
        LEFT JOIN passages p ON p.collection = c.key
        GROUP BY c.key
        ORDER BY c.key
        "#,
    )
    .fetch_all(&pool)
    .await?;

    let stats: Vec<CollectionStats> = rows
        .iter()
        .map(|row| CollectionStats {
            key: row.get("key"),
            passages: row.get("passages"),
            created_at: row.get("created_at"),
        })
        .collect();

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);
    let total: i64 = stats.iter().map(|s| s.passages).sum();

    println!("Game Lore: Collections");
    println!("======================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!("  Games:       {}", stats.len());
    println!("  Passages:    {}", total);

    if !stats.is_empty() {
        println!();
        println!("  {:<32} {:>8}   {}", "GAME", "PASSAGES", "CREATED");
        println!("  {}", "-".repeat(60));
        for s in &stats {
            println!(
                "  {:<32} {:>8}   {}",
                s.key,
                s.passages,
                format_ts_relative(s.created_at)
            );
        }
    }

    println!();

    pool.close().await;
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Relative age for recent timestamps, a date for anything older than a month.
fn format_ts_relative(ts: i64) -> String {
    let delta = chrono::Utc::now().timestamp() - ts;
    match delta {
        d if d < 0 => format_ts_iso(ts),
        d if d < 60 => "just now".to_string(),
        d if d < 3600 => plural(d / 60, "min"),
        d if d < 86400 => plural(d / 3600, "hour"),
        d if d < 86400 * 30 => plural(d / 86400, "day"),
        _ => format_ts_iso(ts),
    }
}

fn plural(n: i64, unit: &str) -> String {
    format!("{} {}{} ago", n, unit, if n == 1 { "" } else { "s" })
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}
