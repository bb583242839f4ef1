//! Versioned schema migrations for the relational backend (§6), run once at
//! startup and tracked in a `schema_migrations` table so they apply exactly
//! once and in order — the same migration-runner shape the workspace's
//! config/session-store crates already used.

use sqlx::AnyPool;
use tracing::info;

use crate::error::{RelationalError, Result};

pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub up_sql: &'static str,
}

/// Schema for the durable-state layout's relational tables: `papers`
/// (every Canonical Record, any `type`), `podcasts` (per-video Breakdown),
/// `channels` (per-channel adapter cursor state), the two dated analytics
/// snapshot tables, and the optional knowledge-graph tier
/// (`insight_atoms`, `atom_links`) plus `meta_narratives`.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "create papers table",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS papers (
                id TEXT PRIMARY KEY,
                record_type TEXT NOT NULL,
                title TEXT NOT NULL,
                published TEXT NOT NULL,
                updated TEXT NOT NULL,
                title_fingerprint TEXT NOT NULL,
                record_json TEXT NOT NULL
            )
        "#,
    },
    Migration {
        version: 2,
        description: "create papers external id index table",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS paper_external_ids (
                namespace TEXT NOT NULL,
                value TEXT NOT NULL,
                paper_id TEXT NOT NULL,
                PRIMARY KEY (namespace, value)
            )
        "#,
    },
    Migration {
        version: 3,
        description: "create catalog_meta watermark table",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS catalog_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
        "#,
    },
    Migration {
        version: 4,
        description: "create podcasts table",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS podcasts (
                video_id TEXT PRIMARY KEY,
                breakdown_json TEXT NOT NULL,
                generated_by TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
        "#,
    },
    Migration {
        version: 5,
        description: "create channels table",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS channels (
                channel_id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                last_video_id TEXT,
                last_checked TEXT
            )
        "#,
    },
    Migration {
        version: 6,
        description: "create technology_reads_snapshots table",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS technology_reads_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                generated_at TEXT NOT NULL,
                payload_json TEXT NOT NULL
            )
        "#,
    },
    Migration {
        version: 7,
        description: "create technology_predictions_snapshots table",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS technology_predictions_snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                generated_at TEXT NOT NULL,
                payload_json TEXT NOT NULL
            )
        "#,
    },
    Migration {
        version: 8,
        description: "create insight_atoms table",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS insight_atoms (
                id TEXT PRIMARY KEY,
                video_id TEXT NOT NULL,
                atom_json TEXT NOT NULL
            )
        "#,
    },
    Migration {
        version: 9,
        description: "create atom_links table",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS atom_links (
                from_atom_id TEXT NOT NULL,
                to_atom_id TEXT NOT NULL,
                edge_type TEXT NOT NULL,
                confidence REAL NOT NULL,
                PRIMARY KEY (from_atom_id, to_atom_id, edge_type)
            )
        "#,
    },
    Migration {
        version: 10,
        description: "create meta_narratives table",
        up_sql: r#"
            CREATE TABLE IF NOT EXISTS meta_narratives (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                technology TEXT NOT NULL,
                generated_at TEXT NOT NULL,
                narrative_json TEXT NOT NULL
            )
        "#,
    },
];

pub async fn run_migrations(pool: &AnyPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    for migration in MIGRATIONS {
        let already_applied: Option<(i64,)> =
            sqlx::query_as("SELECT version FROM schema_migrations WHERE version = ?")
                .bind(migration.version)
                .fetch_optional(pool)
                .await?;
        if already_applied.is_some() {
            continue;
        }
        sqlx::query(migration.up_sql)
            .execute(pool)
            .await
            .map_err(|e| {
                RelationalError::Migration(format!(
                    "migration {} ({}) failed: {e}",
                    migration.version, migration.description
                ))
            })?;
        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)")
            .bind(migration.version)
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(pool)
            .await?;
        info!(version = migration.version, description = migration.description, "applied migration");
    }
    Ok(())
}
