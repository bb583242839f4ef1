//! Dated snapshot tables for the Analytics Engine's cached outputs (§4.8,
//! §6): `technology_reads_snapshots` and `technology_predictions_snapshots`
//! carry a monotonically increasing `generated_at`; the most recent row is
//! served when the engine is idle. Also covers the optional knowledge-graph
//! tables (`insight_atoms`, `atom_links`) and the per-video `podcasts` /
//! `channels` bookkeeping tables from the durable-state layout.

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use sqlx::{AnyPool, Row};

use techpulse_core::{AtomLink, Breakdown, InsightAtom};

use crate::error::Result;

/// Which dated-snapshot table a `SnapshotStore` writes to.
#[derive(Debug, Clone, Copy)]
pub enum SnapshotKind {
    TechnologyReads,
    TechnologyPredictions,
}

impl SnapshotKind {
    fn table(self) -> &'static str {
        match self {
            SnapshotKind::TechnologyReads => "technology_reads_snapshots",
            SnapshotKind::TechnologyPredictions => "technology_predictions_snapshots",
        }
    }
}

pub struct SnapshotStore {
    pool: AnyPool,
    kind: SnapshotKind,
}

impl SnapshotStore {
    pub fn new(pool: AnyPool, kind: SnapshotKind) -> Self {
        Self { pool, kind }
    }

    pub async fn insert<T: Serialize + Send + Sync>(&self, generated_at: DateTime<Utc>, payload: &T) -> Result<()> {
        let json = serde_json::to_string(payload)?;
        let sql = format!(
            "INSERT INTO {} (generated_at, payload_json) VALUES (?, ?)",
            self.kind.table()
        );
        sqlx::query(&sql)
            .bind(generated_at.to_rfc3339())
            .bind(json)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// The most recently generated snapshot, or `None` if the table is empty.
    pub async fn latest<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        let sql = format!(
            "SELECT payload_json FROM {} ORDER BY generated_at DESC LIMIT 1",
            self.kind.table()
        );
        let row = sqlx::query(&sql).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => {
                let json: String = row.try_get("payload_json")?;
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => Ok(None),
        }
    }
}

/// Per-video Breakdown persistence, replace-by-`video_id` on re-processing
/// per the open-question decision in `DESIGN.md`/`SPEC_FULL.md` §C.
pub struct PodcastStore {
    pool: AnyPool,
}

impl PodcastStore {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    pub async fn upsert(&self, video_id: &str, breakdown: &Breakdown) -> Result<()> {
        let json = serde_json::to_string(breakdown)?;
        sqlx::query(
            "INSERT INTO podcasts (video_id, breakdown_json, generated_by, updated_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT(video_id) DO UPDATE SET breakdown_json = excluded.breakdown_json, generated_by = excluded.generated_by, updated_at = excluded.updated_at",
        )
        .bind(video_id)
        .bind(json)
        .bind(&breakdown.generated_by)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, video_id: &str) -> Result<Option<Breakdown>> {
        let row = sqlx::query("SELECT breakdown_json FROM podcasts WHERE video_id = ?")
            .bind(video_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let json: String = row.try_get("breakdown_json")?;
                Ok(Some(serde_json::from_str(&json)?))
            }
            None => Ok(None),
        }
    }
}

/// The optional knowledge-graph tier (§3, §4.10, §C): insight atoms and
/// their typed edges. Re-processing a video replaces its prior atoms and
/// links before inserting the new set.
pub struct KnowledgeGraphStore {
    pool: AnyPool,
}

impl KnowledgeGraphStore {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Delete all atoms/links for `video_id`, then insert `atoms` in
    /// batches of 5 (§4.10 step 4), inside one transaction so partial
    /// replacement is never observable.
    pub async fn replace_atoms_for_video(&self, video_id: &str, atoms: Vec<InsightAtom>) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        let existing_ids: Vec<(String,)> =
            sqlx::query_as("SELECT id FROM insight_atoms WHERE video_id = ?")
                .bind(video_id)
                .fetch_all(&mut *tx)
                .await?;
        for (id,) in &existing_ids {
            sqlx::query("DELETE FROM atom_links WHERE from_atom_id = ? OR to_atom_id = ?")
                .bind(id)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query("DELETE FROM insight_atoms WHERE video_id = ?")
            .bind(video_id)
            .execute(&mut *tx)
            .await?;

        for batch in atoms.chunks(5) {
            for atom in batch {
                let json = serde_json::to_string(atom)?;
                sqlx::query("INSERT INTO insight_atoms (id, video_id, atom_json) VALUES (?, ?, ?)")
                    .bind(&atom.id)
                    .bind(&atom.video_id)
                    .bind(json)
                    .execute(&mut *tx)
                    .await?;
            }
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn insert_link(&self, link: &AtomLink) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO atom_links (from_atom_id, to_atom_id, edge_type, confidence) VALUES (?, ?, ?, ?)",
        )
        .bind(&link.from_atom_id)
        .bind(&link.to_atom_id)
        .bind(format!("{:?}", link.edge_type).to_uppercase())
        .bind(link.confidence)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn atoms_for_video(&self, video_id: &str) -> Result<Vec<InsightAtom>> {
        let rows = sqlx::query("SELECT atom_json FROM insight_atoms WHERE video_id = ?")
            .bind(video_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| {
                let json: String = r.try_get("atom_json")?;
                serde_json::from_str(&json).map_err(|e| sqlx::Error::Decode(Box::new(e)))
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;
    use serde::Deserialize;
    use techpulse_core::{AtomEdgeType, Certainty, Stance};

    #[derive(Serialize, Deserialize, PartialEq, Debug)]
    struct Payload {
        momentum: f64,
    }

    async fn memory_pool() -> AnyPool {
        sqlx::any::install_default_drivers();
        let pool = AnyPool::connect("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn snapshot_store_serves_most_recent_row() {
        let pool = memory_pool().await;
        let store = SnapshotStore::new(pool, SnapshotKind::TechnologyReads);
        let t0 = Utc::now();
        store.insert(t0, &Payload { momentum: 10.0 }).await.unwrap();
        store
            .insert(t0 + chrono::Duration::seconds(5), &Payload { momentum: 42.0 })
            .await
            .unwrap();
        let latest: Payload = store.latest().await.unwrap().unwrap();
        assert_eq!(latest.momentum, 42.0);
    }

    #[tokio::test]
    async fn replace_atoms_for_video_drops_prior_links() {
        let pool = memory_pool().await;
        let kg = KnowledgeGraphStore::new(pool);
        let atom = |id: &str| InsightAtom {
            id: id.to_string(),
            video_id: "v1".to_string(),
            segment_index: 0,
            topic: "rust".to_string(),
            entity: "borrow checker".to_string(),
            claim: "it prevents data races".to_string(),
            stance: Stance::Optimistic,
            certainty: Certainty::High,
            quote: None,
            start_time: 0.0,
            end_time: 10.0,
            embedding: vec![0.1, 0.2],
        };
        kg.replace_atoms_for_video("v1", vec![atom("a1")]).await.unwrap();
        kg.insert_link(&AtomLink {
            from_atom_id: "a1".to_string(),
            to_atom_id: "a1".to_string(),
            edge_type: AtomEdgeType::Related,
            confidence: 0.9,
        })
        .await
        .unwrap();

        kg.replace_atoms_for_video("v1", vec![atom("a2")]).await.unwrap();
        let remaining = kg.atoms_for_video("v1").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "a2");
    }
}
