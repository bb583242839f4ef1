//! Dated snapshot cache (§4.8, §6, §B.7): analytics outputs are cached as
//! dated snapshots on disk; the most recent snapshot is served when the
//! engine is idle (i.e. between `deepRefreshHours` ticks).
//!
//! Snapshot files live under `<base_dir>/<kind>/<YYYY-MM-DD>.json`. Before
//! any filesystem operation touches a candidate file, its stem is run
//! through [`is_valid_snapshot_date`], the same strict date-format guard
//! the workspace's session-cleanup code applied to its own date-named
//! directories — ruling out path traversal via a crafted "file name".

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

use crate::error::{AnalyticsError, Result};

/// Which analytics output a snapshot file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    TechnologyReads,
    TechnologyPredictions,
}

impl SnapshotKind {
    fn dir_name(self) -> &'static str {
        match self {
            SnapshotKind::TechnologyReads => "technology_reads_snapshots",
            SnapshotKind::TechnologyPredictions => "technology_predictions_snapshots",
        }
    }
}

/// Exactly `YYYY-MM-DD`, and parseable as a calendar date. Rejects
/// anything else — including `..`, absolute paths, or extra path
/// separators — before it is ever joined onto a base directory.
fn is_valid_snapshot_date(stem: &str) -> bool {
    stem.len() == 10
        && stem.as_bytes()[4] == b'-'
        && stem.as_bytes()[7] == b'-'
        && NaiveDate::parse_from_str(stem, "%Y-%m-%d").is_ok()
}

/// File-backed dated snapshot cache (`storeBackend = file`, §6).
pub struct FileSnapshotCache {
    base_dir: PathBuf,
}

impl FileSnapshotCache {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into() }
    }

    fn kind_dir(&self, kind: SnapshotKind) -> PathBuf {
        self.base_dir.join(kind.dir_name())
    }

    fn path_for(&self, kind: SnapshotKind, generated_at: DateTime<Utc>) -> PathBuf {
        self.kind_dir(kind).join(format!("{}.json", generated_at.format("%Y-%m-%d")))
    }

    /// Write (or overwrite) today's snapshot atomically.
    pub async fn write<T: Serialize + Send + Sync>(&self, kind: SnapshotKind, generated_at: DateTime<Utc>, payload: &T) -> Result<()> {
        let path = self.path_for(kind, generated_at);
        let bytes = serde_json::to_vec_pretty(payload)?;
        tokio::task::spawn_blocking(move || techpulse_store::write_atomic(&path, &bytes))
            .await
            .map_err(|e| AnalyticsError::Internal(e.to_string()))??;
        Ok(())
    }

    /// The most recently generated snapshot for `kind`, by filename date,
    /// validated with [`is_valid_snapshot_date`] before it is read.
    pub async fn latest<T: DeserializeOwned>(&self, kind: SnapshotKind) -> Result<Option<T>> {
        let dir = self.kind_dir(kind);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let mut best: Option<(NaiveDate, PathBuf)> = None;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if !is_valid_snapshot_date(stem) {
                warn!(stem, "ignoring snapshot file with an invalid date stem");
                continue;
            }
            let date = NaiveDate::parse_from_str(stem, "%Y-%m-%d").expect("validated above");
            if best.as_ref().map(|(d, _)| date > *d).unwrap_or(true) {
                best = Some((date, path));
            }
        }

        match best {
            Some((_, path)) => {
                let bytes = tokio::fs::read(&path).await?;
                Ok(Some(serde_json::from_slice(&bytes)?))
            }
            None => Ok(None),
        }
    }
}

/// Standalone so it can be unit-tested without touching the filesystem.
pub fn validate_snapshot_date(candidate: &str) -> std::result::Result<NaiveDate, AnalyticsError> {
    if !is_valid_snapshot_date(candidate) {
        return Err(AnalyticsError::InvalidSnapshotName(candidate.to_string()));
    }
    Ok(NaiveDate::parse_from_str(candidate, "%Y-%m-%d").expect("validated above"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Payload {
        momentum: f64,
    }

    #[test]
    fn rejects_path_traversal_style_names() {
        assert!(validate_snapshot_date("../../etc/passwd").is_err());
        assert!(validate_snapshot_date("2024-01-01/../x").is_err());
        assert!(validate_snapshot_date("not-a-date").is_err());
    }

    #[test]
    fn accepts_well_formed_dates() {
        assert!(validate_snapshot_date("2024-01-15").is_ok());
    }

    #[tokio::test]
    async fn serves_the_most_recent_snapshot() {
        let dir = TempDir::new().unwrap();
        let cache = FileSnapshotCache::new(dir.path());
        let d1 = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let d2 = DateTime::parse_from_rfc3339("2024-02-01T00:00:00Z").unwrap().with_timezone(&Utc);
        cache.write(SnapshotKind::TechnologyReads, d1, &Payload { momentum: 1.0 }).await.unwrap();
        cache.write(SnapshotKind::TechnologyReads, d2, &Payload { momentum: 2.0 }).await.unwrap();
        let latest: Payload = cache.latest(SnapshotKind::TechnologyReads).await.unwrap().unwrap();
        assert_eq!(latest, Payload { momentum: 2.0 });
    }

    #[tokio::test]
    async fn missing_directory_returns_none_not_error() {
        let dir = TempDir::new().unwrap();
        let cache = FileSnapshotCache::new(dir.path());
        let result: Option<Payload> = cache.latest(SnapshotKind::TechnologyPredictions).await.unwrap();
        assert!(result.is_none());
    }
}
