use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use crate::error::{BotError, Result};
use crate::models::{MatchRecord, Snapshot};

const SNAPSHOT_VERSION: u32 = 2;

/// Persistence for the last observed snapshot.
///
/// `save` fully replaces whatever was stored before.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Returns an empty snapshot when nothing has been stored yet
    async fn load(&self) -> Result<Snapshot>;

    async fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// On-disk layout of the snapshot file
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    captured_at: DateTime<Utc>,
    matches: Snapshot,
}

/// Snapshot stored as a single pretty-printed JSON document
pub struct JsonSnapshotStore {
    path: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    fn parse(&self, content: &str) -> Result<Snapshot> {
        let value: serde_json::Value =
            serde_json::from_str(content).map_err(|e| BotError::StateParse {
                path: self.display_path(),
                source: e,
            })?;

        // Version 1 files were a bare array of records
        if value.is_array() {
            info!("Migrating legacy snapshot file {}", self.display_path());
            let records: Vec<MatchRecord> =
                serde_json::from_value(value).map_err(|e| BotError::StateParse {
                    path: self.display_path(),
                    source: e,
                })?;
            return Ok(Snapshot::from_records(records));
        }

        let file: SnapshotFile =
            serde_json::from_value(value).map_err(|e| BotError::StateParse {
                path: self.display_path(),
                source: e,
            })?;
        Ok(Snapshot::from_records(file.matches.into_records()))
    }
}

#[async_trait]
impl SnapshotStore for JsonSnapshotStore {
    async fn load(&self) -> Result<Snapshot> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => self.parse(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Snapshot::new()),
            Err(e) => Err(BotError::StateLoad {
                path: self.display_path(),
                source: e,
            }),
        }
    }

    async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let file = SnapshotFile {
            version: SNAPSHOT_VERSION,
            captured_at: Utc::now(),
            matches: snapshot.clone(),
        };
        let content = serde_json::to_string_pretty(&file)?;

        // Write to temp file first, then rename for atomicity
        let temp_path = format!("{}.tmp", self.display_path());
        tokio::fs::write(&temp_path, &content)
            .await
            .map_err(|e| BotError::StateSave {
                path: self.display_path(),
                source: e,
            })?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| BotError::StateSave {
                path: self.display_path(),
                source: e,
            })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Availability;

    fn sample() -> Snapshot {
        Snapshot::from_records(vec![
            MatchRecord::new(["France", "All Blacks"], Availability::Unavailable, "Poule A"),
            MatchRecord::new(
                ["Vainqueur Poule C", "Deuxième Poule D"],
                Availability::Available,
                "Quart de finale 2",
            ),
        ])
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join("match_snapshot.json"));

        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_then_load_reproduces_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join("match_snapshot.json"));

        store.save(&sample()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), sample());
    }

    #[tokio::test]
    async fn test_save_replaces_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSnapshotStore::new(dir.path().join("match_snapshot.json"));

        store.save(&sample()).await.unwrap();
        let replacement = Snapshot::from_records(vec![MatchRecord::new(
            ["Irlande", "Écosse"],
            Availability::Available,
            "Poule B",
        )]);
        store.save(&replacement).await.unwrap();

        assert_eq!(store.load().await.unwrap(), replacement);
        assert!(!dir.path().join("match_snapshot.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_legacy_array_file_is_migrated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old_match_info.json");
        tokio::fs::write(
            &path,
            r#"[
  {"teams": ["France", "All Blacks"], "availability": "Voir les offres", "nameMatch": "Poule A"},
  {"teams": ["Italie", "Uruguay"], "availability": "Non disponible", "nameMatch": "Poule A"}
]"#,
        )
        .await
        .unwrap();

        let snapshot = JsonSnapshotStore::new(&path).load().await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.records()[0].availability, Availability::Available);
        assert_eq!(snapshot.records()[1].availability, Availability::Unavailable);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("match_snapshot.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let err = JsonSnapshotStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, BotError::StateParse { .. }));
    }
}
