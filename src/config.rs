use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::{BotError, Result};
use crate::scrape::{SessionConfig, TARGET_URL};
use crate::watcher::PollSettings;

/// File names the previous bot kept in its working directory
const LEGACY_SNAPSHOT_FILE: &str = "old_match_info.json";
const LEGACY_SUBSCRIPTIONS_FILE: &str = "server_info.json";

/// Runtime settings read from the environment
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub state_path: PathBuf,
    pub check_interval: Duration,
    pub settle_delay: Duration,
    pub navigation_timeout: Duration,
    pub cycle_timeout: Duration,
    pub chrome_path: Option<PathBuf>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from("state"),
            check_interval: Duration::from_secs(10),
            settle_delay: Duration::from_secs(8),
            navigation_timeout: Duration::from_secs(30),
            cycle_timeout: Duration::from_secs(120),
            chrome_path: None,
        }
    }
}

impl WatchConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let seconds = |key: &str, default: Duration| -> Result<Duration> {
            match lookup(key) {
                Some(value) => value
                    .trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| BotError::InvalidConfig {
                        key: key.to_string(),
                        value,
                    }),
                None => Ok(default),
            }
        };

        let config = Self {
            state_path: lookup("STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_path),
            check_interval: seconds("CHECK_INTERVAL_SECS", defaults.check_interval)?,
            settle_delay: seconds("SETTLE_DELAY_SECS", defaults.settle_delay)?,
            navigation_timeout: seconds("NAVIGATION_TIMEOUT_SECS", defaults.navigation_timeout)?,
            cycle_timeout: seconds("CYCLE_TIMEOUT_SECS", defaults.cycle_timeout)?,
            chrome_path: lookup("CHROME_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        };

        if config.check_interval.is_zero() {
            return Err(BotError::InvalidConfig {
                key: "CHECK_INTERVAL_SECS".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(config)
    }

    pub fn snapshot_file(&self) -> PathBuf {
        self.state_path.join("match_snapshot.json")
    }

    pub fn subscriptions_file(&self) -> String {
        self.state_path.join("subscriptions.json").display().to_string()
    }

    /// Copy state files of the previous bot out of `legacy_dir` into the
    /// state directory, for each one that has no counterpart there yet.
    /// Returns the files that were adopted.
    pub async fn adopt_legacy_files(&self, legacy_dir: &Path) -> Result<Vec<PathBuf>> {
        let pairs = [
            (legacy_dir.join(LEGACY_SNAPSHOT_FILE), self.snapshot_file()),
            (
                legacy_dir.join(LEGACY_SUBSCRIPTIONS_FILE),
                PathBuf::from(self.subscriptions_file()),
            ),
        ];

        let mut adopted = Vec::new();
        for (legacy, target) in pairs {
            if tokio::fs::try_exists(&target).await? || !tokio::fs::try_exists(&legacy).await? {
                continue;
            }
            tokio::fs::copy(&legacy, &target)
                .await
                .map_err(|e| BotError::StateSave {
                    path: target.display().to_string(),
                    source: e,
                })?;
            info!("Adopted {} as {}", legacy.display(), target.display());
            adopted.push(target);
        }
        Ok(adopted)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            url: TARGET_URL.to_string(),
            chrome_path: self.chrome_path.clone(),
            navigation_timeout: self.navigation_timeout,
            settle_delay: self.settle_delay,
            // Outlive the quiet period between two cycles
            idle_timeout: (self.check_interval + self.cycle_timeout) * 2,
        }
    }

    pub fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: self.check_interval,
            cycle_timeout: self.cycle_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = WatchConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.check_interval, Duration::from_secs(10));
        assert_eq!(config.settle_delay, Duration::from_secs(8));
        assert_eq!(config.snapshot_file(), PathBuf::from("state/match_snapshot.json"));
        assert!(config.chrome_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = WatchConfig::from_lookup(lookup_from(&[
            ("STATE_PATH", "/var/lib/watch"),
            ("CHECK_INTERVAL_SECS", "60"),
            ("CHROME_PATH", "/usr/bin/chromium"),
        ]))
        .unwrap();

        assert_eq!(config.check_interval, Duration::from_secs(60));
        assert_eq!(config.subscriptions_file(), "/var/lib/watch/subscriptions.json");
        assert_eq!(config.chrome_path, Some(PathBuf::from("/usr/bin/chromium")));
        assert_eq!(config.session_config().url, TARGET_URL);
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = WatchConfig::from_lookup(lookup_from(&[("SETTLE_DELAY_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, BotError::InvalidConfig { ref key, .. } if key == "SETTLE_DELAY_SECS"));
    }

    #[tokio::test]
    async fn test_legacy_files_are_adopted_once() {
        let legacy = tempfile::tempdir().unwrap();
        let state = tempfile::tempdir().unwrap();
        tokio::fs::write(legacy.path().join("old_match_info.json"), "[]")
            .await
            .unwrap();
        tokio::fs::write(legacy.path().join("server_info.json"), "{}")
            .await
            .unwrap();

        let config = WatchConfig {
            state_path: state.path().to_path_buf(),
            ..Default::default()
        };
        tokio::fs::write(config.subscriptions_file(), r#"{"1": {"active": true, "channelId": "2", "mentionTarget": "<@3>"}}"#)
            .await
            .unwrap();

        let adopted = config.adopt_legacy_files(legacy.path()).await.unwrap();
        assert_eq!(adopted, vec![config.snapshot_file()]);
        assert_eq!(tokio::fs::read_to_string(config.snapshot_file()).await.unwrap(), "[]");
        assert!(tokio::fs::read_to_string(config.subscriptions_file())
            .await
            .unwrap()
            .contains("mentionTarget"));

        assert!(config.adopt_legacy_files(legacy.path()).await.unwrap().is_empty());
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        assert!(WatchConfig::from_lookup(lookup_from(&[("CHECK_INTERVAL_SECS", "0")])).is_err());
    }
}
