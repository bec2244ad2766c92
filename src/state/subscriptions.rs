use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::error::{BotError, Result};

/// Where and whom to notify for one guild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(alias = "activeCheck")]
    pub active: bool,
    pub channel_id: String,
    /// Preformatted mention, e.g. `<@1234>`
    #[serde(alias = "userMention")]
    pub mention_target: String,
}

/// Outcome of a `start` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Activated,
    AlreadyActive,
}

/// Outcome of a `stop` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    Deactivated,
    NothingToStop,
}

/// Guild ID -> subscription, persisted on every mutation.
///
/// Mutations go through `&mut self`, so holding the write half of
/// [`SharedSubscriptionRegistry`] is the single-writer discipline.
#[derive(Debug)]
pub struct SubscriptionRegistry {
    path: String,
    subscriptions: BTreeMap<String, Subscription>,
}

impl SubscriptionRegistry {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            subscriptions: BTreeMap::new(),
        }
    }

    /// Load from file, or start empty if the file does not exist yet
    pub async fn load(path: &str) -> Result<Self> {
        let subscriptions = match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| BotError::StateParse {
                    path: path.to_string(),
                    source: e,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(BotError::StateLoad {
                    path: path.to_string(),
                    source: e,
                })
            }
        };

        Ok(Self {
            path: path.to_string(),
            subscriptions,
        })
    }

    /// Activate notifications for a guild
    pub async fn start(
        &mut self,
        guild_id: &str,
        channel_id: &str,
        mention_target: &str,
    ) -> Result<StartOutcome> {
        if self.is_active(guild_id) {
            return Ok(StartOutcome::AlreadyActive);
        }

        let mut next = self.subscriptions.clone();
        next.insert(
            guild_id.to_string(),
            Subscription {
                active: true,
                channel_id: channel_id.to_string(),
                mention_target: mention_target.to_string(),
            },
        );
        self.commit(next).await?;

        info!("Subscription activated for guild {} in channel {}", guild_id, channel_id);
        Ok(StartOutcome::Activated)
    }

    /// Remove the guild's subscription
    pub async fn stop(&mut self, guild_id: &str) -> Result<StopOutcome> {
        if !self.is_active(guild_id) {
            return Ok(StopOutcome::NothingToStop);
        }

        let mut next = self.subscriptions.clone();
        next.remove(guild_id);
        self.commit(next).await?;

        info!("Subscription removed for guild {}", guild_id);
        Ok(StopOutcome::Deactivated)
    }

    pub fn is_active(&self, guild_id: &str) -> bool {
        self.get(guild_id).is_some_and(|s| s.active)
    }

    pub fn get(&self, guild_id: &str) -> Option<&Subscription> {
        self.subscriptions.get(guild_id)
    }

    /// Copy of every active subscription, for fan-out outside the lock
    pub fn active_subscriptions(&self) -> Vec<(String, Subscription)> {
        self.subscriptions
            .iter()
            .filter(|(_, s)| s.active)
            .map(|(guild_id, s)| (guild_id.clone(), s.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Persist `next`, then make it the live state
    async fn commit(&mut self, next: BTreeMap<String, Subscription>) -> Result<()> {
        save_to(&self.path, &next).await?;
        self.subscriptions = next;
        Ok(())
    }
}

async fn save_to(path: &str, subscriptions: &BTreeMap<String, Subscription>) -> Result<()> {
    let content = serde_json::to_string_pretty(subscriptions)?;

    let temp_path = format!("{}.tmp", path);
    tokio::fs::write(&temp_path, &content)
        .await
        .map_err(|e| BotError::StateSave {
            path: path.to_string(),
            source: e,
        })?;

    tokio::fs::rename(&temp_path, path)
        .await
        .map_err(|e| BotError::StateSave {
            path: path.to_string(),
            source: e,
        })?;

    Ok(())
}

/// Shared subscription registry type
pub type SharedSubscriptionRegistry = Arc<tokio::sync::RwLock<SubscriptionRegistry>>;

pub fn create_shared_subscription_registry(
    registry: SubscriptionRegistry,
) -> SharedSubscriptionRegistry {
    Arc::new(tokio::sync::RwLock::new(registry))
}
