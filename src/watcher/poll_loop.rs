use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::{BotError, Result};
use crate::models::{MatchRecord, Snapshot};
use crate::scrape::{Extractor, Readiness, Renderer};
use crate::state::{SharedSubscriptionRegistry, SnapshotStore};
use crate::watcher::differ::diff;
use crate::watcher::notifier::{notify, MessageSink};

/// Timing of the scrape loop
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    /// Delay between the end of one cycle and the start of the next
    pub interval: Duration,
    /// Upper bound for rendering and extracting one page
    pub cycle_timeout: Duration,
}

/// Result of a single scrape-diff-notify cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed { matches: usize, transitions: usize },
    Failed { reason: String },
}

/// Drives the scrape-diff-notify cycle.
///
/// Owns the renderer, so only this loop ever reloads or recreates the
/// browser session. Cycles never overlap.
pub struct PollLoop<R: Renderer> {
    renderer: R,
    extractor: Extractor,
    store: Arc<dyn SnapshotStore>,
    sink: Arc<dyn MessageSink>,
    subscriptions: SharedSubscriptionRegistry,
    settings: PollSettings,
    previous: Snapshot,
}

impl<R: Renderer> PollLoop<R> {
    pub async fn new(
        renderer: R,
        store: Arc<dyn SnapshotStore>,
        sink: Arc<dyn MessageSink>,
        subscriptions: SharedSubscriptionRegistry,
        settings: PollSettings,
    ) -> Result<Self> {
        let previous = store.load().await.unwrap_or_else(|e| {
            warn!("Could not load match snapshot: {}, starting from empty snapshot", e);
            Snapshot::new()
        });
        if previous.is_empty() {
            info!("No match snapshot yet, the first cycle only records a baseline");
        } else {
            info!("Loaded snapshot with {} match(es)", previous.len());
        }

        Ok(Self {
            renderer,
            extractor: Extractor::new()?,
            store,
            sink,
            subscriptions,
            settings,
            previous,
        })
    }

    pub fn previous(&self) -> &Snapshot {
        &self.previous
    }

    /// Run cycles forever, re-arming after every cycle whatever its outcome
    pub async fn run(mut self) {
        info!(
            "Poll loop started (interval {:?}, cycle timeout {:?}, {} known match(es))",
            self.settings.interval,
            self.settings.cycle_timeout,
            self.previous().len()
        );
        loop {
            self.tick().await;
            tokio::time::sleep(self.settings.interval).await;
        }
    }

    /// One full cycle. Failures are logged here and never propagate.
    pub async fn tick(&mut self) -> CycleOutcome {
        info!("Starting scrape cycle");

        let scraped = match tokio::time::timeout(self.settings.cycle_timeout, self.scrape()).await
        {
            Ok(result) => result,
            Err(_) => Err(BotError::CycleTimeout {
                seconds: self.settings.cycle_timeout.as_secs(),
            }),
        };

        let records = match scraped {
            Ok(records) => records,
            Err(e) => {
                error!("Scrape cycle aborted: {}", e);
                if e.poisons_session() {
                    self.renderer.teardown().await;
                }
                return CycleOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let current = Snapshot::from_records(records);
        let transitions = diff(&self.previous, current.records());
        let matches = current.len();

        if let Err(e) = self.store.save(&current).await {
            error!("Failed to save match snapshot: {}", e);
        }
        self.previous = current;

        if transitions.is_empty() {
            info!("No changes detected across {} match(es)", matches);
        } else {
            dispatch(&self.subscriptions, self.sink.as_ref(), &transitions).await;
        }

        CycleOutcome::Completed {
            matches,
            transitions: transitions.len(),
        }
    }

    async fn scrape(&mut self) -> Result<Vec<MatchRecord>> {
        // A freshly opened page has just been navigated, so only wait for it
        let document = match self.renderer.ensure_ready().await? {
            Readiness::Created => {
                info!("Browser session ready");
                self.renderer.capture().await?
            }
            Readiness::Reused => self.renderer.reload().await?,
        };
        debug!("Rendered {} ({} bytes)", document.url, document.html.len());

        let records = self.extractor.extract(&document.html)?;
        for record in &records {
            debug!(
                "{} [{}] {:?}",
                record.display_teams(),
                record.phase_name,
                record.availability
            );
        }
        Ok(records)
    }
}

/// Fan transitions out to every active subscriber
async fn dispatch(
    subscriptions: &SharedSubscriptionRegistry,
    sink: &dyn MessageSink,
    transitions: &[MatchRecord],
) {
    for record in transitions {
        info!("Tickets available: {}", record.display_teams());
    }

    // Copy out so a concurrent start/stop is never blocked by delivery
    let subscribers = subscriptions.read().await.active_subscriptions();
    if subscribers.is_empty() {
        info!("No active subscriptions to notify");
        return;
    }

    join_all(
        subscribers
            .iter()
            .map(|(_, subscription)| notify(sink, subscription, transitions)),
    )
    .await;
}
