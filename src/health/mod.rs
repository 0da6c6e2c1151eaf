//! Health-check scheduling.
//!
//! The scheduler keeps an in-memory mirror of the active check definitions,
//! decrements per-check countdowns on every clock tick, dispatches due probes
//! on detached tasks, and reconciles the mirror with the store on a fixed
//! cadence so portal edits take effect without a restart.

mod probe;
mod types;

#[cfg(test)]
mod tests;

pub use types::{CheckDefinition, CheckEntry, CheckLog};

use crate::config::{HttpClientConfig, SchedulerConfig};
use crate::store::{self, Store};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Background service that drives scheduled health probes.
pub struct Scheduler {
    store: Arc<dyn Store>,
    /// HTTP client shared by all probes.
    client: reqwest::Client,
    /// Mirror of active definitions, keyed by definition id.
    entries: RwLock<HashMap<String, CheckEntry>>,
    config: SchedulerConfig,
}

impl Scheduler {
    /// Create a scheduler with the default probe client.
    pub fn new(store: Arc<dyn Store>, config: SchedulerConfig, http: &HttpClientConfig) -> Self {
        let client =
            http.build_with_timeout(Duration::from_secs(config.probe_timeout_seconds));
        Self::with_client(store, config, client)
    }

    /// Create a scheduler with a custom HTTP client (for testing).
    pub fn with_client(
        store: Arc<dyn Store>,
        config: SchedulerConfig,
        client: reqwest::Client,
    ) -> Self {
        Self {
            store,
            client,
            entries: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Start the scheduler background task.
    ///
    /// Performs one synchronous reconcile before consuming ticks, then runs
    /// the periodic reconciler alongside the tick loop. Returns a JoinHandle
    /// that resolves when the scheduler stops.
    pub fn start(
        self: Arc<Self>,
        mut ticks: mpsc::Receiver<()>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.reconcile().await {
                tracing::warn!(error = %e, "initial health check load failed");
            }

            let reconciler = tokio::spawn({
                let scheduler = Arc::clone(&self);
                let cancel = cancel.clone();
                async move { scheduler.reconcile_loop(cancel).await }
            });

            tracing::info!("health scheduler started");

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    tick = ticks.recv() => match tick {
                        Some(()) => self.tick().await,
                        None => break,
                    },
                }
            }

            let _ = reconciler.await;
            tracing::info!("health scheduler stopped");
        })
    }

    /// Advance every countdown by one second and dispatch due probes.
    ///
    /// The write lock covers integer arithmetic and task spawn only; probe
    /// execution happens on detached tasks.
    pub async fn tick(&self) {
        let mut entries = self.entries.write().await;

        for entry in entries.values_mut() {
            entry.countdown -= 1;

            if entry.countdown <= 0 {
                let client = self.client.clone();
                let store = Arc::clone(&self.store);
                let definition = entry.definition.clone();

                tracing::debug!(name = %definition.name, "executing health check");
                tokio::spawn(async move {
                    probe::execute(client, store, definition).await;
                });

                entry.countdown = entry.definition.interval;
            }
        }
    }

    /// Reconcile the in-memory mirror with the store's active definitions.
    ///
    /// Removes entries whose definition disappeared from the active set,
    /// inserts new ones with a full countdown, and on a change to any of
    /// url/interval/method/statusCode replaces the definition and resets the
    /// countdown. Other field changes are applied without touching the
    /// countdown. Idempotent.
    pub async fn reconcile(&self) -> Result<(), crate::store::StoreError> {
        let documents = self.store.find_active(store::DEFINITIONS_COLLECTION).await?;

        let mut loaded = Vec::with_capacity(documents.len());
        for document in documents {
            match bson::from_document::<CheckDefinition>(document) {
                Ok(definition) => loaded.push(definition),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed health check definition")
                }
            }
        }

        let active_ids: HashSet<String> = loaded.iter().map(|d| d.id.to_hex()).collect();

        let mut entries = self.entries.write().await;

        entries.retain(|id, entry| {
            let keep = active_ids.contains(id);
            if !keep {
                tracing::info!(
                    name = %entry.definition.name,
                    "removing health check (deleted or inactive)"
                );
            }
            keep
        });

        for definition in loaded {
            let id = definition.id.to_hex();
            match entries.entry(id) {
                std::collections::hash_map::Entry::Occupied(mut occupied) => {
                    let entry = occupied.get_mut();
                    let current = &entry.definition;
                    if current.url != definition.url
                        || current.interval != definition.interval
                        || current.method != definition.method
                        || current.status_code != definition.status_code
                    {
                        tracing::info!(name = %definition.name, "updating health check");
                        entry.countdown = definition.interval;
                    }
                    entry.definition = definition;
                }
                std::collections::hash_map::Entry::Vacant(vacant) => {
                    tracing::info!(
                        name = %definition.name,
                        interval = definition.interval,
                        "loaded health check"
                    );
                    vacant.insert(CheckEntry {
                        countdown: definition.interval,
                        definition,
                    });
                }
            }
        }

        metrics::gauge!("vigil_active_checks").set(entries.len() as f64);

        Ok(())
    }

    /// Number of checks currently mirrored.
    pub async fn active_count(&self) -> usize {
        self.entries.read().await.len()
    }

    async fn reconcile_loop(&self, cancel: CancellationToken) {
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.config.reconcile_interval_seconds));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The immediate first tick would double the startup load.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    if let Err(e) = self.reconcile().await {
                        tracing::warn!(error = %e, "health check reconcile failed");
                    }
                }
            }
        }
    }
}
