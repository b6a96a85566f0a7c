// ── Polling coordinator ──
//
// Decides what to fetch on each tick: project-level attributes change
// rarely, so full refreshes are throttled to every Nth cycle while
// zone data is refreshed every cycle. One background task drives the
// ticks; it never re-enters a tick that is still in flight.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use koolnova_api::{
    ApiClient, Credentials, Project, ProjectPatch, ProjectUpdate, Zone, ZonePatch,
};

use crate::command::{BulkOutcome, ZoneCommand};
use crate::config::{CoordinatorConfig, MAX_UPDATE_INTERVAL_SECS, MIN_UPDATE_INTERVAL_SECS};
use crate::error::CoreError;
use crate::event::{UpdateEvent, UpdateType};
use crate::store::{CacheSnapshot, SiteCache};

const EVENT_CHANNEL_SIZE: usize = 64;

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc`. Owns the API client, the cached site
/// state, the cycle counter, and the background polling task. All
/// reads go through [`snapshot`](Self::snapshot); all writes go
/// through the update operations, which merge the server's response
/// into the cache without re-fetching.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

struct Inner {
    client: ApiClient,
    cache: SiteCache,
    config: RwLock<CoordinatorConfig>,
    /// Ticks since the last full refresh, in `[0, full_refresh_every)`.
    cycle: AtomicU32,
    last_update_ok: AtomicBool,
    event_tx: broadcast::Sender<UpdateEvent>,
    cancel: CancellationToken,
    poll_task: Mutex<Option<JoinHandle<()>>>,
}

impl Coordinator {
    /// Create a coordinator over an already-authenticated client.
    ///
    /// The cache starts empty; call [`start`](Self::start) (or drive
    /// [`tick`](Self::tick) manually) to populate it.
    pub fn new(client: ApiClient, config: CoordinatorConfig) -> Result<Self, CoreError> {
        config.validate()?;
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                cache: SiteCache::new(),
                config: RwLock::new(config),
                cycle: AtomicU32::new(0),
                last_update_ok: AtomicBool::new(false),
                event_tx,
                cancel: CancellationToken::new(),
                poll_task: Mutex::new(None),
            }),
        })
    }

    /// Log in against the production cloud and build a coordinator.
    ///
    /// Login failures are fatal here -- there is no cache to fall
    /// back on at construction time.
    pub async fn login(
        credentials: &Credentials,
        config: CoordinatorConfig,
        timeout: Duration,
    ) -> Result<Self, CoreError> {
        let client = ApiClient::connect(credentials, timeout).await?;
        Self::new(client, config)
    }

    /// Current coordinator configuration.
    pub fn config(&self) -> CoordinatorConfig {
        self.inner.config.read().expect("config lock poisoned").clone()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Perform the initial refresh, then spawn the background polling
    /// task. A failing initial refresh aborts startup.
    pub async fn start(&self) -> Result<(), CoreError> {
        self.tick().await?;

        let mut guard = self.inner.poll_task.lock().await;
        if guard.is_none() {
            let coordinator = self.clone();
            let cancel = self.inner.cancel.clone();
            *guard = Some(tokio::spawn(poll_task(coordinator, cancel)));
            info!("coordinator started");
        }
        Ok(())
    }

    /// Stop the background polling task and wait for it to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        if let Some(handle) = self.inner.poll_task.lock().await.take() {
            let _ = handle.await;
        }
        debug!("coordinator stopped");
    }

    // ── Scheduled tick ───────────────────────────────────────────────

    /// One polling tick.
    ///
    /// An empty cache forces a full refresh regardless of the cycle
    /// counter. Otherwise the counter advances, and every
    /// `full_refresh_every`-th tick refreshes projects and zones
    /// wholesale while the ticks in between fetch zones only.
    ///
    /// Public so a host scheduler can drive ticks itself instead of
    /// using [`start`](Self::start); ticks must not run concurrently.
    pub async fn tick(&self) -> Result<(), CoreError> {
        if self.inner.cache.is_empty() {
            return self.full_refresh(UpdateType::Initial).await;
        }

        let cycle = self.inner.cycle.fetch_add(1, Ordering::SeqCst) + 1;
        let every = self
            .inner
            .config
            .read()
            .expect("config lock poisoned")
            .full_refresh_every;

        if cycle >= every {
            self.full_refresh(UpdateType::Full).await
        } else {
            debug!(cycle, every, "zone-only refresh");
            self.zone_refresh_tick().await
        }
    }

    async fn full_refresh(&self, kind: UpdateType) -> Result<(), CoreError> {
        debug!(update_type = ?kind, "full refresh");

        let (projects, zones) = tokio::join!(
            self.inner.client.fetch_projects(),
            self.inner.client.fetch_zones(),
        );

        match projects.and_then(|p| zones.map(|z| (p, z))) {
            Ok((projects, zones)) => {
                self.inner.cache.replace_all(projects, zones);
                self.inner.cycle.store(0, Ordering::SeqCst);
                self.inner.last_update_ok.store(true, Ordering::SeqCst);
                debug!(
                    projects = self.inner.cache.project_count(),
                    zones = self.inner.cache.zone_count(),
                    "full refresh complete"
                );
                self.emit(kind, true, None);
                Ok(())
            }
            Err(err) => self.absorb_fetch_failure(&err),
        }
    }

    async fn zone_refresh_tick(&self) -> Result<(), CoreError> {
        match self.inner.client.fetch_zones().await {
            Ok(zones) => {
                self.inner.cache.replace_zones(zones);
                self.inner.last_update_ok.store(true, Ordering::SeqCst);
                self.emit(UpdateType::SensorsOnly, true, None);
                Ok(())
            }
            Err(err) => self.absorb_fetch_failure(&err),
        }
    }

    /// Availability-over-freshness: authentication and rate-limit
    /// failures are masked while cached data exists (the stale cache
    /// keeps serving); every other failure -- and any failure with an
    /// empty cache -- is fatal for the tick.
    fn absorb_fetch_failure(&self, err: &koolnova_api::Error) -> Result<(), CoreError> {
        self.inner.last_update_ok.store(false, Ordering::SeqCst);

        if err.is_recoverable_with_cache() && !self.inner.cache.is_empty() {
            warn!(error = %err, "recoverable fetch failure, serving cached data");
            self.emit(UpdateType::Cached, false, Some(err.to_string()));
            return Ok(());
        }

        warn!(error = %err, "fetch failed");
        self.emit(UpdateType::Failed, false, Some(err.to_string()));
        Err(CoreError::UpdateFailed {
            message: format!("error communicating with the Koolnova API: {err}"),
        })
    }

    // ── On-demand refreshes ──────────────────────────────────────────

    /// Force-fetch the project collection, leaving zones untouched.
    /// Does not advance the cycle counter.
    pub async fn refresh_projects(&self) -> Result<Vec<Project>, CoreError> {
        debug!("on-demand project refresh");
        let projects = self
            .inner
            .client
            .fetch_projects()
            .await
            .map_err(|e| CoreError::UpdateFailed {
                message: format!("error fetching projects: {e}"),
            })?;
        self.inner.cache.replace_projects(projects.clone());
        Ok(projects)
    }

    /// Force-fetch the zone collection, leaving projects untouched.
    /// Does not advance the cycle counter.
    pub async fn refresh_zones(&self) -> Result<Vec<Zone>, CoreError> {
        debug!("on-demand zone refresh");
        let zones = self
            .inner
            .client
            .fetch_zones()
            .await
            .map_err(|e| CoreError::UpdateFailed {
                message: format!("error fetching zones: {e}"),
            })?;
        self.inner.cache.replace_zones(zones.clone());
        Ok(zones)
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Apply a partial update to one zone and merge the server's
    /// authoritative response into the cache. No re-fetch happens; the
    /// response is the only input to the merge. Errors always
    /// propagate -- a user-initiated write must never fail silently.
    pub async fn update_zone(&self, room_id: i64, patch: &ZonePatch) -> Result<Zone, CoreError> {
        let zone = self.inner.client.update_zone(room_id, patch).await?;
        self.inner.cache.merge_zone(room_id, &zone);
        Ok(zone)
    }

    /// Apply a partial update to the project controller and merge the
    /// fields present in the response into the cache.
    pub async fn update_project(
        &self,
        topic_id: i64,
        patch: &ProjectPatch,
    ) -> Result<ProjectUpdate, CoreError> {
        let update = self.inner.client.update_project(topic_id, patch).await?;
        self.inner.cache.merge_project(topic_id, &update);
        Ok(update)
    }

    /// Apply one command to every cached zone, sequentially and in
    /// cache order.
    ///
    /// Best-effort: per-zone failures are counted and logged, never
    /// abort the batch, and already-applied zones are not rolled back.
    pub async fn apply_to_all_zones(&self, command: &ZoneCommand) -> BulkOutcome {
        let zones = self.inner.cache.snapshot().zones;
        let patch = command.to_patch();
        let mut outcome = BulkOutcome::default();

        for zone in &zones {
            match self.inner.client.update_zone(zone.room_id, &patch).await {
                Ok(updated) => {
                    self.inner.cache.merge_zone(zone.room_id, &updated);
                    outcome.updated += 1;
                }
                Err(err) => {
                    outcome.failed += 1;
                    warn!(
                        room_id = zone.room_id,
                        name = %zone.name,
                        error = %err,
                        "bulk zone update failed"
                    );
                }
            }
        }

        info!(
            updated = outcome.updated,
            failed = outcome.failed,
            "bulk zone update complete"
        );
        outcome
    }

    // ── Reconfiguration ──────────────────────────────────────────────

    /// Change the polling interval and full-refresh frequency at
    /// runtime.
    ///
    /// A changed frequency resets the cycle counter so the new cadence
    /// starts from a clean boundary. The polling task picks up a new
    /// interval on its next wake.
    pub fn reconfigure(
        &self,
        update_interval_secs: u64,
        full_refresh_every: u32,
    ) -> Result<(), CoreError> {
        let frequency_changed = {
            let mut config = self.inner.config.write().expect("config lock poisoned");
            let mut updated = config.clone();
            updated.update_interval_secs = update_interval_secs;
            updated.full_refresh_every = full_refresh_every;
            updated.validate()?;

            let changed = config.full_refresh_every != full_refresh_every;
            *config = updated;
            changed
        };

        if frequency_changed {
            self.inner.cycle.store(0, Ordering::SeqCst);
        }
        info!(
            update_interval_secs,
            full_refresh_every, "coordinator reconfigured"
        );
        Ok(())
    }

    // ── State observation ────────────────────────────────────────────

    /// Clone of the current cache snapshot.
    pub fn snapshot(&self) -> CacheSnapshot {
        self.inner.cache.snapshot()
    }

    /// Look up one cached zone by id.
    pub fn zone(&self, room_id: i64) -> Result<Zone, CoreError> {
        self.inner
            .cache
            .snapshot()
            .zones
            .into_iter()
            .find(|z| z.room_id == room_id)
            .ok_or(CoreError::NotFound {
                entity: "zone",
                identifier: room_id.to_string(),
            })
    }

    /// Look up one cached project by id.
    pub fn project(&self, topic_id: i64) -> Result<Project, CoreError> {
        self.inner
            .cache
            .snapshot()
            .projects
            .into_iter()
            .find(|p| p.topic_id == topic_id)
            .ok_or(CoreError::NotFound {
                entity: "project",
                identifier: topic_id.to_string(),
            })
    }

    /// When the cache was last refreshed wholesale, or `None` before
    /// the first successful full refresh.
    pub fn last_full_refresh(&self) -> Option<chrono::DateTime<Utc>> {
        self.inner.cache.last_full_refresh()
    }

    /// Whether the most recent fetch succeeded. `false` while the
    /// coordinator is serving stale data.
    pub fn last_update_succeeded(&self) -> bool {
        self.inner.last_update_ok.load(Ordering::SeqCst)
    }

    /// Ticks since the last full refresh.
    pub fn cycles_since_full_refresh(&self) -> u32 {
        self.inner.cycle.load(Ordering::SeqCst)
    }

    /// Subscribe to per-tick lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<UpdateEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Subscribe to a version counter bumped after every cache
    /// mutation (ticks, targeted refreshes, and update merges alike).
    pub fn watch_data(&self) -> watch::Receiver<u64> {
        self.inner.cache.subscribe()
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn update_interval(&self) -> Duration {
        let secs = self
            .inner
            .config
            .read()
            .expect("config lock poisoned")
            .update_interval_secs
            .clamp(MIN_UPDATE_INTERVAL_SECS, MAX_UPDATE_INTERVAL_SECS);
        Duration::from_secs(secs)
    }

    fn emit(&self, update_type: UpdateType, success: bool, error: Option<String>) {
        let snapshot = self.inner.cache.snapshot();
        let last_sync = snapshot.projects.first().and_then(|p| p.last_sync.clone());

        let _ = self.inner.event_tx.send(UpdateEvent {
            update_type,
            success,
            timestamp: Utc::now(),
            last_sync,
            projects: snapshot.projects.len(),
            zones: snapshot.zones.len(),
            error,
        });
    }
}

// ── Background task ──────────────────────────────────────────────────

/// Drive ticks on the configured interval until cancelled.
///
/// Sleeping anew each iteration (rather than a fixed `interval`)
/// serializes ticks by construction and lets a reconfigured interval
/// take effect on the next wake.
async fn poll_task(coordinator: Coordinator, cancel: CancellationToken) {
    loop {
        let interval = coordinator.update_interval();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            () = tokio::time::sleep(interval) => {
                if let Err(e) = coordinator.tick().await {
                    warn!(error = %e, "scheduled refresh failed");
                }
            }
        }
    }
}
