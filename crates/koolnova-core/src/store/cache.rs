// ── In-memory cache of the last-known site state ──
//
// Ordered collections behind one lock: bulk commands, single-entity
// updates and the scheduled tick can all originate from different
// tasks, so every mutation takes the write guard. Change notification
// goes through a version `watch` channel, bumped only after a
// mutation completes so observers never see partially-merged state.

use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::debug;

use koolnova_api::{Project, ProjectUpdate, Zone};

/// The cached collections. Each `topic_id`/`room_id` is unique within
/// its collection; order is the API's listing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheSnapshot {
    pub projects: Vec<Project>,
    pub zones: Vec<Zone>,
}

/// Thread-safe store for the last-known project and zone collections.
pub struct SiteCache {
    inner: RwLock<CacheSnapshot>,
    version: watch::Sender<u64>,
    last_full_refresh: watch::Sender<Option<DateTime<Utc>>>,
}

impl SiteCache {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (last_full_refresh, _) = watch::channel(None);
        Self {
            inner: RwLock::new(CacheSnapshot::default()),
            version,
            last_full_refresh,
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Clone of the current snapshot.
    pub fn snapshot(&self) -> CacheSnapshot {
        self.inner.read().expect("cache lock poisoned").clone()
    }

    /// `true` until the first successful refresh populates the cache.
    pub fn is_empty(&self) -> bool {
        let inner = self.inner.read().expect("cache lock poisoned");
        inner.projects.is_empty() && inner.zones.is_empty()
    }

    pub fn project_count(&self) -> usize {
        self.inner.read().expect("cache lock poisoned").projects.len()
    }

    pub fn zone_count(&self) -> usize {
        self.inner.read().expect("cache lock poisoned").zones.len()
    }

    /// When the last full refresh happened, or `None` if never.
    pub fn last_full_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_full_refresh.borrow()
    }

    /// Subscribe to a version counter bumped after every mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    // ── Wholesale replacement ────────────────────────────────────────

    /// Replace both collections (full refresh).
    pub fn replace_all(&self, projects: Vec<Project>, zones: Vec<Zone>) {
        {
            let mut inner = self.inner.write().expect("cache lock poisoned");
            inner.projects = projects;
            inner.zones = zones;
        }
        // send_replace stores even without receivers, unlike send.
        self.last_full_refresh.send_replace(Some(Utc::now()));
        self.bump();
    }

    /// Replace only the zone collection (targeted refresh).
    pub fn replace_zones(&self, zones: Vec<Zone>) {
        {
            let mut inner = self.inner.write().expect("cache lock poisoned");
            inner.zones = zones;
        }
        self.bump();
    }

    /// Replace only the project collection (targeted refresh).
    pub fn replace_projects(&self, projects: Vec<Project>) {
        {
            let mut inner = self.inner.write().expect("cache lock poisoned");
            inner.projects = projects;
        }
        self.bump();
    }

    // ── Targeted merges ──────────────────────────────────────────────

    /// Merge a single-zone update response into the cache.
    ///
    /// Overwrites the volatile fields from the server's authoritative
    /// record, leaving the rest of the collection untouched. Returns
    /// `false` (and mutates nothing) when `room_id` is not cached --
    /// a skipped merge is logged, never fatal.
    pub fn merge_zone(&self, room_id: i64, update: &Zone) -> bool {
        {
            let mut inner = self.inner.write().expect("cache lock poisoned");
            let Some(zone) = inner.zones.iter_mut().find(|z| z.room_id == room_id) else {
                debug!(room_id, "zone not in cache, merge skipped");
                return false;
            };
            zone.target_temperature = update.target_temperature;
            zone.current_temperature = update.current_temperature;
            zone.status = update.status.clone();
            zone.fan_speed = update.fan_speed.clone();
            zone.name = update.name.clone();
            zone.topic = update.topic.clone();
            zone.updated_at = update.updated_at.clone();
        }
        self.bump();
        true
    }

    /// Merge a project update response into the cache.
    ///
    /// Only the fields actually present in the response are written;
    /// everything else keeps its cached value.
    pub fn merge_project(&self, topic_id: i64, update: &ProjectUpdate) -> bool {
        {
            let mut inner = self.inner.write().expect("cache lock poisoned");
            let Some(project) = inner.projects.iter_mut().find(|p| p.topic_id == topic_id)
            else {
                debug!(topic_id, "project not in cache, merge skipped");
                return false;
            };
            if let Some(mode) = &update.mode {
                project.mode = mode.clone();
            }
            if let Some(is_online) = update.is_online {
                project.is_online = is_online;
            }
            if let Some(eco) = update.eco {
                project.eco = eco;
            }
            if let Some(last_sync) = &update.last_sync {
                project.last_sync = Some(last_sync.clone());
            }
            if let Some(is_stop) = update.is_stop {
                project.is_stop = is_stop;
            }
        }
        self.bump();
        true
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

impl Default for SiteCache {
    fn default() -> Self {
        Self::new()
    }
}
