// ── Tick lifecycle events ──
//
// Pure notification side-channel: one event per polling tick (and per
// forced refresh), emitted only after the cache mutation completed.
// Safe to ignore; dropping the receiver unsubscribes.

use chrono::{DateTime, Utc};

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateType {
    /// First population of an empty cache.
    Initial,
    /// Scheduled full refresh (projects + zones replaced wholesale).
    Full,
    /// Zone-only refresh; projects kept from cache.
    SensorsOnly,
    /// Fetch failed with a recoverable error; stale cache served.
    Cached,
    /// Fetch failed fatally.
    Failed,
}

/// Notification emitted after every tick.
#[derive(Debug, Clone)]
pub struct UpdateEvent {
    pub update_type: UpdateType,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    /// Last cloud sync reported by the project controller, if known.
    pub last_sync: Option<String>,
    pub projects: usize,
    pub zones: usize,
    pub error: Option<String>,
}
