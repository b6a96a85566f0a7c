// ── Cached site state ──
//
// Last-known projects and zones, mutated in place for the process
// lifetime. Never persisted; a restart implies an empty cache and a
// forced full refresh.

mod cache;

pub use cache::{CacheSnapshot, SiteCache};
