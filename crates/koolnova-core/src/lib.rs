// koolnova-core: Cached state and polling coordination over koolnova-api.

pub mod command;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{BulkOutcome, ZoneCommand};
pub use config::CoordinatorConfig;
pub use coordinator::Coordinator;
pub use error::CoreError;
pub use event::{UpdateEvent, UpdateType};
pub use store::{CacheSnapshot, SiteCache};

// Re-export entity types at the crate root for ergonomics.
pub use koolnova_api::{
    Credentials, FanSpeed, Project, ProjectMode, ProjectPatch, ProjectUpdate, TopicLink, Zone,
    ZonePatch, ZoneStatus,
};
