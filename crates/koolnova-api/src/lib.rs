// koolnova-api: Async Rust client for the Koolnova cloud climate API.

pub mod client;
pub mod error;
pub mod models;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use client::ApiClient;
pub use error::Error;
pub use models::{
    FanSpeed, Project, ProjectMode, ProjectPatch, ProjectUpdate, TopicLink, Zone, ZonePatch,
    ZoneStatus,
};
pub use session::{Credentials, Session, KOOLNOVA_API_URL};
