// Typed operations over the authenticated session
//
// Pure translation layer: GETs deserialize straight into the
// normalized record types, PATCHes send partial bodies and return the
// server's authoritative post-update representation. No retries here;
// transport errors propagate unchanged.

use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{Project, ProjectPatch, ProjectUpdate, Zone, ZonePatch};
use crate::session::{Credentials, Session, KOOLNOVA_API_URL};

/// Typed client for the Koolnova REST API.
pub struct ApiClient {
    session: Session,
}

impl ApiClient {
    /// Log in against the production cloud and return a ready client.
    pub async fn connect(credentials: &Credentials, timeout: Duration) -> Result<Self, Error> {
        let base_url = Url::parse(KOOLNOVA_API_URL)?;
        Self::connect_to(credentials, base_url, timeout).await
    }

    /// Log in against an explicit base URL.
    pub async fn connect_to(
        credentials: &Credentials,
        base_url: Url,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let session = Session::login(credentials, base_url, timeout).await?;
        Ok(Self { session })
    }

    /// Wrap an already-authenticated session.
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Access the underlying session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// List all project controllers on the account.
    pub async fn fetch_projects(&self) -> Result<Vec<Project>, Error> {
        let projects: Vec<Project> = self.session.get("topics/").await?;
        debug!(count = projects.len(), "fetched projects");
        Ok(projects)
    }

    /// List all zones on the account.
    pub async fn fetch_zones(&self) -> Result<Vec<Zone>, Error> {
        let zones: Vec<Zone> = self.session.get("devices/").await?;
        debug!(count = zones.len(), "fetched zones");
        Ok(zones)
    }

    /// Apply a partial update to one zone.
    ///
    /// The returned record is the server's post-update view of the
    /// zone -- callers merge it into local state instead of re-fetching.
    pub async fn update_zone(&self, room_id: i64, patch: &ZonePatch) -> Result<Zone, Error> {
        debug!(room_id, "updating zone");
        self.session.patch(&format!("devices/{room_id}/"), patch).await
    }

    /// Apply a partial update to one project controller.
    ///
    /// The response echoes only the affected fields; see
    /// [`ProjectUpdate`].
    pub async fn update_project(
        &self,
        topic_id: i64,
        patch: &ProjectPatch,
    ) -> Result<ProjectUpdate, Error> {
        debug!(topic_id, "updating project");
        self.session.patch(&format!("topics/{topic_id}/"), patch).await
    }
}
