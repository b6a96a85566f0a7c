use thiserror::Error;

/// Top-level error type for the `koolnova-api` crate.
///
/// Covers every failure mode of the REST surface: login, ongoing
/// authenticated calls, and payload decoding. `koolnova-core` maps
/// these into its own domain-level error type.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected, or an ongoing call rejected because the bearer
    /// token is invalid or expired.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// Login response was 2xx but carried none of the accepted token
    /// field names.
    #[error("Authentication response did not contain a token")]
    MissingToken,

    /// Login never produced an HTTP response, even after retries.
    #[error("Authentication request failed after {attempts} attempts (no response)")]
    NoResponse { attempts: u32 },

    // ── Rate limiting ───────────────────────────────────────────────
    /// HTTP 429 from the API. `retry_after_secs` is the server hint,
    /// or 0 when the header was absent or unparseable.
    #[error("Rate limited -- retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── API ─────────────────────────────────────────────────────────
    /// Any other non-2xx status from the API.
    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is an authentication-class failure.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Returns `true` if this is a rate-limit failure.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Returns `true` if a poller holding cached data may serve the
    /// stale cache instead of propagating this error.
    ///
    /// Only authentication and rate-limit failures qualify: both are
    /// transient credential/quota problems that do not invalidate the
    /// last-known state. Everything else must surface.
    pub fn is_recoverable_with_cache(&self) -> bool {
        self.is_auth() || self.is_rate_limited()
    }
}
