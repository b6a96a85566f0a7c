// ── Core error types ──
//
// Consumer-facing errors from koolnova-core. The `From<koolnova_api::Error>`
// impl translates transport-layer failures into domain-appropriate
// variants; consumers never match on HTTP details directly.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// A scheduled or on-demand refresh could not produce fresh data
    /// and the stale-serve policy did not apply.
    #[error("Update failed: {message}")]
    UpdateFailed { message: String },

    #[error("{entity} not found: {identifier}")]
    NotFound {
        entity: &'static str,
        identifier: String,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code, when one was received.
        status: Option<u16>,
    },
}

impl From<koolnova_api::Error> for CoreError {
    fn from(err: koolnova_api::Error) -> Self {
        match err {
            koolnova_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            koolnova_api::Error::MissingToken => CoreError::AuthenticationFailed {
                message: "login response did not contain a token".into(),
            },
            koolnova_api::Error::NoResponse { attempts } => CoreError::AuthenticationFailed {
                message: format!("no response from the login endpoint after {attempts} attempts"),
            },
            koolnova_api::Error::RateLimited { retry_after_secs } => CoreError::Api {
                message: format!("rate limited -- retry after {retry_after_secs}s"),
                status: Some(429),
            },
            koolnova_api::Error::Transport(e) => CoreError::Api {
                message: e.to_string(),
                status: e.status().map(|s| s.as_u16()),
            },
            koolnova_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("invalid URL: {e}"),
            },
            koolnova_api::Error::Api { status, body } => CoreError::Api {
                message: body,
                status: Some(status),
            },
            koolnova_api::Error::Deserialization { message, body: _ } => CoreError::Api {
                message: format!("undecodable API response: {message}"),
                status: None,
            },
        }
    }
}
