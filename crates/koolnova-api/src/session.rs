// Authenticated session against the Koolnova cloud API
//
// Owns the bearer token and base URL. The token is obtained once at
// construction through a retrying login; there is no refresh logic --
// a token that expires mid-session surfaces as an authentication
// error on the ongoing call, and recovery is the caller's concern.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CACHE_CONTROL, RETRY_AFTER};
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;

/// Production base URL of the Koolnova cloud.
pub const KOOLNOVA_API_URL: &str = "https://api.koolnova.com";

/// Login endpoint, relative to the base URL.
const AUTH_PATH: &str = "auth/v2/login/";

/// Browser-style User-Agent; the cloud routes some requests on it.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const MAX_LOGIN_ATTEMPTS: u32 = 5;
const LOGIN_TIMEOUT: Duration = Duration::from_secs(30);

const BACKOFF_BASE_SECS: f64 = 2.0;
const BACKOFF_CAP_SECS: f64 = 60.0;
const SERVER_ERROR_CAP_SECS: f64 = 30.0;
const RATE_LIMIT_BASELINE_SECS: f64 = 32.0;
const RATE_LIMIT_STEP_SECS: f64 = 5.0;

// ── Credentials ──────────────────────────────────────────────────────

/// Account credentials for the login call.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
    /// Explicit address override. When set -- or when `username`
    /// contains an `@` -- the login payload uses an `email` field
    /// instead of `username`, matching the web app.
    pub email: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
            email: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    fn login_payload(&self) -> serde_json::Value {
        let password = self.password.expose_secret();
        if let Some(email) = &self.email {
            json!({ "email": email, "password": password })
        } else if self.username.contains('@') {
            json!({ "email": self.username, "password": password })
        } else {
            json!({ "username": self.username, "password": password })
        }
    }
}

// ── Session ──────────────────────────────────────────────────────────

/// Authenticated HTTP session holding a bearer token.
///
/// Construct via [`Session::login`]; every subsequent request carries
/// `Authorization: Bearer <token>`. Caller-supplied headers merge on
/// top of the defaults and may override them when explicitly provided.
pub struct Session {
    http: reqwest::Client,
    base_url: Url,
    bearer_token: String,
    token_created: DateTime<Utc>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.base_url.as_str())
            .field("bearer_token", &"<redacted>")
            .field("token_created", &self.token_created)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Authenticate against the login endpoint and return a ready
    /// session.
    ///
    /// The login call retries up to 5 times: transport errors back off
    /// exponentially from 2s (cap 60s), HTTP 429 honors a parseable
    /// `Retry-After` of at most 60s (otherwise 32s + 5s per attempt),
    /// and HTTP 5xx backs off exponentially from 2s capped at 30s.
    /// Any other status stops the retry loop immediately.
    ///
    /// `timeout` applies to ongoing requests; the login call itself
    /// uses a fixed 30s timeout.
    pub async fn login(
        credentials: &Credentials,
        base_url: Url,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(timeout)
            .build()?;

        let url = base_url.join(AUTH_PATH)?;
        let payload = credentials.login_payload();

        debug!(%url, username = %credentials.username, "logging in");

        let mut response = None;
        for attempt in 0..MAX_LOGIN_ATTEMPTS {
            let result = http
                .post(url.clone())
                .headers(login_headers())
                .json(&payload)
                .timeout(LOGIN_TIMEOUT)
                .send()
                .await;

            let resp = match result {
                Ok(resp) => resp,
                Err(e) => {
                    warn!(
                        error = %e,
                        attempt = attempt + 1,
                        "login request failed, backing off"
                    );
                    if attempt + 1 < MAX_LOGIN_ATTEMPTS {
                        tokio::time::sleep(transient_backoff(attempt, BACKOFF_CAP_SECS)).await;
                    }
                    continue;
                }
            };

            let status = resp.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                let delay = rate_limit_backoff(attempt, parse_retry_after(resp.headers()));
                response = Some(resp);
                if attempt + 1 < MAX_LOGIN_ATTEMPTS {
                    warn!(
                        delay_secs = delay.as_secs(),
                        attempt = attempt + 1,
                        "login rate limited (429), retrying"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                warn!("rate limit persisted after {MAX_LOGIN_ATTEMPTS} attempts");
                break;
            }

            if status.is_server_error() {
                response = Some(resp);
                if attempt + 1 < MAX_LOGIN_ATTEMPTS {
                    let delay = transient_backoff(attempt, SERVER_ERROR_CAP_SECS);
                    debug!(
                        status = status.as_u16(),
                        delay_secs = delay.as_secs(),
                        "login hit a server error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                break;
            }

            // Success or a client error -- no point retrying either.
            response = Some(resp);
            break;
        }

        let resp = response.ok_or(Error::NoResponse {
            attempts: MAX_LOGIN_ATTEMPTS,
        })?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status}): {body}"),
            });
        }

        let data: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: e.to_string(),
                body: body.clone(),
            })?;

        // The login payload has carried the token under different
        // names across API revisions.
        let token = ["access_token", "token", "accessToken"]
            .iter()
            .find_map(|key| data.get(key).and_then(|v| v.as_str()))
            .ok_or(Error::MissingToken)?;

        debug!("login successful");

        Ok(Self {
            http,
            base_url,
            bearer_token: token.to_owned(),
            token_created: Utc::now(),
        })
    }

    /// Wrap an existing client and token without performing a login.
    ///
    /// Use this when a token is already at hand (or in tests against a
    /// mock server).
    pub fn with_token(http: reqwest::Client, base_url: Url, token: impl Into<String>) -> Self {
        Self {
            http,
            base_url,
            bearer_token: token.into(),
            token_created: Utc::now(),
        }
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// When the current bearer token was obtained.
    pub fn token_created(&self) -> DateTime<Utc> {
        self.token_created
    }

    // ── Request helpers ──────────────────────────────────────────────

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        self.request(Method::GET, path, None::<&()>, HeaderMap::new())
            .await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        self.request(Method::PATCH, path, Some(body), HeaderMap::new())
            .await
    }

    /// Send an authenticated request and decode the JSON response.
    ///
    /// `extra_headers` merge over the defaults; an explicitly supplied
    /// `Authorization` or `User-Agent` wins over the session's own.
    pub async fn request<T: DeserializeOwned, B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        extra_headers: HeaderMap,
    ) -> Result<T, Error> {
        let url = self.base_url.join(path)?;
        debug!("{method} {url}");

        let mut builder = self
            .http
            .request(method, url)
            .header(AUTHORIZATION, format!("Bearer {}", self.bearer_token))
            .header(CACHE_CONTROL, "no-cache");

        if let Some(body) = body {
            builder = builder.json(body);
        }
        builder = builder.headers(extra_headers);

        let resp = builder.send().await?;
        let status = resp.status();

        if status.is_success() {
            let body = resp.text().await?;
            serde_json::from_str(&body).map_err(|e| {
                let preview = truncate_on_char_boundary(&body, 200);
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(error_from_response(status, resp).await)
        }
    }
}

// ── Response/backoff helpers ─────────────────────────────────────────

/// Map a non-2xx response to the error taxonomy.
async fn error_from_response(status: StatusCode, resp: reqwest::Response) -> Error {
    let retry_after = parse_retry_after(resp.headers());
    let body = resp.text().await.unwrap_or_default();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Authentication {
            message: if body.is_empty() {
                status.to_string()
            } else {
                body
            },
        },
        StatusCode::TOO_MANY_REQUESTS => Error::RateLimited {
            retry_after_secs: retry_after.map_or(0, |d| d.as_secs()),
        },
        _ => Error::Api {
            status: status.as_u16(),
            body,
        },
    }
}

/// Browser-like headers sent with the login request.
fn login_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "accept",
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert("accept-language", HeaderValue::from_static("fr"));
    headers.insert("origin", HeaderValue::from_static("https://app.koolnova.com"));
    headers.insert(
        "referer",
        HeaderValue::from_static("https://app.koolnova.com/"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers
}

/// Truncate to at most `max_bytes`, backing up to a char boundary so
/// multi-byte characters never split.
fn truncate_on_char_boundary(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse::<f64>()
        .ok()
        .filter(|secs| *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

/// Exponential backoff: 2s doubling per attempt, capped.
fn transient_backoff(attempt: u32, cap_secs: f64) -> Duration {
    let secs = BACKOFF_BASE_SECS * 2f64.powi(i32::try_from(attempt).unwrap_or(i32::MAX));
    Duration::from_secs_f64(secs.min(cap_secs))
}

/// Delay after a 429: honor a server hint of at most 60s, otherwise
/// the API's advertised baseline of 32s plus 5s per attempt.
fn rate_limit_backoff(attempt: u32, retry_after: Option<Duration>) -> Duration {
    if let Some(hint) = retry_after {
        if hint.as_secs_f64() <= BACKOFF_CAP_SECS {
            return hint;
        }
    }
    let secs = RATE_LIMIT_BASELINE_SECS + RATE_LIMIT_STEP_SECS * f64::from(attempt);
    Duration::from_secs_f64(secs.min(BACKOFF_CAP_SECS))
}
