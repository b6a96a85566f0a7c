// Koolnova API payload types
//
// The API speaks enum-coded strings for modes and fan speeds, and
// replicates project connectivity data onto every zone record under
// `topic_info`. Fields use `#[serde(default)]` liberally because the
// API omits fields it considers irrelevant for a given record.

use serde::{Deserialize, Serialize};

// ── Code-mapped enums ────────────────────────────────────────────────

/// Operating mode of the project controller.
///
/// Wire codes: `"1"` cool, `"2"` off, `"4"` auto, `"6"` heat. Unknown
/// codes round-trip untouched so newer API versions don't break
/// deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProjectMode {
    Cool,
    Off,
    Auto,
    Heat,
    Other(String),
}

impl ProjectMode {
    pub fn code(&self) -> &str {
        match self {
            Self::Cool => "1",
            Self::Off => "2",
            Self::Auto => "4",
            Self::Heat => "6",
            Self::Other(code) => code,
        }
    }
}

impl Default for ProjectMode {
    fn default() -> Self {
        Self::Off
    }
}

impl From<String> for ProjectMode {
    fn from(code: String) -> Self {
        match code.as_str() {
            "1" => Self::Cool,
            "2" => Self::Off,
            "4" => Self::Auto,
            "6" => Self::Heat,
            _ => Self::Other(code),
        }
    }
}

impl From<ProjectMode> for String {
    fn from(mode: ProjectMode) -> Self {
        mode.code().to_owned()
    }
}

/// Per-zone status code, mapped to an HVAC-style mode.
///
/// Wire codes: `"00"` cool, `"01"` heat, `"02"` off, `"03"` auto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ZoneStatus {
    Cool,
    Heat,
    Off,
    Auto,
    Other(String),
}

impl ZoneStatus {
    pub fn code(&self) -> &str {
        match self {
            Self::Cool => "00",
            Self::Heat => "01",
            Self::Off => "02",
            Self::Auto => "03",
            Self::Other(code) => code,
        }
    }
}

impl Default for ZoneStatus {
    fn default() -> Self {
        Self::Off
    }
}

impl From<String> for ZoneStatus {
    fn from(code: String) -> Self {
        match code.as_str() {
            "00" => Self::Cool,
            "01" => Self::Heat,
            "02" => Self::Off,
            "03" => Self::Auto,
            _ => Self::Other(code),
        }
    }
}

impl From<ZoneStatus> for String {
    fn from(status: ZoneStatus) -> Self {
        status.code().to_owned()
    }
}

/// Zone fan speed. Wire codes: `"1"` low, `"2"` medium, `"3"` high,
/// `"4"` auto.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FanSpeed {
    Low,
    Medium,
    High,
    Auto,
    Other(String),
}

impl FanSpeed {
    pub fn code(&self) -> &str {
        match self {
            Self::Low => "1",
            Self::Medium => "2",
            Self::High => "3",
            Self::Auto => "4",
            Self::Other(code) => code,
        }
    }
}

impl Default for FanSpeed {
    fn default() -> Self {
        Self::Auto
    }
}

impl From<String> for FanSpeed {
    fn from(code: String) -> Self {
        match code.as_str() {
            "1" => Self::Low,
            "2" => Self::Medium,
            "3" => Self::High,
            "4" => Self::Auto,
            _ => Self::Other(code),
        }
    }
}

impl From<FanSpeed> for String {
    fn from(speed: FanSpeed) -> Self {
        speed.code().to_owned()
    }
}

// ── Entities ─────────────────────────────────────────────────────────

/// The parent controller aggregating all zones under one account.
///
/// Returned by `GET /topics/` as a JSON array; the partial-update
/// endpoint (`PATCH /topics/{id}/`) echoes the same field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(rename = "id")]
    pub topic_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mode: ProjectMode,
    #[serde(default)]
    pub is_online: bool,
    #[serde(default)]
    pub eco: bool,
    #[serde(default)]
    pub is_stop: bool,
    /// ISO-8601 timestamp of the controller's last cloud sync, kept
    /// as received.
    #[serde(default)]
    pub last_sync: Option<String>,
}

/// Project connectivity snapshot replicated onto every zone record by
/// the API under `topic_info`.
///
/// This is project-scoped shared data riding on the zone payload, not
/// a per-zone property. Upstream duplicates it identically across all
/// zones of a project; do not rely on that holding across API versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicLink {
    #[serde(rename = "id")]
    pub topic_id: i64,
    #[serde(default)]
    pub is_online: bool,
    /// Signal strength of the controller's uplink.
    #[serde(default)]
    pub rssi: Option<i64>,
    #[serde(default)]
    pub last_sync: Option<String>,
    #[serde(default)]
    pub device_reference: Option<String>,
}

/// One controllable room/thermostat.
///
/// Returned by `GET /devices/` as a JSON array; `PATCH /devices/{id}/`
/// returns the authoritative post-update representation in the same
/// shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    #[serde(rename = "id")]
    pub room_id: i64,
    #[serde(default)]
    pub name: String,
    /// Measured temperature in Celsius. Absent while the sensor has
    /// not reported yet.
    #[serde(default, rename = "temperature")]
    pub current_temperature: Option<f64>,
    #[serde(default, rename = "setpoint_temperature")]
    pub target_temperature: f64,
    #[serde(default)]
    pub status: ZoneStatus,
    #[serde(default, rename = "speed")]
    pub fan_speed: FanSpeed,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default, rename = "topic_info")]
    pub topic: Option<TopicLink>,
}

// ── Partial update bodies ────────────────────────────────────────────

/// Partial body for `PATCH /devices/{id}/`. Only the fields actually
/// set are serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ZonePatch {
    #[serde(rename = "setpoint_temperature", skip_serializing_if = "Option::is_none")]
    pub target_temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ZoneStatus>,
    #[serde(rename = "speed", skip_serializing_if = "Option::is_none")]
    pub fan_speed: Option<FanSpeed>,
}

impl ZonePatch {
    pub fn setpoint(temperature: f64) -> Self {
        Self {
            target_temperature: Some(temperature),
            ..Self::default()
        }
    }

    pub fn status(status: ZoneStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn fan_speed(speed: FanSpeed) -> Self {
        Self {
            fan_speed: Some(speed),
            ..Self::default()
        }
    }
}

/// Partial body for `PATCH /topics/{id}/`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ProjectMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eco: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_stop: Option<bool>,
}

impl ProjectPatch {
    pub fn mode(mode: ProjectMode) -> Self {
        Self {
            mode: Some(mode),
            ..Self::default()
        }
    }

    pub fn eco(eco: bool) -> Self {
        Self {
            eco: Some(eco),
            ..Self::default()
        }
    }

    pub fn stop(stop: bool) -> Self {
        Self {
            is_stop: Some(stop),
            ..Self::default()
        }
    }
}

/// Response of `PATCH /topics/{id}/`.
///
/// The API echoes only the fields affected by the update, so every
/// field is optional -- a cache merge must touch exactly the fields
/// that are present.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProjectUpdate {
    #[serde(default)]
    pub mode: Option<ProjectMode>,
    #[serde(default)]
    pub is_online: Option<bool>,
    #[serde(default)]
    pub eco: Option<bool>,
    #[serde(default)]
    pub is_stop: Option<bool>,
    #[serde(default)]
    pub last_sync: Option<String>,
}
