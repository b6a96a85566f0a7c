// ── Bulk zone commands ──

use koolnova_api::{FanSpeed, ZonePatch, ZoneStatus};

/// One command applied to every zone by
/// [`Coordinator::apply_to_all_zones`](crate::Coordinator::apply_to_all_zones).
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneCommand {
    /// Set the target temperature, Celsius.
    Setpoint(f64),
    /// Set the zone status (HVAC mode).
    Status(ZoneStatus),
    /// Set the fan speed.
    FanSpeed(FanSpeed),
}

impl ZoneCommand {
    /// The partial update body this command sends per zone.
    pub(crate) fn to_patch(&self) -> ZonePatch {
        match self {
            Self::Setpoint(temperature) => ZonePatch::setpoint(*temperature),
            Self::Status(status) => ZonePatch::status(status.clone()),
            Self::FanSpeed(speed) => ZonePatch::fan_speed(speed.clone()),
        }
    }
}

/// Outcome of a best-effort bulk update.
///
/// Partial success is a normal result, not an error: callers decide
/// whether `failed > 0` warrants surfacing. Already-applied zones are
/// never rolled back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub updated: usize,
    pub failed: usize,
}
