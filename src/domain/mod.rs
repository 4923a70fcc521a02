//! Snapshot data model shared by every layer.
//!
//! A [`DomainSnapshot`] is one fetch result for one dashboard domain; a
//! [`ConsolidatedSnapshot`] is the merged, versioned bundle of all of them,
//! replaced wholesale each refresh cycle. Both are plain immutable values
//! and round-trip through JSON.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A data domain tracked by the dashboard feed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Orbit,
    Crew,
    SpaceWeather,
    Satellites,
    MarsSol,
    Launch,
}

impl Domain {
    /// Every domain a consolidated snapshot is expected to carry.
    pub const ALL: [Domain; 6] = [
        Domain::Orbit,
        Domain::Crew,
        Domain::SpaceWeather,
        Domain::Satellites,
        Domain::MarsSol,
        Domain::Launch,
    ];

    /// Label used in logs and validation messages.
    pub fn label(&self) -> &'static str {
        match self {
            Domain::Orbit => "orbit",
            Domain::Crew => "crew",
            Domain::SpaceWeather => "space weather",
            Domain::Satellites => "satellites",
            Domain::MarsSol => "mars sol",
            Domain::Launch => "launch",
        }
    }
}

/// Provenance of one domain snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    /// Fetched from an upstream API this cycle.
    Live,
    /// Computed locally from a deterministic model.
    Calculated,
    /// Substituted default after a failed or timed-out fetch.
    Fallback,
}

/// Current station position and motion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitalPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_km: f64,
    pub velocity_kmh: f64,
    /// Ground-track distance covered since the previous cycle, when known.
    pub ground_track_km: Option<f64>,
    /// True when the ground track moved more than trivially since last cycle.
    pub moving: bool,
}

/// People currently aboard the station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrewRoster {
    pub count: u32,
    pub names: Vec<String>,
}

/// Kp-like geomagnetic activity index, bounded to [0, 9].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceWeatherIndex {
    pub kp_index: f64,
    pub activity: String,
}

impl SpaceWeatherIndex {
    /// Activity label for an index value.
    pub fn activity_label(kp: f64) -> &'static str {
        match kp {
            k if k < 3.0 => "quiet",
            k if k < 5.0 => "unsettled",
            k if k < 7.0 => "storm",
            _ => "severe storm",
        }
    }
}

/// Simulated census of objects on orbit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteCensus {
    pub active: u32,
    pub tracked_debris: u32,
}

/// Martian season, quartered over the Martian year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarsSeason {
    Spring,
    Summer,
    Autumn,
    Winter,
}

impl MarsSeason {
    /// Rough northern-hemisphere surface temperature for the season, in °C.
    pub fn baseline_temp_c(&self) -> f64 {
        match self {
            MarsSeason::Spring => -55.0,
            MarsSeason::Summer => -40.0,
            MarsSeason::Autumn => -70.0,
            MarsSeason::Winter => -90.0,
        }
    }
}

/// Martian date and weather estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarsSolReport {
    /// Whole sols elapsed since the Mars epoch.
    pub sol: i64,
    pub season: MarsSeason,
    pub est_temp_c: f64,
}

/// Next scheduled launch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchSchedule {
    pub mission: String,
    pub vehicle: Option<String>,
    pub launch_at: DateTime<Utc>,
    /// Seconds until T-0 as of the fetch instant; negative once passed.
    pub countdown_s: i64,
}

/// Payload of a single domain, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainData {
    Orbit(OrbitalPosition),
    Crew(CrewRoster),
    SpaceWeather(SpaceWeatherIndex),
    Satellites(SatelliteCensus),
    MarsSol(MarsSolReport),
    Launch(LaunchSchedule),
}

impl DomainData {
    /// Domain this payload belongs to.
    pub fn domain(&self) -> Domain {
        match self {
            DomainData::Orbit(_) => Domain::Orbit,
            DomainData::Crew(_) => Domain::Crew,
            DomainData::SpaceWeather(_) => Domain::SpaceWeather,
            DomainData::Satellites(_) => Domain::Satellites,
            DomainData::MarsSol(_) => Domain::MarsSol,
            DomainData::Launch(_) => Domain::Launch,
        }
    }
}

/// One fetch result for a single domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainSnapshot {
    pub domain: Domain,
    pub data: DomainData,
    pub source: SnapshotSource,
    pub fetched_at: DateTime<Utc>,
    /// Cause of the fallback substitution, when `source` is `Fallback`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DomainSnapshot {
    /// A successful fetch result.
    pub fn ok(data: DomainData, source: SnapshotSource) -> Self {
        Self {
            domain: data.domain(),
            data,
            source,
            fetched_at: Utc::now(),
            error: None,
        }
    }

    /// A substituted fallback carrying the failure cause.
    pub fn fallback(data: DomainData, error: impl Into<String>) -> Self {
        Self {
            domain: data.domain(),
            data,
            source: SnapshotSource::Fallback,
            fetched_at: Utc::now(),
            error: Some(error.into()),
        }
    }
}

/// Overall plausibility classification of a consolidated snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQuality {
    /// No validation errors or warnings.
    High,
    /// Warnings only.
    Medium,
    /// At least one validation error.
    Low,
}

/// The merged, versioned bundle of all current domain snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedSnapshot {
    /// Strictly increasing per controller instance; starts at 1.
    pub update_id: u64,
    pub last_updated: DateTime<Utc>,
    pub quality: DataQuality,
    /// Provenance summary, e.g. `"3 live, 2 calculated, 1 fallback"`.
    pub source: String,
    pub domains: BTreeMap<Domain, DomainSnapshot>,
}

impl ConsolidatedSnapshot {
    /// Snapshot for one domain, if present.
    pub fn get(&self, domain: Domain) -> Option<&DomainSnapshot> {
        self.domains.get(&domain)
    }

    /// Number of domains that fell back this cycle.
    pub fn fallback_count(&self) -> usize {
        self.domains
            .values()
            .filter(|s| s.source == SnapshotSource::Fallback)
            .count()
    }

    pub fn orbit(&self) -> Option<&OrbitalPosition> {
        match &self.domains.get(&Domain::Orbit)?.data {
            DomainData::Orbit(v) => Some(v),
            _ => None,
        }
    }

    pub fn crew(&self) -> Option<&CrewRoster> {
        match &self.domains.get(&Domain::Crew)?.data {
            DomainData::Crew(v) => Some(v),
            _ => None,
        }
    }

    pub fn space_weather(&self) -> Option<&SpaceWeatherIndex> {
        match &self.domains.get(&Domain::SpaceWeather)?.data {
            DomainData::SpaceWeather(v) => Some(v),
            _ => None,
        }
    }

    pub fn satellites(&self) -> Option<&SatelliteCensus> {
        match &self.domains.get(&Domain::Satellites)?.data {
            DomainData::Satellites(v) => Some(v),
            _ => None,
        }
    }

    pub fn mars_sol(&self) -> Option<&MarsSolReport> {
        match &self.domains.get(&Domain::MarsSol)?.data {
            DomainData::MarsSol(v) => Some(v),
            _ => None,
        }
    }

    pub fn launch(&self) -> Option<&LaunchSchedule> {
        match &self.domains.get(&Domain::Launch)?.data {
            DomainData::Launch(v) => Some(v),
            _ => None,
        }
    }
}
