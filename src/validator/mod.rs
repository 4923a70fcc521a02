//! Plausibility checks over a consolidated snapshot.
//!
//! `validate` is a pure function: it never mutates the snapshot and touches
//! no clock, so re-validating a snapshot (including one that round-tripped
//! through JSON) always yields the same report. Warnings flag values that
//! are unusual but renderable, including any domain that substituted its
//! fallback this cycle; errors flag values that are structurally invalid
//! and make the snapshot untrustworthy.

use std::ops::RangeInclusive;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    ConsolidatedSnapshot, DataQuality, Domain, DomainData, DomainSnapshot, SnapshotSource,
};

const PLAUSIBLE_VELOCITY_KMH: RangeInclusive<f64> = 25_000.0..=30_000.0;
const PLAUSIBLE_ALTITUDE_KM: RangeInclusive<f64> = 350.0..=450.0;
const PLAUSIBLE_CREW_COUNT: RangeInclusive<u32> = 3..=11;
const PLAUSIBLE_ACTIVE_SATELLITES: RangeInclusive<u32> = 2_000..=60_000;

/// Hard bound of the Kp scale; values outside it are invalid, not unusual.
const KP_BOUND: RangeInclusive<f64> = 0.0..=9.0;

/// A launch still advertised this long after T-0 is a stale schedule.
const STALE_LAUNCH_AFTER_HOURS: i64 = 24;

/// Outcome of validating one consolidated snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Fatal findings; any entry here marks the snapshot invalid.
    pub errors: Vec<String>,
    /// Non-fatal findings; the snapshot stays usable.
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Quality classification derived from the findings.
    pub fn quality(&self) -> DataQuality {
        if !self.errors.is_empty() {
            DataQuality::Low
        } else if !self.warnings.is_empty() {
            DataQuality::Medium
        } else {
            DataQuality::High
        }
    }
}

/// Check every registered domain of `snapshot` against its plausible bands.
///
/// Findings are ordered by domain, so equal snapshots produce equal reports.
pub fn validate(snapshot: &ConsolidatedSnapshot) -> ValidationReport {
    let mut report = ValidationReport::default();
    for domain in Domain::ALL {
        match snapshot.get(domain) {
            Some(snap) if snap.data.domain() != domain => report.errors.push(format!(
                "{}: snapshot carries a {} payload under this key",
                domain.label(),
                snap.data.domain().label()
            )),
            Some(snap) => {
                if snap.source == SnapshotSource::Fallback {
                    report.warnings.push(format!(
                        "{}: fallback value substituted ({})",
                        domain.label(),
                        snap.error.as_deref().unwrap_or("cause not recorded")
                    ));
                }
                check_domain(snap, snapshot.last_updated, &mut report);
            }
            None => report
                .errors
                .push(format!("{}: expected domain missing from snapshot", domain.label())),
        }
    }
    report
}

fn check_domain(snap: &DomainSnapshot, as_of: DateTime<Utc>, report: &mut ValidationReport) {
    match &snap.data {
        DomainData::Orbit(orbit) => {
            if !(-90.0..=90.0).contains(&orbit.latitude) {
                report.errors.push(format!(
                    "orbit: latitude {} outside [-90, 90]",
                    orbit.latitude
                ));
            }
            if !(-180.0..=180.0).contains(&orbit.longitude) {
                report.errors.push(format!(
                    "orbit: longitude {} outside [-180, 180]",
                    orbit.longitude
                ));
            }
            if !PLAUSIBLE_VELOCITY_KMH.contains(&orbit.velocity_kmh) {
                report.warnings.push(format!(
                    "orbit: velocity {} km/h outside plausible band 25000-30000",
                    orbit.velocity_kmh
                ));
            }
            if !PLAUSIBLE_ALTITUDE_KM.contains(&orbit.altitude_km) {
                report.warnings.push(format!(
                    "orbit: altitude {} km outside plausible band 350-450",
                    orbit.altitude_km
                ));
            }
        }
        DomainData::Crew(crew) => {
            if !PLAUSIBLE_CREW_COUNT.contains(&crew.count) {
                report.warnings.push(format!(
                    "crew: headcount {} outside plausible band 3-11",
                    crew.count
                ));
            }
        }
        DomainData::SpaceWeather(weather) => {
            if !KP_BOUND.contains(&weather.kp_index) {
                report.errors.push(format!(
                    "space weather: kp index {} outside bound 0-9",
                    weather.kp_index
                ));
            }
        }
        DomainData::Satellites(census) => {
            if !PLAUSIBLE_ACTIVE_SATELLITES.contains(&census.active) {
                report.warnings.push(format!(
                    "satellites: active count {} outside plausible band 2000-60000",
                    census.active
                ));
            }
        }
        DomainData::MarsSol(mars) => {
            if mars.sol < 0 {
                report
                    .errors
                    .push(format!("mars sol: negative sol number {}", mars.sol));
            }
        }
        DomainData::Launch(launch) => {
            if as_of - launch.launch_at > Duration::hours(STALE_LAUNCH_AFTER_HOURS) {
                report.warnings.push(format!(
                    "launch: {} T-0 passed more than a day ago",
                    launch.mission
                ));
            }
        }
    }
}
