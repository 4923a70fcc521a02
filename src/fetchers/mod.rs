//! Domain fetchers: one per dashboard domain.
//!
//! Live fetchers wrap one upstream API each; calculated fetchers run a
//! deterministic local model. Every fetcher also defines the fallback
//! payload substituted when its fetch fails or times out. Substitution
//! itself happens in `crate::aggregator`, so implementations here are free
//! to use `?` and stay simple.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};

use crate::clients::{AstrosResponse, CrewClient, IssClient, LaunchClient, NextLaunch};
use crate::config::AppConfig;
use crate::domain::{
    CrewRoster, Domain, DomainData, DomainSnapshot, LaunchSchedule, MarsSolReport,
    OrbitalPosition, SatelliteCensus, SnapshotSource, SpaceWeatherIndex,
};
use crate::errors::FetchResult;
use crate::utils;

/// Crew count substituted when the roster API is unreachable.
const FALLBACK_CREW_COUNT: u32 = 7;

/// Ground-track delta below which the station is reported as not moving, km.
const MOVEMENT_THRESHOLD_KM: f64 = 0.1;

/// A source of one dashboard domain's data.
///
/// Implementations never handle their own failure: the aggregator bounds
/// every call with a timeout and substitutes [`DomainFetcher::fallback`] on
/// any error.
#[async_trait]
pub trait DomainFetcher: Send + Sync {
    /// Domain this fetcher produces.
    fn domain(&self) -> Domain;

    /// Provenance tag for a successful fetch.
    fn origin(&self) -> SnapshotSource;

    /// Produce the current payload. `prev` is this domain's snapshot from
    /// the previous cycle, when one exists.
    async fn fetch(&self, prev: Option<DomainSnapshot>) -> FetchResult<DomainData>;

    /// Defined substitute payload used when `fetch` fails or times out.
    fn fallback(&self) -> DomainData;
}

/// Live station position from wheretheiss.at.
pub struct OrbitFetcher {
    client: IssClient,
}

impl OrbitFetcher {
    pub fn new(client: IssClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DomainFetcher for OrbitFetcher {
    fn domain(&self) -> Domain {
        Domain::Orbit
    }

    fn origin(&self) -> SnapshotSource {
        SnapshotSource::Live
    }

    async fn fetch(&self, prev: Option<DomainSnapshot>) -> FetchResult<DomainData> {
        let pos = self.client.fetch_position().await?;

        // A substituted fallback position would fake a huge ground track.
        let prev_orbit = prev
            .filter(|s| s.source != SnapshotSource::Fallback)
            .and_then(|s| match s.data {
                DomainData::Orbit(o) => Some(o),
                _ => None,
            });
        let ground_track_km = prev_orbit
            .map(|p| utils::haversine_km(p.latitude, p.longitude, pos.latitude, pos.longitude));
        let moving = ground_track_km.map_or(false, |d| d > MOVEMENT_THRESHOLD_KM);

        Ok(DomainData::Orbit(OrbitalPosition {
            latitude: pos.latitude,
            longitude: pos.longitude,
            altitude_km: pos.altitude,
            velocity_kmh: pos.velocity,
            ground_track_km,
            moving,
        }))
    }

    fn fallback(&self) -> DomainData {
        DomainData::Orbit(OrbitalPosition {
            latitude: 0.0,
            longitude: 0.0,
            altitude_km: 420.0,
            velocity_kmh: 27_600.0,
            ground_track_km: None,
            moving: false,
        })
    }
}

/// Live crew roster from open-notify.
pub struct CrewFetcher {
    client: CrewClient,
}

impl CrewFetcher {
    pub fn new(client: CrewClient) -> Self {
        Self { client }
    }
}

/// Reduce the everyone-in-space roster to the station's own crew.
///
/// When no entry is attributed to the ISS (craft naming drift upstream),
/// the total headcount is used so the widget still shows something real.
fn station_roster(resp: &AstrosResponse) -> CrewRoster {
    let names: Vec<String> = resp
        .people
        .iter()
        .filter(|p| p.craft == "ISS")
        .map(|p| p.name.clone())
        .collect();

    if names.is_empty() {
        CrewRoster {
            count: resp.number,
            names,
        }
    } else {
        CrewRoster {
            count: names.len() as u32,
            names,
        }
    }
}

#[async_trait]
impl DomainFetcher for CrewFetcher {
    fn domain(&self) -> Domain {
        Domain::Crew
    }

    fn origin(&self) -> SnapshotSource {
        SnapshotSource::Live
    }

    async fn fetch(&self, _prev: Option<DomainSnapshot>) -> FetchResult<DomainData> {
        let roster = self.client.fetch_roster().await?;
        Ok(DomainData::Crew(station_roster(&roster)))
    }

    fn fallback(&self) -> DomainData {
        DomainData::Crew(CrewRoster {
            count: FALLBACK_CREW_COUNT,
            names: Vec::new(),
        })
    }
}

/// Calculated geomagnetic index; no upstream call.
pub struct SpaceWeatherFetcher;

#[async_trait]
impl DomainFetcher for SpaceWeatherFetcher {
    fn domain(&self) -> Domain {
        Domain::SpaceWeather
    }

    fn origin(&self) -> SnapshotSource {
        SnapshotSource::Calculated
    }

    async fn fetch(&self, _prev: Option<DomainSnapshot>) -> FetchResult<DomainData> {
        let kp = utils::kp_index_at(Utc::now());
        Ok(DomainData::SpaceWeather(SpaceWeatherIndex {
            kp_index: kp,
            activity: SpaceWeatherIndex::activity_label(kp).to_string(),
        }))
    }

    fn fallback(&self) -> DomainData {
        DomainData::SpaceWeather(SpaceWeatherIndex {
            kp_index: 2.0,
            activity: SpaceWeatherIndex::activity_label(2.0).to_string(),
        })
    }
}

/// Calculated on-orbit census; no upstream call.
pub struct SatelliteCensusFetcher;

#[async_trait]
impl DomainFetcher for SatelliteCensusFetcher {
    fn domain(&self) -> Domain {
        Domain::Satellites
    }

    fn origin(&self) -> SnapshotSource {
        SnapshotSource::Calculated
    }

    async fn fetch(&self, _prev: Option<DomainSnapshot>) -> FetchResult<DomainData> {
        let (active, tracked_debris) = utils::satellite_census_at(Utc::now());
        Ok(DomainData::Satellites(SatelliteCensus {
            active,
            tracked_debris,
        }))
    }

    fn fallback(&self) -> DomainData {
        DomainData::Satellites(SatelliteCensus {
            active: 9_300,
            tracked_debris: 28_900,
        })
    }
}

/// Calculated Martian date and weather estimate; no upstream call.
pub struct MarsSolFetcher;

impl MarsSolFetcher {
    fn report_at(at: chrono::DateTime<Utc>) -> MarsSolReport {
        let sol = utils::mars_sol_number(at);
        let season = utils::mars_season(sol);
        let wobble = (utils::noise(sol as u64) - 0.5) * 8.0;
        let est_temp_c = ((season.baseline_temp_c() + wobble) * 10.0).round() / 10.0;
        MarsSolReport {
            sol,
            season,
            est_temp_c,
        }
    }
}

#[async_trait]
impl DomainFetcher for MarsSolFetcher {
    fn domain(&self) -> Domain {
        Domain::MarsSol
    }

    fn origin(&self) -> SnapshotSource {
        SnapshotSource::Calculated
    }

    async fn fetch(&self, _prev: Option<DomainSnapshot>) -> FetchResult<DomainData> {
        Ok(DomainData::MarsSol(Self::report_at(Utc::now())))
    }

    fn fallback(&self) -> DomainData {
        DomainData::MarsSol(MarsSolReport {
            sol: 0,
            season: crate::domain::MarsSeason::Spring,
            est_temp_c: -60.0,
        })
    }
}

/// Live next-launch schedule from the SpaceX v4 API.
pub struct LaunchFetcher {
    client: LaunchClient,
}

impl LaunchFetcher {
    pub fn new(client: LaunchClient) -> Self {
        Self { client }
    }
}

/// Derive the countdown-carrying schedule from a raw launch record.
fn schedule_from(launch: NextLaunch, now: chrono::DateTime<Utc>) -> LaunchSchedule {
    let countdown_s = (launch.date_utc - now).num_seconds();
    LaunchSchedule {
        mission: launch.name,
        vehicle: launch.rocket,
        launch_at: launch.date_utc,
        countdown_s,
    }
}

#[async_trait]
impl DomainFetcher for LaunchFetcher {
    fn domain(&self) -> Domain {
        Domain::Launch
    }

    fn origin(&self) -> SnapshotSource {
        SnapshotSource::Live
    }

    async fn fetch(&self, _prev: Option<DomainSnapshot>) -> FetchResult<DomainData> {
        let launch = self.client.fetch_next().await?;
        Ok(DomainData::Launch(schedule_from(launch, Utc::now())))
    }

    fn fallback(&self) -> DomainData {
        let launch_at = Utc::now() + ChronoDuration::days(3);
        DomainData::Launch(LaunchSchedule {
            mission: "Next launch (schedule unavailable)".to_string(),
            vehicle: None,
            launch_at,
            countdown_s: 3 * 86_400,
        })
    }
}

/// Build the production fetcher set from configuration.
pub fn default_fetchers(config: &AppConfig) -> FetchResult<Vec<Arc<dyn DomainFetcher>>> {
    let timeout = config.refresh.fetch_timeout;
    Ok(vec![
        Arc::new(OrbitFetcher::new(IssClient::new(
            config.endpoints.where_iss_url.clone(),
            timeout,
        )?)),
        Arc::new(CrewFetcher::new(CrewClient::new(
            config.endpoints.astros_url.clone(),
            timeout,
        )?)),
        Arc::new(SpaceWeatherFetcher),
        Arc::new(SatelliteCensusFetcher),
        Arc::new(MarsSolFetcher),
        Arc::new(LaunchFetcher::new(LaunchClient::new(
            config.endpoints.spacex_next_launch_url.clone(),
            timeout,
        )?)),
    ])
}
