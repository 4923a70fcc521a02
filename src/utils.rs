//! Pure math behind the calculated fetchers.
//!
//! Everything here is deterministic for a given instant, so the simulated
//! domains are reproducible in tests and across restarts.

use std::f64::consts::TAU;

use chrono::{DateTime, Datelike, Utc};

use crate::domain::MarsSeason;

/// Duration of one Martian sol in milliseconds.
pub const MARS_SOL_MS: i64 = 88_775_244;

/// Sols per Martian year.
pub const SOLS_PER_MARS_YEAR: f64 = 668.6;

/// Mars sol-count epoch, 1873-12-29T12:00:00Z, as Unix milliseconds.
pub const MARS_EPOCH_UNIX_MS: i64 = -3_029_659_200_000;

/// Census model epoch, 2024-01-01T00:00:00Z, as Unix seconds.
const CENSUS_EPOCH_UNIX_S: i64 = 1_704_067_200;

/// Calculate distance between two coordinates using the Haversine formula.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let rlat1 = lat1.to_radians();
    let rlat2 = lat2.to_radians();
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + rlat1.cos() * rlat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    6371.0 * c
}

/// Whole sols elapsed at `at` since the Mars epoch.
pub fn mars_sol_number(at: DateTime<Utc>) -> i64 {
    (at.timestamp_millis() - MARS_EPOCH_UNIX_MS).div_euclid(MARS_SOL_MS)
}

/// Season for a sol: the Martian-year fraction quartered into four bins.
pub fn mars_season(sol: i64) -> MarsSeason {
    let frac = (sol as f64 / SOLS_PER_MARS_YEAR).rem_euclid(1.0);
    if frac < 0.25 {
        MarsSeason::Spring
    } else if frac < 0.5 {
        MarsSeason::Summer
    } else if frac < 0.75 {
        MarsSeason::Autumn
    } else {
        MarsSeason::Winter
    }
}

/// Kp-like geomagnetic index for an instant, clamped to [0, 9].
///
/// A smooth annual curve plus a 27-day solar-rotation term, with bounded
/// hourly jitter so consecutive readings wander a little.
pub fn kp_index_at(at: DateTime<Utc>) -> f64 {
    let doy = at.ordinal() as f64;
    let annual = (doy / 365.25 * TAU).sin() * 1.4;
    let rotation = (doy / 27.0 * TAU).sin() * 0.9;
    let jitter = (noise(at.timestamp().div_euclid(3600) as u64) - 0.5) * 1.5;
    let kp = (3.1 + annual + rotation + jitter).clamp(0.0, 9.0);
    (kp * 10.0).round() / 10.0
}

/// Simulated on-orbit census for an instant: `(active, tracked_debris)`.
///
/// Base constellation sizes plus slow linear growth and bounded daily jitter.
pub fn satellite_census_at(at: DateTime<Utc>) -> (u32, u32) {
    let days = (at.timestamp() - CENSUS_EPOCH_UNIX_S).div_euclid(86_400);
    let j1 = ((noise(days as u64) - 0.5) * 70.0) as i64;
    let j2 = ((noise(days as u64 ^ 0xDEB2_15) - 0.5) * 120.0) as i64;
    let active = (9_300 + days * 2 + j1).max(0) as u32;
    let debris = (28_900 + days * 3 + j2).max(0) as u32;
    (active, debris)
}

/// Deterministic noise in [0, 1) for a seed (splitmix64 finalizer).
pub fn noise(seed: u64) -> f64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z >> 11) as f64 / (1u64 << 53) as f64
}
