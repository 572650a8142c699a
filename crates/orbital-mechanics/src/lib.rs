//! Orbital Mechanics Library
//!
//! SGP4 propagation, Earth-fixed coordinate transforms and ground/inter-satellite
//! look geometry used by the contact plan designer.

use chrono::{DateTime, TimeZone, Utc};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrbitalError {
    #[error("Invalid TLE format: {0}")]
    InvalidTle(String),
    #[error("Propagation failed: {0}")]
    PropagationFailed(String),
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),
}

pub type Result<T> = std::result::Result<T, OrbitalError>;

/// TEME state vector (km, km/s) at a given epoch
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StateVector {
    pub position_x: f64,
    pub position_y: f64,
    pub position_z: f64,
    pub velocity_x: f64,
    pub velocity_y: f64,
    pub velocity_z: f64,
    pub epoch: DateTime<Utc>,
}

impl StateVector {
    pub fn position(&self) -> Vector3<f64> {
        Vector3::new(self.position_x, self.position_y, self.position_z)
    }
}

/// WGS84 geodetic position. Angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_km: f64,
}

/// Convert a unix timestamp (seconds) into a UTC datetime.
pub fn unix_to_utc(unix_s: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(unix_s, 0)
        .single()
        .ok_or_else(|| OrbitalError::InvalidCoordinates(format!("timestamp out of range: {}", unix_s)))
}

pub mod propagation {
    use super::*;

    /// A parsed two-line element set ready for repeated propagation.
    pub struct Propagator {
        constants: sgp4::Constants,
        epoch: DateTime<Utc>,
    }

    impl std::fmt::Debug for Propagator {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("Propagator").field("epoch", &self.epoch).finish()
        }
    }

    impl Propagator {
        pub fn from_tle(tle_line1: &str, tle_line2: &str) -> Result<Self> {
            let elements = sgp4::Elements::from_tle(
                None,
                tle_line1.trim().as_bytes(),
                tle_line2.trim().as_bytes(),
            )
            .map_err(|e| OrbitalError::InvalidTle(format!("{:?}", e)))?;

            let constants = sgp4::Constants::from_elements(&elements)
                .map_err(|e| OrbitalError::PropagationFailed(format!("{:?}", e)))?;

            let epoch = DateTime::<Utc>::from_naive_utc_and_offset(elements.datetime, Utc);

            Ok(Self { constants, epoch })
        }

        /// Element set epoch
        pub fn epoch(&self) -> DateTime<Utc> {
            self.epoch
        }

        pub fn propagate(&self, time: DateTime<Utc>) -> Result<StateVector> {
            let duration = time.signed_duration_since(self.epoch);
            let minutes_since_epoch = duration.num_milliseconds() as f64 / 60_000.0;

            let prediction = self
                .constants
                .propagate(minutes_since_epoch)
                .map_err(|e| OrbitalError::PropagationFailed(format!("{:?}", e)))?;

            Ok(StateVector {
                position_x: prediction.position[0],
                position_y: prediction.position[1],
                position_z: prediction.position[2],
                velocity_x: prediction.velocity[0],
                velocity_y: prediction.velocity[1],
                velocity_z: prediction.velocity[2],
                epoch: time,
            })
        }

        /// Earth-fixed position (km) at `time`
        pub fn ecef_position(&self, time: DateTime<Utc>) -> Result<Vector3<f64>> {
            let state = self.propagate(time)?;
            Ok(transforms::teme_to_ecef(&state.position(), time))
        }
    }
}

pub mod transforms {
    use super::*;
    use std::f64::consts::TAU;

    pub const EARTH_RADIUS_KM: f64 = 6378.137;
    pub const EARTH_FLATTENING: f64 = 1.0 / 298.257223563;

    const UNIX_EPOCH_JD: f64 = 2_440_587.5;
    const J2000_JD: f64 = 2_451_545.0;
    const SECONDS_PER_DAY: f64 = 86_400.0;

    fn eccentricity_squared() -> f64 {
        2.0 * EARTH_FLATTENING - EARTH_FLATTENING * EARTH_FLATTENING
    }

    pub fn julian_date(time: DateTime<Utc>) -> f64 {
        let seconds = time.timestamp() as f64 + f64::from(time.timestamp_subsec_millis()) / 1000.0;
        seconds / SECONDS_PER_DAY + UNIX_EPOCH_JD
    }

    /// Greenwich mean sidereal time (IAU 1982), radians in [0, 2π)
    pub fn gmst(time: DateTime<Utc>) -> f64 {
        let t = (julian_date(time) - J2000_JD) / 36_525.0;
        let seconds = 67_310.548_41
            + (876_600.0 * 3600.0 + 8_640_184.812_866) * t
            + 0.093_104 * t * t
            - 6.2e-6 * t * t * t;
        (seconds % SECONDS_PER_DAY * TAU / SECONDS_PER_DAY).rem_euclid(TAU)
    }

    /// Rotate a TEME position into the Earth-fixed frame (polar motion ignored)
    pub fn teme_to_ecef(teme: &Vector3<f64>, time: DateTime<Utc>) -> Vector3<f64> {
        let theta = gmst(time);
        let (sin_t, cos_t) = theta.sin_cos();
        Vector3::new(
            cos_t * teme.x + sin_t * teme.y,
            -sin_t * teme.x + cos_t * teme.y,
            teme.z,
        )
    }

    pub fn geodetic_to_ecef(pos: &GeodeticPosition) -> Result<Vector3<f64>> {
        if !(-90.0..=90.0).contains(&pos.latitude) || !pos.latitude.is_finite() {
            return Err(OrbitalError::InvalidCoordinates(format!("latitude {}", pos.latitude)));
        }
        if !(-180.0..=180.0).contains(&pos.longitude) || !pos.longitude.is_finite() {
            return Err(OrbitalError::InvalidCoordinates(format!("longitude {}", pos.longitude)));
        }

        let lat_rad = pos.latitude.to_radians();
        let lon_rad = pos.longitude.to_radians();
        let alt = pos.altitude_km;
        let e2 = eccentricity_squared();

        let n = EARTH_RADIUS_KM / (1.0 - e2 * lat_rad.sin().powi(2)).sqrt();

        let x = (n + alt) * lat_rad.cos() * lon_rad.cos();
        let y = (n + alt) * lat_rad.cos() * lon_rad.sin();
        let z = (n * (1.0 - e2) + alt) * lat_rad.sin();

        Ok(Vector3::new(x, y, z))
    }

    /// Earth-fixed position to geodetic sub-point (iterative latitude solution)
    pub fn ecef_to_geodetic(ecef: &Vector3<f64>) -> GeodeticPosition {
        let e2 = eccentricity_squared();
        let p = (ecef.x * ecef.x + ecef.y * ecef.y).sqrt();
        let longitude = ecef.y.atan2(ecef.x);

        let mut latitude = ecef.z.atan2(p * (1.0 - e2));
        let mut n = EARTH_RADIUS_KM;
        for _ in 0..6 {
            n = EARTH_RADIUS_KM / (1.0 - e2 * latitude.sin().powi(2)).sqrt();
            latitude = (ecef.z + e2 * n * latitude.sin()).atan2(p);
        }

        let altitude_km = if latitude.cos().abs() > 1e-9 {
            p / latitude.cos() - n
        } else {
            ecef.z.abs() - n * (1.0 - e2)
        };

        GeodeticPosition {
            latitude: latitude.to_degrees(),
            longitude: longitude.to_degrees(),
            altitude_km,
        }
    }
}

pub mod geometry {
    use super::*;

    /// Topocentric look angles from an observer to a target
    #[derive(Debug, Clone, Copy, Serialize, Deserialize)]
    pub struct LookAngles {
        pub azimuth_deg: f64,
        pub elevation_deg: f64,
        pub range_km: f64,
    }

    /// Look angles from a ground observer to an Earth-fixed target position.
    ///
    /// Uses the geodetic normal at the observer as the local "up".
    pub fn look_angles(observer: &GeodeticPosition, target_ecef: &Vector3<f64>) -> Result<LookAngles> {
        let observer_ecef = transforms::geodetic_to_ecef(observer)?;
        let range = target_ecef - observer_ecef;
        let range_km = range.norm();

        let (sin_lat, cos_lat) = observer.latitude.to_radians().sin_cos();
        let (sin_lon, cos_lon) = observer.longitude.to_radians().sin_cos();

        // East-North-Up rotation
        let east = -sin_lon * range.x + cos_lon * range.y;
        let north = -sin_lat * cos_lon * range.x - sin_lat * sin_lon * range.y + cos_lat * range.z;
        let up = cos_lat * cos_lon * range.x + cos_lat * sin_lon * range.y + sin_lat * range.z;

        let azimuth_deg = east.atan2(north).to_degrees().rem_euclid(360.0);
        let horiz_range = (east * east + north * north).sqrt();
        let elevation_deg = up.atan2(horiz_range).to_degrees();

        Ok(LookAngles {
            azimuth_deg,
            elevation_deg,
            range_km,
        })
    }

    /// Straight-line distance between two positions in the same frame (km)
    pub fn line_of_sight_range_km(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
        (a - b).norm()
    }
}
