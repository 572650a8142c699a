//! Constellation nodes: satellites, ground stations and mission targets

use crate::{invalid, ModelError, Result};
use orbital_mechanics::propagation::Propagator;
use orbital_mechanics::GeodeticPosition;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Satellite,
    GroundStation,
    Target,
}

impl NodeRole {
    /// Satellites and ground stations carry data onward; targets only
    /// produce or consume payloads.
    pub fn is_relay(&self) -> bool {
        matches!(self, NodeRole::Satellite | NodeRole::GroundStation)
    }
}

/// A satellite with its two-line orbital elements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Satellite {
    pub id: String,
    pub node: u32,
    pub tle1: String,
    pub tle2: String,
}

impl Satellite {
    pub fn propagator(&self) -> Result<Propagator> {
        Propagator::from_tle(&self.tle1, &self.tle2).map_err(|e| ModelError::InvalidTle {
            id: self.id.clone(),
            reason: e.to_string(),
        })
    }
}

/// A fixed node on the ground: a station or a mission target.
///
/// `alt` is in meters above the ellipsoid. Targets may omit `node` when
/// they are not addressable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroundNode {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<u32>,
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
}

impl GroundNode {
    pub fn position(&self) -> GeodeticPosition {
        GeodeticPosition {
            latitude: self.lat,
            longitude: self.lon,
            altitude_km: self.alt / 1000.0,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !is_valid_latitude(self.lat) {
            return Err(invalid(format!("{}.lat", self.id), format!("{} out of range", self.lat)));
        }
        if !is_valid_longitude(self.lon) {
            return Err(invalid(format!("{}.lon", self.id), format!("{} out of range", self.lon)));
        }
        if !self.alt.is_finite() {
            return Err(invalid(format!("{}.alt", self.id), "not finite"));
        }
        Ok(())
    }
}

fn is_valid_latitude(lat: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && lat.is_finite()
}

fn is_valid_longitude(lon: f64) -> bool {
    (-180.0..=180.0).contains(&lon) && lon.is_finite()
}
