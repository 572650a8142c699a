//! Visibility computer
//!
//! Samples every satellite over the scenario grid and records its
//! sub-satellite point plus one line-of-sight flag per peer:
//!
//! - station / target: elevation above the peer's horizon > `min_elevation_deg`
//! - satellite: `0 < range < max_isl_range_km` (a satellite never sees itself)
//!
//! Rows are ordered node-major: all times of the first satellite, then the
//! next one. Peers are ordered stations, targets, satellites.

use crate::config::VisibilityConfig;
use crate::{PlanError, Result};
use mission_model::{ModelError, Scenario};
use orbital_mechanics::geometry::{line_of_sight_range_km, look_angles};
use orbital_mechanics::transforms::ecef_to_geodetic;
use orbital_mechanics::unix_to_utc;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

const FIXED_COLUMNS: [&str; 5] = ["node", "time", "lat", "lon", "alt"];

/// One satellite at one sample time. `alt` in meters.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSample {
    pub node: String,
    pub time: i64,
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
    /// Indexed like [`Tracks::peers`]
    pub visibility: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tracks {
    nodes: Vec<String>,
    times: Vec<i64>,
    peers: Vec<String>,
    samples: Vec<TrackSample>,
}

impl Tracks {
    /// Assemble a table, checking it is a complete node-major grid
    pub fn from_samples(peers: Vec<String>, samples: Vec<TrackSample>) -> Result<Self> {
        let mut nodes: Vec<String> = Vec::new();
        for sample in &samples {
            if nodes.last() != Some(&sample.node) {
                if nodes.contains(&sample.node) {
                    return Err(PlanError::MalformedTracks(format!(
                        "rows of node {} are not contiguous",
                        sample.node
                    )));
                }
                nodes.push(sample.node.clone());
            }
        }

        let times: Vec<i64> = match nodes.first() {
            Some(first) => samples
                .iter()
                .take_while(|s| &s.node == first)
                .map(|s| s.time)
                .collect(),
            None => Vec::new(),
        };
        if times.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PlanError::MalformedTracks("sample times must increase".into()));
        }
        if samples.len() != nodes.len() * times.len() {
            return Err(PlanError::MalformedTracks(format!(
                "expected {} rows for {} nodes over {} samples, found {}",
                nodes.len() * times.len(),
                nodes.len(),
                times.len(),
                samples.len()
            )));
        }
        for (i, sample) in samples.iter().enumerate() {
            if sample.time != times[i % times.len()] {
                return Err(PlanError::MalformedTracks(format!(
                    "node {} is sampled at {} where {} was expected",
                    sample.node,
                    sample.time,
                    times[i % times.len()]
                )));
            }
            if sample.visibility.len() != peers.len() {
                return Err(PlanError::MalformedTracks(format!(
                    "row {} has {} visibility flags for {} peers",
                    i,
                    sample.visibility.len(),
                    peers.len()
                )));
            }
        }

        Ok(Self {
            nodes,
            times,
            peers,
            samples,
        })
    }

    /// Satellite ids, in row order
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    pub fn times(&self) -> &[i64] {
        &self.times
    }

    pub fn peers(&self) -> &[String] {
        &self.peers
    }

    pub fn samples(&self) -> &[TrackSample] {
        &self.samples
    }

    pub fn sample(&self, node: usize, time: usize) -> &TrackSample {
        &self.samples[node * self.times.len() + time]
    }

    /// Peers that are not sampled themselves: stations and targets
    pub fn fixed_peers(&self) -> HashSet<&str> {
        let nodes: HashSet<&str> = self.nodes.iter().map(String::as_str).collect();
        self.peers
            .iter()
            .map(String::as_str)
            .filter(|p| !nodes.contains(p))
            .collect()
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = csv::Writer::from_path(path)?;

        let header = FIXED_COLUMNS
            .iter()
            .copied()
            .chain(self.peers.iter().map(String::as_str));
        writer.write_record(header)?;

        for sample in &self.samples {
            let mut record = vec![
                sample.node.clone(),
                sample.time.to_string(),
                sample.lat.to_string(),
                sample.lon.to_string(),
                sample.alt.to_string(),
            ];
            record.extend(sample.visibility.iter().map(|v| v.to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;

        info!("Wrote {} track rows to {:?}", self.samples.len(), path);
        Ok(())
    }

    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading tracks from {:?}", path);

        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        if headers.len() < FIXED_COLUMNS.len()
            || headers.iter().zip(FIXED_COLUMNS).any(|(h, expected)| h != expected)
        {
            return Err(PlanError::MalformedTracks(format!(
                "header must start with {}",
                FIXED_COLUMNS.join(",")
            )));
        }
        let peers: Vec<String> = headers.iter().skip(FIXED_COLUMNS.len()).map(String::from).collect();

        let mut samples = Vec::new();
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let field = |i: usize| record.get(i).unwrap_or_default();
            let visibility = (FIXED_COLUMNS.len()..record.len())
                .map(|i| parse_flag(field(i), row))
                .collect::<Result<Vec<_>>>()?;
            samples.push(TrackSample {
                node: field(0).to_string(),
                time: parse_number(field(1), "time", row)?,
                lat: parse_number(field(2), "lat", row)?,
                lon: parse_number(field(3), "lon", row)?,
                alt: parse_number(field(4), "alt", row)?,
                visibility,
            });
        }

        Self::from_samples(peers, samples)
    }
}

fn parse_number<T: std::str::FromStr>(value: &str, column: &str, row: usize) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| PlanError::MalformedTracks(format!("row {}: bad {} value {:?}", row, column, value)))
}

fn parse_flag(value: &str, row: usize) -> Result<bool> {
    match value.trim() {
        "true" | "True" | "1" => Ok(true),
        "false" | "False" | "0" => Ok(false),
        other => Err(PlanError::MalformedTracks(format!(
            "row {}: bad visibility flag {:?}",
            row, other
        ))),
    }
}

/// Sample every satellite of the scenario and flag its visible peers
pub fn compute(scenario: &Scenario, config: &VisibilityConfig) -> Result<Tracks> {
    let times = match config.step_override_s {
        Some(step) if step <= 0 => {
            return Err(ModelError::InvalidField {
                field: "step_override_s".into(),
                reason: format!("must be positive, got {}", step),
            }
            .into())
        }
        Some(step) => (scenario.start..scenario.end()).step_by(step as usize).collect(),
        None => scenario.sample_times(),
    };

    info!(
        "Computing tracks: {} satellites x {} samples",
        scenario.satellites.len(),
        times.len()
    );

    let propagators = scenario
        .satellites
        .iter()
        .map(|s| s.propagator())
        .collect::<std::result::Result<Vec<_>, ModelError>>()?;
    let ground: Vec<_> = scenario
        .stations
        .iter()
        .chain(scenario.targets.iter())
        .map(|g| g.position())
        .collect();

    let peers: Vec<String> = scenario
        .stations
        .iter()
        .chain(scenario.targets.iter())
        .map(|g| g.id.clone())
        .chain(scenario.satellites.iter().map(|s| s.id.clone()))
        .collect();

    // Earth-fixed positions, indexed [time][satellite]
    let mut positions = Vec::with_capacity(times.len());
    for &t in &times {
        let utc = unix_to_utc(t)?;
        let at_t = propagators
            .iter()
            .map(|p| p.ecef_position(utc))
            .collect::<orbital_mechanics::Result<Vec<_>>>()?;
        positions.push(at_t);
    }

    let mut samples = Vec::with_capacity(times.len() * propagators.len());
    for (s, satellite) in scenario.satellites.iter().enumerate() {
        let mut visible_samples = 0usize;
        for (i, &t) in times.iter().enumerate() {
            let ecef = &positions[i][s];
            let subpoint = ecef_to_geodetic(ecef);

            let mut visibility = Vec::with_capacity(peers.len());
            for observer in &ground {
                let angles = look_angles(observer, ecef)?;
                visibility.push(angles.elevation_deg > config.min_elevation_deg);
            }
            for (other, other_ecef) in positions[i].iter().enumerate() {
                let range = line_of_sight_range_km(ecef, other_ecef);
                visibility.push(other != s && range > 0.0 && range < config.max_isl_range_km);
            }

            if visibility.iter().any(|&v| v) {
                visible_samples += 1;
            }
            samples.push(TrackSample {
                node: satellite.id.clone(),
                time: t,
                lat: subpoint.latitude,
                lon: subpoint.longitude,
                alt: subpoint.altitude_km * 1000.0,
                visibility,
            });
        }
        debug!(
            "{}: {} of {} samples see at least one peer",
            satellite.id,
            visible_samples,
            times.len()
        );
    }

    Ok(Tracks {
        nodes: scenario.satellites.iter().map(|s| s.id.clone()).collect(),
        times,
        peers,
        samples,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use mission_model::{GroundNode, Satellite};

    pub(crate) const TLE1: &str = "1 45196U 20012U   20094.58334491 -.00029761  00000-0 -20303-2 0  9999";
    pub(crate) const TLE2: &str = "2 45196  52.9956  50.6558 0001754  72.9283 341.9461 15.05609076  1716";

    pub(crate) fn satellite(id: &str, node: u32) -> Satellite {
        Satellite {
            id: id.to_string(),
            node,
            tle1: TLE1.to_string(),
            tle2: TLE2.to_string(),
        }
    }

    pub(crate) fn ground(id: &str, node: Option<u32>, lat: f64, lon: f64) -> GroundNode {
        GroundNode {
            id: id.to_string(),
            node,
            lat,
            lon,
            alt: 0.0,
        }
    }

    pub(crate) fn scenario_with(stations: Vec<GroundNode>) -> Scenario {
        Scenario::new(
            1,
            1_588_054_885,
            1800,
            60,
            vec![satellite("SAT-A", 1), satellite("SAT-B", 2)],
            stations,
            vec![ground("saa", None, -15.0, -15.0)],
        )
        .unwrap()
    }

    #[test]
    fn test_grid_shape_and_peer_order() {
        let scenario = scenario_with(vec![ground("stgo", Some(10), -33.3833, -70.7833)]);
        let tracks = compute(&scenario, &VisibilityConfig::default()).unwrap();

        assert_eq!(tracks.nodes(), ["SAT-A", "SAT-B"]);
        assert_eq!(tracks.times().len(), 30);
        assert_eq!(tracks.samples().len(), 60);
        assert_eq!(tracks.peers(), ["stgo", "saa", "SAT-A", "SAT-B"]);
        assert_eq!(tracks.sample(1, 0).node, "SAT-B");

        for sample in tracks.samples() {
            assert!(sample.alt > 300_000.0 && sample.alt < 700_000.0, "alt {}", sample.alt);
        }
    }

    #[test]
    fn test_colocated_satellites_do_not_link() {
        // Identical elements: range is zero, so neither sees the other
        let scenario = scenario_with(vec![ground("stgo", Some(10), -33.3833, -70.7833)]);
        let tracks = compute(&scenario, &VisibilityConfig::default()).unwrap();
        for sample in tracks.samples() {
            assert!(!sample.visibility[2]);
            assert!(!sample.visibility[3]);
        }
    }

    #[test]
    fn test_station_under_satellite_is_visible() {
        let probe = compute(&scenario_with(vec![]), &VisibilityConfig::default()).unwrap();
        let first = probe.sample(0, 0);

        let scenario = scenario_with(vec![ground("below", Some(20), first.lat, first.lon)]);
        let tracks = compute(&scenario, &VisibilityConfig::default()).unwrap();
        assert!(tracks.sample(0, 0).visibility[0]);

        // Raising the mask above 90° hides everything
        let blind = VisibilityConfig {
            min_elevation_deg: 90.0,
            ..Default::default()
        };
        let tracks = compute(&scenario, &blind).unwrap();
        assert!(tracks.samples().iter().all(|s| !s.visibility[0]));
    }

    #[test]
    fn test_step_override() {
        let scenario = scenario_with(vec![]);
        let config = VisibilityConfig {
            step_override_s: Some(300),
            ..Default::default()
        };
        let tracks = compute(&scenario, &config).unwrap();
        assert_eq!(tracks.times().len(), 6);

        let config = VisibilityConfig {
            step_override_s: Some(0),
            ..Default::default()
        };
        assert!(matches!(compute(&scenario, &config), Err(PlanError::Input(_))));
    }

    #[test]
    fn test_csv_round_trip() {
        let scenario = scenario_with(vec![ground("stgo", Some(10), -33.3833, -70.7833)]);
        let tracks = compute(&scenario, &VisibilityConfig::default()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("track_1.csv");
        tracks.write_csv(&path).unwrap();
        let reloaded = Tracks::read_csv(&path).unwrap();

        assert_eq!(reloaded.nodes(), tracks.nodes());
        assert_eq!(reloaded.times(), tracks.times());
        assert_eq!(reloaded.peers(), tracks.peers());
        for (a, b) in reloaded.samples().iter().zip(tracks.samples()) {
            assert_eq!(a.visibility, b.visibility);
            assert!((a.lat - b.lat).abs() < 1e-9);
        }
    }

    #[test]
    fn test_ragged_grid_rejected() {
        let row = |node: &str, time: i64| TrackSample {
            node: node.to_string(),
            time,
            lat: 0.0,
            lon: 0.0,
            alt: 0.0,
            visibility: vec![false],
        };
        let samples = vec![row("A", 0), row("A", 10), row("B", 0)];
        assert!(matches!(
            Tracks::from_samples(vec!["gs".into()], samples),
            Err(PlanError::MalformedTracks(_))
        ));
    }

    #[test]
    fn test_bad_flag_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.csv");
        std::fs::write(&path, "node,time,lat,lon,alt,gs\nA,0,0,0,0,maybe\n").unwrap();
        assert!(matches!(Tracks::read_csv(&path), Err(PlanError::MalformedTracks(_))));
    }
}
