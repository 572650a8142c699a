//! Simulation scenario: time grid plus the node collections

use crate::node::{GroundNode, NodeRole, Satellite};
use crate::{invalid, ModelError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// A fixed simulation window over a set of nodes.
///
/// `start` is a unix epoch in seconds, `duration` and `step` are seconds.
/// The generated tracks / contact list paths are set once, after the
/// artifacts have been written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub id: u32,
    pub start: i64,
    pub duration: i64,
    pub step: i64,
    pub satellites: Vec<Satellite>,
    pub stations: Vec<GroundNode>,
    pub targets: Vec<GroundNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tracks: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    contacts: Option<PathBuf>,
}

impl Scenario {
    pub fn new(
        id: u32,
        start: i64,
        duration: i64,
        step: i64,
        satellites: Vec<Satellite>,
        stations: Vec<GroundNode>,
        targets: Vec<GroundNode>,
    ) -> Result<Self> {
        let scenario = Self {
            id,
            start,
            duration,
            step,
            satellites,
            stations,
            targets,
            tracks: None,
            contacts: None,
        };
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<()> {
        if self.step <= 0 {
            return Err(invalid("step", format!("must be positive, got {}", self.step)));
        }
        if self.duration < 0 {
            return Err(invalid("duration", format!("must not be negative, got {}", self.duration)));
        }

        let mut seen = HashSet::new();
        let ids = self
            .satellites
            .iter()
            .map(|s| s.id.as_str())
            .chain(self.stations.iter().map(|s| s.id.as_str()))
            .chain(self.targets.iter().map(|t| t.id.as_str()));
        for id in ids {
            if id.is_empty() {
                return Err(invalid("id", "node id must not be empty"));
            }
            if !seen.insert(id) {
                return Err(ModelError::DuplicateNode(id.to_string()));
            }
        }

        for satellite in &self.satellites {
            satellite.propagator()?;
        }
        for station in &self.stations {
            station.validate()?;
            if station.node.is_none() {
                return Err(invalid(format!("{}.node", station.id), "ground stations must be addressable"));
            }
        }
        for target in &self.targets {
            target.validate()?;
        }

        Ok(())
    }

    /// End of the simulation window (exclusive)
    pub fn end(&self) -> i64 {
        self.start + self.duration
    }

    /// Sample instants `[start, start + duration)` stepped by `step`
    pub fn sample_times(&self) -> Vec<i64> {
        if self.step <= 0 {
            return Vec::new();
        }
        (self.start..self.end()).step_by(self.step as usize).collect()
    }

    pub fn role_of(&self, id: &str) -> Option<NodeRole> {
        self.nodes().find(|(node, _)| *node == id).map(|(_, role)| role)
    }

    /// Numeric address of a node, when it has one
    pub fn address_of(&self, id: &str) -> Option<u32> {
        self.satellites
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.node)
            .or_else(|| {
                self.stations
                    .iter()
                    .chain(self.targets.iter())
                    .find(|g| g.id == id)
                    .and_then(|g| g.node)
            })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.role_of(id).is_some()
    }

    /// Every node id with its role
    pub fn nodes(&self) -> impl Iterator<Item = (&str, NodeRole)> {
        let satellites = self.satellites.iter().map(|s| (s.id.as_str(), NodeRole::Satellite));
        let stations = self.stations.iter().map(|s| (s.id.as_str(), NodeRole::GroundStation));
        let targets = self.targets.iter().map(|t| (t.id.as_str(), NodeRole::Target));
        satellites.chain(stations).chain(targets)
    }

    /// Satellite and ground station ids
    pub fn relay_ids(&self) -> HashSet<&str> {
        self.nodes()
            .filter(|(_, role)| role.is_relay())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn target_ids(&self) -> HashSet<&str> {
        self.nodes()
            .filter(|(_, role)| *role == NodeRole::Target)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn tracks(&self) -> Option<&Path> {
        self.tracks.as_deref()
    }

    pub fn contacts(&self) -> Option<&Path> {
        self.contacts.as_deref()
    }

    pub fn set_tracks(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        set_once(&mut self.tracks, path.into(), "tracks")
    }

    pub fn set_contacts(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        set_once(&mut self.contacts, path.into(), "contacts")
    }
}

fn set_once(slot: &mut Option<PathBuf>, path: PathBuf, artifact: &'static str) -> Result<()> {
    match slot {
        Some(existing) if *existing != path => Err(ModelError::ArtifactAlreadySet {
            artifact,
            existing: existing.clone(),
        }),
        Some(_) => Ok(()),
        None => {
            *slot = Some(path);
            Ok(())
        }
    }
}
