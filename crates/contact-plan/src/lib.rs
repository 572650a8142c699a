//! Contact Plan Designer
//!
//! Derives contact windows for a constellation, searches an ordered subset
//! of them that routes a task from its start node, through its targets, to
//! its end node, and compiles the result into a flight plan.
//!
//! # Pipeline
//!
//! ```text
//! Scenario ─► tracks (visibility per sample) ─► contact list
//!                                                  │
//!                        Task ─► GA + fitness ◄────┘
//!                                   │
//!                            contact plan ─► flight plan
//! ```
//!
//! # Fitness Model
//!
//! ```text
//! Score(plan) = w₁·V + w₂·(1 − T) + w₃·X
//! ```
//!
//! | Factor | Weight | Description |
//! |--------|--------|-------------|
//! | V      | 0.70   | Validity: share of routing rules R1-R5 satisfied |
//! | T      | 0.28   | Normalized span from first start to last end |
//! | X      | 0.02   | Earliest start (default) or short plan |

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod config;
pub mod contacts;
pub mod controller;
pub mod fitness;
pub mod flight_plan;
pub mod planner;
pub mod tracks;

pub use config::{EngineConfig, Objective, PlannerConfig, VisibilityConfig};
pub use contacts::{Contact, ContactList};
pub use controller::MissionController;
pub use fitness::ContactPlanProblem;
pub use flight_plan::{FlightPlan, FlightPlanCompiler, FlightPlanEntry};
pub use planner::{check_contact_plan, PlanOutcome, Planner};
pub use tracks::Tracks;

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Input error: {0}")]
    Input(#[from] mission_model::ModelError),
    #[error("Contact list is empty")]
    EmptyContactList,
    #[error("No structurally valid plan after {attempts} attempts")]
    PlanningFailed { attempts: usize },
    #[error("Unknown contact access {0}")]
    UnknownAccess(usize),
    #[error("Orbital error: {0}")]
    Orbital(#[from] orbital_mechanics::OrbitalError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Malformed tracks table: {0}")]
    MalformedTracks(String),
    #[error("Invalid configuration: {0}")]
    Config(#[from] genetic_search::GaConfigError),
    #[error("{0} requires {1}")]
    MissingStage(&'static str, &'static str),
}

pub type Result<T> = std::result::Result<T, PlanError>;

/// Selected contacts in ascending start order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactPlan {
    pub contacts: Vec<Contact>,
}

impl ContactPlan {
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self { contacts }
    }

    /// Plan from contacts in any order, sorted by start then access
    pub fn in_time_order(mut contacts: Vec<Contact>) -> Self {
        contacts.sort_by_key(|c| (c.start, c.access));
        Self { contacts }
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// Access ids, the form stored as a task solution
    pub fn accesses(&self) -> Vec<usize> {
        self.contacts.iter().map(|c| c.access).collect()
    }
}
