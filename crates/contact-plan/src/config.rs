//! Engine configuration
//!
//! Every field has a default so a config file only needs the values it
//! changes. CLI flags override whatever the file sets.

use crate::Result;
use genetic_search::GaConfig;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// Validity weight
pub const W_VALID: f64 = 0.70;
/// Total time weight
pub const W_TOTAL_TIME: f64 = 0.28;
/// Third objective weight (start time or length)
pub const W_THIRD: f64 = 0.02;

/// Minimum elevation above the local horizon for a ground link (deg)
pub const MIN_ELEVATION_DEG: f64 = 5.0;

/// Maximum inter-satellite link range (km)
pub const MAX_ISL_RANGE_KM: f64 = 3000.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub visibility: VisibilityConfig,
    pub planner: PlannerConfig,
}

impl EngineConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading engine config from {:?}", path);
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisibilityConfig {
    /// Default 5°
    pub min_elevation_deg: f64,
    /// Default 3000 km
    pub max_isl_range_km: f64,
    /// Replaces the scenario sampling step when set (s)
    pub step_override_s: Option<i64>,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            min_elevation_deg: MIN_ELEVATION_DEG,
            max_isl_range_km: MAX_ISL_RANGE_KM,
            step_override_s: None,
        }
    }
}

/// Third fitness objective. Exactly one is active per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    /// Earlier first contact scores higher
    #[default]
    StartTime,
    /// Fewer selected contacts score higher
    Length,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceConfig {
    /// Generations required before stopping is considered
    pub min_history: usize,
    /// Trailing generations inspected for a plateau, counting the latest.
    /// The spread is taken over the ones before it.
    pub window: usize,
    /// Stop outright above this score
    pub target_score: f64,
    /// Stop on a flat plateau above this score
    pub plateau_score: f64,
    /// Standard deviation below which the window counts as flat
    pub plateau_std: f64,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            min_history: 20,
            window: 10,
            target_score: 0.95,
            plateau_score: 0.85,
            plateau_std: 1e-10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Default 50
    pub population_size: usize,
    /// Default 0.3
    pub mutation_rate: f64,
    /// Default 100
    pub max_iterations: usize,
    /// Default 5
    pub tournament_size: usize,
    /// (validity, total time, third objective). Default (0.70, 0.28, 0.02)
    pub weights: (f64, f64, f64),
    pub objective: Objective,
    /// Relative odds of a gene starting included. Default 1
    pub mask_true_weight: u32,
    /// Relative odds of a gene starting excluded. Default 2
    pub mask_false_weight: u32,
    /// Extra GA runs after a structurally invalid result. Default 10
    pub max_replans: usize,
    pub seed: Option<u64>,
    pub parallel_evaluation: bool,
    pub convergence: ConvergenceConfig,
    /// Restart the population on a low plateau instead of waiting it out
    pub reseed_on_stagnation: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            mutation_rate: 0.3,
            max_iterations: 100,
            tournament_size: 5,
            weights: (W_VALID, W_TOTAL_TIME, W_THIRD),
            objective: Objective::StartTime,
            mask_true_weight: 1,
            mask_false_weight: 2,
            max_replans: 10,
            seed: None,
            parallel_evaluation: false,
            convergence: ConvergenceConfig::default(),
            reseed_on_stagnation: false,
        }
    }
}

impl PlannerConfig {
    /// Engine settings for one attempt. Seeded runs shift the seed per
    /// attempt so a replan explores a different trajectory.
    pub fn ga_config(&self, attempt: usize) -> GaConfig {
        GaConfig {
            population_size: self.population_size,
            mutation_rate: self.mutation_rate,
            max_iterations: self.max_iterations,
            tournament_size: self.tournament_size,
            seed: self.seed.map(|s| s.wrapping_add(attempt as u64)),
            parallel: self.parallel_evaluation,
        }
    }
}
