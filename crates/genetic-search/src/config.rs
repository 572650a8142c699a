//! Engine configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum GaConfigError {
    #[error("population size must be at least 1")]
    EmptyPopulation,
    #[error("mutation rate must be within [0, 1], got {0}")]
    MutationRate(f64),
    #[error("tournament size must be at least 1")]
    EmptyTournament,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GaConfig {
    /// Individuals per generation
    pub population_size: usize,
    /// Probability that a child gets one bit flipped
    pub mutation_rate: f64,
    /// Hard bound on bred generations
    pub max_iterations: usize,
    /// Individuals sampled per tournament
    pub tournament_size: usize,
    /// Fixed seed for reproducible runs; entropy when unset
    pub seed: Option<u64>,
    /// Evaluate fitness on the rayon pool
    pub parallel: bool,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 50,
            mutation_rate: 0.3,
            max_iterations: 100,
            tournament_size: 5,
            seed: None,
            parallel: false,
        }
    }
}

impl GaConfig {
    pub fn validate(&self) -> Result<(), GaConfigError> {
        if self.population_size == 0 {
            return Err(GaConfigError::EmptyPopulation);
        }
        if !(0.0..=1.0).contains(&self.mutation_rate) {
            return Err(GaConfigError::MutationRate(self.mutation_rate));
        }
        if self.tournament_size == 0 {
            return Err(GaConfigError::EmptyTournament);
        }
        Ok(())
    }
}
