//! Genetic Search
//!
//! A small, reusable evolutionary search over boolean inclusion masks.
//! The engine knows nothing about the problem domain: callers supply an
//! individual factory and a fitness function through [`Problem`], and a
//! termination predicate over the per-generation history.
//!
//! # Generation step
//!
//! ```text
//! for each child:
//!     p1 = tournament(k), p2 = tournament(k)
//!     child = p1[0..c] ++ p2[c..len]        c ∈ [1, len-1]
//!     with probability mutation_rate: flip one random bit
//! ```
//!
//! The best individual returned is the best ever evaluated across all
//! generations, so an unlucky final generation never regresses the result.

use rand::Rng;
use serde::{Deserialize, Serialize};

pub mod config;
pub mod engine;
pub mod operators;

pub use config::{GaConfig, GaConfigError};
pub use engine::{Control, GenerationReport, GeneticAlgorithm, RunReport, Termination};

/// Boolean inclusion mask, one gene per candidate element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Individual {
    genes: Vec<bool>,
}

impl Individual {
    pub fn new(genes: Vec<bool>) -> Self {
        Self { genes }
    }

    pub fn empty(len: usize) -> Self {
        Self {
            genes: vec![false; len],
        }
    }

    /// Mask drawn with `P(true) = true_weight / (true_weight + false_weight)`
    pub fn weighted_random<R: Rng + ?Sized>(
        len: usize,
        true_weight: u32,
        false_weight: u32,
        rng: &mut R,
    ) -> Self {
        let total = f64::from(true_weight) + f64::from(false_weight);
        let p_true = if total == 0.0 {
            0.5
        } else {
            f64::from(true_weight) / total
        };
        Self {
            genes: (0..len).map(|_| rng.gen_bool(p_true)).collect(),
        }
    }

    pub fn genes(&self) -> &[bool] {
        &self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn count_ones(&self) -> usize {
        self.genes.iter().filter(|&&g| g).count()
    }

    pub fn flip(&mut self, index: usize) {
        if let Some(gene) = self.genes.get_mut(index) {
            *gene = !*gene;
        }
    }

    /// Ascending positions of the included elements
    pub fn decode(&self) -> Vec<usize> {
        self.genes
            .iter()
            .enumerate()
            .filter_map(|(i, &g)| g.then_some(i))
            .collect()
    }
}

/// Fitness tuple: a scalar used for ranking plus three diagnostic components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fitness {
    pub score: f64,
    pub components: [f64; 3],
}

impl Fitness {
    pub const WORST: Fitness = Fitness {
        score: 0.0,
        components: [0.0; 3],
    };

    pub fn new(score: f64, components: [f64; 3]) -> Self {
        Self { score, components }
    }

    /// Strictly better; NaN never wins
    pub fn beats(&self, other: &Fitness) -> bool {
        self.score > other.score
    }
}

/// A search problem the engine can evolve solutions for.
///
/// `fitness` must be a pure function of the individual: the engine may call
/// it from several worker threads within one generation.
pub trait Problem: Sync {
    fn random_individual<R: Rng + ?Sized>(&self, rng: &mut R) -> Individual;

    fn fitness(&self, individual: &Individual) -> Fitness;
}
