//! Generational loop

use crate::config::{GaConfig, GaConfigError};
use crate::operators::{argmax, crossover, mutate, tournament};
use crate::{Fitness, Individual, Problem};
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What the caller's predicate wants after a generation is evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Stop,
    /// Replace the whole population with fresh random individuals
    Reseed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    Converged,
    MaxIterationsReached,
}

/// Per-generation diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub generation: usize,
    pub best_score: f64,
    pub average_score: f64,
    pub best_components: [f64; 3],
    pub best_ever_score: f64,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub best: Individual,
    pub best_fitness: Fitness,
    pub history: Vec<GenerationReport>,
    pub termination: Termination,
}

pub struct GeneticAlgorithm<'p, P: Problem> {
    problem: &'p P,
    config: GaConfig,
    rng: Pcg64Mcg,
}

impl<'p, P: Problem> GeneticAlgorithm<'p, P> {
    pub fn new(problem: &'p P, config: GaConfig) -> Result<Self, GaConfigError> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => Pcg64Mcg::seed_from_u64(seed),
            None => Pcg64Mcg::from_entropy(),
        };
        Ok(Self {
            problem,
            config,
            rng,
        })
    }

    pub fn config(&self) -> &GaConfig {
        &self.config
    }

    /// Evolve until `control` returns [`Control::Stop`] or the iteration
    /// bound is hit. `control` sees the full history after each evaluated
    /// generation, so at most `max_iterations + 1` generations are evaluated.
    pub fn run<F>(&mut self, mut control: F) -> RunReport
    where
        F: FnMut(&[GenerationReport]) -> Control,
    {
        let mut population = self.seed_population();
        let mut history = Vec::new();
        let mut best: Option<(Individual, Fitness)> = None;
        let mut termination = Termination::MaxIterationsReached;

        for generation in 0..=self.config.max_iterations {
            let fitnesses = self.evaluate(&population);

            if let Some(i) = argmax(&fitnesses) {
                let improved = match &best {
                    Some((_, fitness)) => fitnesses[i].beats(fitness),
                    None => true,
                };
                if improved {
                    best = Some((population[i].clone(), fitnesses[i]));
                }
            }

            let report = summarize(generation, &fitnesses, best.as_ref().map(|(_, f)| f));
            debug!(
                "Generation {}: best {:.4}, avg {:.4}, best ever {:.4}",
                report.generation, report.best_score, report.average_score, report.best_ever_score
            );
            history.push(report);

            match control(&history) {
                Control::Stop => {
                    termination = Termination::Converged;
                    break;
                }
                _ if generation == self.config.max_iterations => break,
                Control::Reseed => {
                    debug!("Reseeding population at generation {}", generation);
                    population = self.seed_population();
                }
                Control::Continue => {
                    population = self.breed(&population, &fitnesses);
                }
            }
        }

        let (best, best_fitness) = best.unwrap_or_else(|| (Individual::empty(0), Fitness::WORST));
        RunReport {
            best,
            best_fitness,
            history,
            termination,
        }
    }

    fn seed_population(&mut self) -> Vec<Individual> {
        (0..self.config.population_size)
            .map(|_| self.problem.random_individual(&mut self.rng))
            .collect()
    }

    fn evaluate(&self, population: &[Individual]) -> Vec<Fitness> {
        let problem = self.problem;
        if self.config.parallel {
            population.par_iter().map(|ind| problem.fitness(ind)).collect()
        } else {
            population.iter().map(|ind| problem.fitness(ind)).collect()
        }
    }

    fn breed(&mut self, population: &[Individual], fitnesses: &[Fitness]) -> Vec<Individual> {
        let k = self.config.tournament_size;
        let rate = self.config.mutation_rate;
        (0..population.len())
            .map(|_| {
                let p1 = &population[tournament(fitnesses, k, &mut self.rng)];
                let p2 = &population[tournament(fitnesses, k, &mut self.rng)];
                let mut child = crossover(p1, p2, &mut self.rng);
                mutate(&mut child, rate, &mut self.rng);
                child
            })
            .collect()
    }
}

fn summarize(generation: usize, fitnesses: &[Fitness], best_ever: Option<&Fitness>) -> GenerationReport {
    let best = argmax(fitnesses)
        .map(|i| fitnesses[i])
        .unwrap_or(Fitness::WORST);
    let average = if fitnesses.is_empty() {
        0.0
    } else {
        fitnesses.iter().map(|f| f.score).sum::<f64>() / fitnesses.len() as f64
    };
    GenerationReport {
        generation,
        best_score: best.score,
        average_score: average,
        best_components: best.components,
        best_ever_score: best_ever.map_or(best.score, |f| f.score),
    }
}
