//! GA planning with structural re-validation
//!
//! Each attempt evolves a fresh population until the convergence predicate
//! stops it or the iteration bound is hit. The best plan must then pass
//! the structural check (R1-R3); otherwise the GA is rerun, up to
//! `max_replans` extra times, before planning fails.

use crate::config::{ConvergenceConfig, PlannerConfig};
use crate::contacts::{Contact, ContactList};
use crate::fitness::ContactPlanProblem;
use crate::{ContactPlan, PlanError, Result};
use genetic_search::{Control, Fitness, GenerationReport, GeneticAlgorithm, Termination};
use mission_model::{Scenario, Task};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct PlanOutcome {
    pub plan: ContactPlan,
    pub fitness: Fitness,
    /// Generations of the accepted attempt
    pub history: Vec<GenerationReport>,
    pub termination: Termination,
    /// Attempts used, including the accepted one
    pub attempts: usize,
}

/// Row of the fitness history table
#[derive(Serialize)]
struct HistoryRow {
    generation: usize,
    best_score: f64,
    average_score: f64,
    valid: f64,
    total_time: f64,
    third: f64,
    best_ever_score: f64,
}

impl PlanOutcome {
    pub fn write_history_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = csv::Writer::from_path(path)?;
        for report in &self.history {
            let [valid, total_time, third] = report.best_components;
            writer.serialize(HistoryRow {
                generation: report.generation,
                best_score: report.best_score,
                average_score: report.average_score,
                valid,
                total_time,
                third,
                best_ever_score: report.best_ever_score,
            })?;
        }
        writer.flush()?;
        info!("Wrote {} generations to {:?}", self.history.len(), path);
        Ok(())
    }
}

pub struct Planner {
    config: PlannerConfig,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn plan(&self, list: &ContactList, task: &Task, scenario: &Scenario) -> Result<PlanOutcome> {
        let problem = ContactPlanProblem::for_scenario(list, task, scenario, &self.config)?;
        self.plan_problem(&problem, task)
    }

    pub fn plan_problem(&self, problem: &ContactPlanProblem, task: &Task) -> Result<PlanOutcome> {
        let attempts = self.config.max_replans + 1;
        info!(
            "Planning task {} over {} contacts (population {}, mutation {}, {} iterations)",
            task.id,
            problem.contacts().len(),
            self.config.population_size,
            self.config.mutation_rate,
            self.config.max_iterations
        );

        for attempt in 0..attempts {
            let mut ga = GeneticAlgorithm::new(problem, self.config.ga_config(attempt))?;
            let report = ga.run(convergence(
                self.config.convergence,
                self.config.reseed_on_stagnation,
            ));
            let plan = problem.plan_for(&report.best);

            info!(
                "Attempt {}: {:?} after {} generations, fitness {:.4} (valid {:.4}), solution {:?}",
                attempt + 1,
                report.termination,
                report.history.len(),
                report.best_fitness.score,
                report.best_fitness.components[0],
                plan.accesses()
            );

            if check_contact_plan(&plan, task) {
                return Ok(PlanOutcome {
                    plan,
                    fitness: report.best_fitness,
                    history: report.history,
                    termination: report.termination,
                    attempts: attempt + 1,
                });
            }
            warn!("Attempt {} of {} failed the structural check", attempt + 1, attempts);
        }

        Err(PlanError::PlanningFailed { attempts })
    }
}

/// Termination predicate over the generation history.
///
/// Stops once `min_history` generations exist and the latest best score
/// clears `target_score`, or clears `plateau_score` while the generations
/// just before it were flat. With
/// `reseed` set, a flat window below `plateau_score` restarts the population.
pub fn convergence(
    config: ConvergenceConfig,
    reseed: bool,
) -> impl FnMut(&[GenerationReport]) -> Control {
    move |history| {
        let Some(latest) = history.last() else {
            return Control::Continue;
        };
        if history.len() < config.min_history {
            return Control::Continue;
        }

        // Spread of the window, leaving out the latest generation
        let end = history.len() - 1;
        let window = &history[history.len().saturating_sub(config.window)..end];
        let flat = !window.is_empty() && std_dev(window.iter().map(|r| r.best_score)) < config.plateau_std;
        let best = latest.best_score;

        if best > config.target_score || (best > config.plateau_score && flat) {
            Control::Stop
        } else if reseed && flat {
            Control::Reseed
        } else {
            Control::Continue
        }
    }
}

fn std_dev(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let n = values.clone().count();
    if n == 0 {
        return 0.0;
    }
    let mean = values.clone().sum::<f64>() / n as f64;
    (values.map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64).sqrt()
}

/// Structural check of a plan against its task: leaves the start node,
/// reaches the end node and visits every required target in between.
pub fn check_contact_plan(plan: &ContactPlan, task: &Task) -> bool {
    let valid = is_structurally_valid(&plan.contacts, task);
    if valid {
        info!("Valid sequence");
    } else {
        warn!("Invalid sequence");
    }
    valid
}

fn is_structurally_valid(contacts: &[Contact], task: &Task) -> bool {
    let (Some(first), Some(last)) = (contacts.first(), contacts.last()) else {
        return false;
    };
    if first.from != task.start || last.to != task.end {
        return false;
    }

    let mut interior: Vec<&str> = if contacts.len() > 2 {
        contacts[1..contacts.len() - 1].iter().map(|c| c.to.as_str()).collect()
    } else {
        Vec::new()
    };
    task.required_targets().all(|target| {
        match interior.iter().position(|to| *to == target.id) {
            Some(i) => {
                interior.remove(i);
                true
            }
            None => false,
        }
    })
}
