//! Contact plan fitness and routing validity
//!
//! A plan is scored on the contact list sorted by start time, with start
//! and end times min-max normalized jointly over both columns:
//!
//! ```text
//! start      = 1 − start(first)
//! total_time = 1 − (end(last) − start(first))
//! length     = 1 − |plan| / |list|
//! valid      = max(0, |plan| − violations) / |plan|
//! ```
//!
//! Routing rules, one violation each:
//!
//! | Rule | Requirement |
//! |------|-------------|
//! | R1   | first contact leaves the task start node |
//! | R2   | last contact reaches the task end node |
//! | R3   | every required target is reached by an interior contact |
//! | R4   | after reaching a relay, the next contact leaves that relay |
//! | R5   | after reaching a target, the next contact leaves the same node again |

use crate::config::{Objective, PlannerConfig};
use crate::contacts::{Contact, ContactList};
use crate::{ContactPlan, PlanError, Result};
use genetic_search::{Fitness, Individual, Problem};
use mission_model::{Scenario, Task};
use rand::Rng;
use std::collections::HashSet;

/// Contact window with times mapped into [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedWindow {
    pub start: f64,
    pub end: f64,
    pub duration: f64,
}

pub struct ContactPlanProblem {
    contacts: Vec<Contact>,
    normalized: Vec<NormalizedWindow>,
    task_start: String,
    task_end: String,
    required: Vec<String>,
    relays: HashSet<String>,
    targets: HashSet<String>,
    weights: (f64, f64, f64),
    objective: Objective,
    mask_weights: (u32, u32),
}

impl ContactPlanProblem {
    /// Routing roles taken from the scenario: satellites and stations
    /// relay, targets do not.
    pub fn for_scenario(
        list: &ContactList,
        task: &Task,
        scenario: &Scenario,
        config: &PlannerConfig,
    ) -> Result<Self> {
        let relays = scenario.relay_ids().into_iter().map(String::from).collect();
        let targets = scenario.target_ids().into_iter().map(String::from).collect();
        Self::new(list, task, relays, targets, config)
    }

    pub fn new(
        list: &ContactList,
        task: &Task,
        relays: HashSet<String>,
        targets: HashSet<String>,
        config: &PlannerConfig,
    ) -> Result<Self> {
        if list.is_empty() {
            return Err(PlanError::EmptyContactList);
        }
        let contacts = list.sorted_by_start();
        let normalized = normalize(&contacts);

        Ok(Self {
            contacts,
            normalized,
            task_start: task.start.clone(),
            task_end: task.end.clone(),
            required: task.required_targets().map(|t| t.id.clone()).collect(),
            relays,
            targets,
            weights: config.weights,
            objective: config.objective,
            mask_weights: (config.mask_true_weight, config.mask_false_weight),
        })
    }

    /// Contacts in the order individuals index them
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn normalized(&self, position: usize) -> Option<NormalizedWindow> {
        self.normalized.get(position).copied()
    }

    pub fn plan_for(&self, individual: &Individual) -> ContactPlan {
        ContactPlan::new(
            individual
                .decode()
                .into_iter()
                .filter_map(|i| self.contacts.get(i).cloned())
                .collect(),
        )
    }

    /// Rule violations of a plan given as ascending positions
    pub fn violations(&self, positions: &[usize]) -> usize {
        let plan: Vec<&Contact> = positions.iter().filter_map(|&i| self.contacts.get(i)).collect();
        let (Some(first), Some(last)) = (plan.first(), plan.last()) else {
            return 0;
        };
        let mut violations = 0;

        // R1, R2
        if first.from != self.task_start {
            violations += 1;
        }
        if last.to != self.task_end {
            violations += 1;
        }

        // R3: each required visit consumes one interior arrival
        let mut interior: Vec<Option<&str>> = if plan.len() > 2 {
            plan[1..plan.len() - 1].iter().map(|c| Some(c.to.as_str())).collect()
        } else {
            Vec::new()
        };
        for target in &self.required {
            match interior.iter_mut().find(|to| **to == Some(target.as_str())) {
                Some(slot) => *slot = None,
                None => violations += 1,
            }
        }

        // R4, R5
        for pair in plan.windows(2) {
            let (current, next) = (pair[0], pair[1]);
            if self.relays.contains(&current.to) && current.to != next.from {
                violations += 1;
            }
            if self.targets.contains(&current.to) && current.from != next.from {
                violations += 1;
            }
        }

        violations
    }

    /// Score a plan given as ascending positions into [`Self::contacts`]
    pub fn evaluate_plan(&self, positions: &[usize]) -> Fitness {
        let windows: Vec<NormalizedWindow> =
            positions.iter().filter_map(|&i| self.normalized(i)).collect();
        let (Some(first), Some(last)) = (windows.first(), windows.last()) else {
            return Fitness::WORST;
        };

        let n = windows.len();
        let start_score = 1.0 - first.start;
        let total_time = 1.0 - (last.end - first.start);
        let third = match self.objective {
            Objective::StartTime => start_score,
            Objective::Length => 1.0 - n as f64 / self.contacts.len() as f64,
        };

        let violations = self.violations(positions);
        let valid = n.saturating_sub(violations) as f64 / n as f64;

        let (a, b, c) = self.weights;
        Fitness::new(a * valid + b * total_time + c * third, [valid, total_time, third])
    }
}

impl Problem for ContactPlanProblem {
    fn random_individual<R: Rng + ?Sized>(&self, rng: &mut R) -> Individual {
        let (true_weight, false_weight) = self.mask_weights;
        Individual::weighted_random(self.contacts.len(), true_weight, false_weight, rng)
    }

    fn fitness(&self, individual: &Individual) -> Fitness {
        self.evaluate_plan(&individual.decode())
    }
}

fn normalize(contacts: &[Contact]) -> Vec<NormalizedWindow> {
    let times = contacts.iter().flat_map(|c| [c.start, c.end]);
    let t_min = times.clone().min().unwrap_or(0);
    let t_span = (times.max().unwrap_or(0) - t_min) as f64;

    let d_min = contacts.iter().map(|c| c.duration).min().unwrap_or(0);
    let d_max = contacts.iter().map(|c| c.duration).max().unwrap_or(0);
    let d_span = (d_max - d_min) as f64;

    let scale = |value: i64, min: i64, span: f64| {
        if span > 0.0 {
            (value - min) as f64 / span
        } else {
            0.0
        }
    };

    contacts
        .iter()
        .map(|c| NormalizedWindow {
            start: scale(c.start, t_min, t_span),
            end: scale(c.end, t_min, t_span),
            duration: scale(c.duration, d_min, d_span),
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use mission_model::TaskTarget;
    use proptest::prelude::*;

    pub(crate) fn contact(access: usize, from: &str, to: &str, start: i64, end: i64) -> Contact {
        Contact {
            access,
            from: from.into(),
            to: to.into(),
            start,
            end,
            duration: end - start,
        }
    }

    pub(crate) fn ids(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn task(targets: &[(&str, i32)]) -> Task {
        Task::new(
            1,
            "A",
            "B",
            targets
                .iter()
                .map(|&(id, prio)| TaskTarget {
                    id: id.into(),
                    command: format!("take {}", id),
                    result: None,
                    prio,
                })
                .collect(),
        )
    }

    /// Stations A and B, satellites S and S2, target T
    fn four_node_list() -> ContactList {
        ContactList::new(vec![
            contact(0, "A", "S", 0, 10),
            contact(1, "S", "T", 20, 30),
            contact(2, "T", "S", 20, 30),
            contact(3, "S", "B", 40, 50),
            contact(4, "S2", "B", 40, 50),
            contact(5, "A", "S2", 5, 15),
        ])
    }

    fn problem(list: &ContactList, task: &Task) -> ContactPlanProblem {
        ContactPlanProblem::new(list, task, ids(&["A", "B", "S", "S2"]), ids(&["T"]), &PlannerConfig::default())
            .unwrap()
    }

    /// Sorted positions of the given access ids
    fn positions(problem: &ContactPlanProblem, accesses: &[usize]) -> Vec<usize> {
        let mut positions: Vec<usize> = accesses
            .iter()
            .map(|a| problem.contacts().iter().position(|c| c.access == *a).unwrap())
            .collect();
        positions.sort_unstable();
        positions
    }

    fn valid(problem: &ContactPlanProblem, accesses: &[usize]) -> f64 {
        problem.evaluate_plan(&positions(problem, accesses)).components[0]
    }

    #[test]
    fn test_routing_rules() {
        let list = four_node_list();
        let task = task(&[("T", 1)]);
        let p = problem(&list, &task);

        // A -> S -> T, S -> B
        assert_eq!(valid(&p, &[0, 1, 3]), 1.0);
        // Misses R1 and R3
        assert_eq!(valid(&p, &[1, 3]), 0.0);
        // Misses R3
        assert_eq!(valid(&p, &[0, 3]), 0.5);
        // Misses R2
        assert!((valid(&p, &[0, 1]) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn test_relay_discontinuity_penalized() {
        let list = four_node_list();
        let task = task(&[("T", 1)]);
        let p = problem(&list, &task);

        // Arrives at S2, then departs from S
        assert!((valid(&p, &[5, 1, 3]) - 2.0 / 3.0).abs() < 1e-12);
        // S reaches T, then S2 sends onward
        assert!((valid(&p, &[0, 1, 4]) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_optional_targets_not_required() {
        let list = four_node_list();
        let p = problem(&list, &task(&[("T", 0)]));
        assert_eq!(valid(&p, &[0, 3]), 1.0);
    }

    #[test]
    fn test_repeated_visits_consume_arrivals() {
        let list = ContactList::new(vec![
            contact(0, "A", "S", 0, 10),
            contact(1, "S", "T", 20, 30),
            contact(2, "S", "T", 35, 38),
            contact(3, "S", "B", 40, 50),
        ]);
        let twice = task(&[("T", 1), ("T", 1)]);
        let p = problem(&list, &twice);
        assert_eq!(valid(&p, &[0, 1, 2, 3]), 1.0);
        assert_eq!(valid(&p, &[0, 1, 3]), 2.0 / 3.0);
    }

    #[test]
    fn test_empty_plan_scores_worst() {
        let list = four_node_list();
        let p = problem(&list, &task(&[("T", 1)]));
        assert_eq!(p.evaluate_plan(&[]), Fitness::WORST);
        assert_eq!(p.fitness(&Individual::empty(list.len())), Fitness::WORST);
    }

    #[test]
    fn test_empty_list_rejected() {
        let result = ContactPlanProblem::new(
            &ContactList::default(),
            &task(&[]),
            HashSet::new(),
            HashSet::new(),
            &PlannerConfig::default(),
        );
        assert!(matches!(result, Err(PlanError::EmptyContactList)));
    }

    #[test]
    fn test_normalization_leaves_list_untouched() {
        let list = four_node_list();
        let before = list.clone();
        let p = problem(&list, &task(&[("T", 1)]));
        assert_eq!(list, before);

        let first = p.normalized(0).unwrap();
        assert_eq!(first.start, 0.0);
        let last = p.normalized(list.len() - 1).unwrap();
        assert_eq!(last.end, 1.0);
        assert!(p.contacts().windows(2).all(|w| w[0].start <= w[1].start));
        assert_eq!(p.contacts()[0].start, 0);
    }

    #[test]
    fn test_length_objective() {
        let list = four_node_list();
        let task = task(&[("T", 1)]);
        let config = PlannerConfig {
            objective: Objective::Length,
            ..Default::default()
        };
        let p = ContactPlanProblem::new(&list, &task, ids(&["A", "B", "S", "S2"]), ids(&["T"]), &config).unwrap();
        let fitness = p.evaluate_plan(&positions(&p, &[0, 1, 3]));
        assert!((fitness.components[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_plan_for_maps_positions() {
        let list = four_node_list();
        let p = problem(&list, &task(&[("T", 1)]));
        let mut genes = vec![false; list.len()];
        for position in positions(&p, &[0, 1, 3]) {
            genes[position] = true;
        }
        let plan = p.plan_for(&Individual::new(genes));
        assert_eq!(plan.accesses(), vec![0, 1, 3]);
    }

    proptest! {
        #[test]
        fn prop_scores_bounded(mask in proptest::collection::vec(any::<bool>(), 6)) {
            let list = four_node_list();
            let task = task(&[("T", 1)]);
            let p = problem(&list, &task);
            let fitness = p.fitness(&Individual::new(mask));
            prop_assert!((0.0..=1.0).contains(&fitness.components[0]));
            prop_assert!((0.0..=1.0).contains(&fitness.components[1]));
            prop_assert!(fitness.score >= 0.0 && fitness.score <= 1.0 + 1e-12);
        }
    }
}
