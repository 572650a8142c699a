//! Routing task: carry a request from a start node, through targets, to an end node

use crate::scenario::Scenario;
use crate::{invalid, ModelError, Result};
use serde::{Deserialize, Serialize};

/// A target visit within a task.
///
/// `prio == 0` (or below) marks the visit optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskTarget {
    pub id: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    pub prio: i32,
}

impl TaskTarget {
    pub fn is_required(&self) -> bool {
        self.prio > 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Task {
    pub id: u32,
    pub start: String,
    pub end: String,
    pub targets: Vec<TaskTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    solution: Option<Vec<usize>>,
}

impl Task {
    pub fn new(id: u32, start: impl Into<String>, end: impl Into<String>, targets: Vec<TaskTarget>) -> Self {
        Self {
            id,
            start: start.into(),
            end: end.into(),
            targets,
            solution: None,
        }
    }

    /// Node ids in visiting order: start, targets, end
    pub fn ids(&self) -> Vec<&str> {
        std::iter::once(self.start.as_str())
            .chain(self.targets.iter().map(|t| t.id.as_str()))
            .chain(std::iter::once(self.end.as_str()))
            .collect()
    }

    pub fn required_targets(&self) -> impl Iterator<Item = &TaskTarget> {
        self.targets.iter().filter(|t| t.is_required())
    }

    pub fn target(&self, id: &str) -> Option<&TaskTarget> {
        self.targets.iter().find(|t| t.id == id)
    }

    /// Precomputed contact access indices, if any
    pub fn solution(&self) -> Option<&[usize]> {
        self.solution.as_deref()
    }

    pub fn record_solution(&mut self, accesses: Vec<usize>) -> Result<()> {
        if self.solution.is_some() {
            return Err(ModelError::SolutionAlreadySet(self.id));
        }
        self.solution = Some(accesses);
        Ok(())
    }

    /// Fail fast when the task references nodes the scenario does not define
    pub fn validate_against(&self, scenario: &Scenario) -> Result<()> {
        for (context, id) in [("task start", &self.start), ("task end", &self.end)] {
            if !scenario.contains(id) {
                return Err(ModelError::UnknownNode {
                    context: format!("{} (task {})", context, self.id),
                    id: id.clone(),
                });
            }
        }
        for target in &self.targets {
            if !scenario.contains(&target.id) {
                return Err(ModelError::UnknownNode {
                    context: format!("task {} target", self.id),
                    id: target.id.clone(),
                });
            }
            if target.command.trim().is_empty() {
                return Err(invalid(format!("{}.command", target.id), "must not be empty"));
            }
        }
        Ok(())
    }
}
