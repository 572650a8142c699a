//! Flight plan compiler
//!
//! Walks the contact plan in start order, carrying the payload produced by
//! the last target visit:
//!
//! | Contact reaches | Emitted at `start`     | Emitted at `start + 1`        |
//! |-----------------|------------------------|-------------------------------|
//! | relay           | `fp_send <to>`         | `send_data <to> <payload>` if a payload is pending |
//! | task target     | the target's command   | (a defined result becomes the pending payload) |
//! | anything else   | nothing                |                               |

use crate::{Contact, ContactPlan, Result};
use mission_model::{Scenario, Task};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightPlanEntry {
    pub time: i64,
    /// Node that executes the command: the sender of the contact
    pub node: String,
    pub command: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlightPlan {
    pub entries: Vec<FlightPlanEntry>,
}

impl FlightPlan {
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = csv::Writer::from_path(path)?;
        if self.entries.is_empty() {
            writer.write_record(["time", "node", "command"])?;
        }
        for entry in &self.entries {
            writer.serialize(entry)?;
        }
        writer.flush()?;
        info!("Wrote {} flight plan entries to {:?}", self.entries.len(), path);
        Ok(())
    }
}

/// Fold state carried between contacts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompilerState {
    pub pending: Option<String>,
}

pub struct FlightPlanCompiler<'a> {
    task: &'a Task,
    relays: HashSet<String>,
}

impl<'a> FlightPlanCompiler<'a> {
    pub fn new(task: &'a Task, relays: HashSet<String>) -> Self {
        Self { task, relays }
    }

    pub fn for_scenario(task: &'a Task, scenario: &Scenario) -> Self {
        Self::new(task, scenario.relay_ids().into_iter().map(String::from).collect())
    }

    /// One fold step: the entries a contact produces and the next state
    pub fn step(&self, state: CompilerState, contact: &Contact) -> (CompilerState, Vec<FlightPlanEntry>) {
        let entry = |time: i64, command: String| FlightPlanEntry {
            time,
            node: contact.from.clone(),
            command,
        };

        if self.relays.contains(&contact.to) {
            let mut entries = vec![entry(contact.start, format!("fp_send {}", contact.to))];
            if let Some(data) = &state.pending {
                entries.push(entry(contact.start + 1, format!("send_data {} {}", contact.to, data)));
            }
            return (state, entries);
        }

        match self.task.target(&contact.to) {
            Some(target) => {
                let pending = target.result.clone().or(state.pending);
                (
                    CompilerState { pending },
                    vec![entry(contact.start, target.command.clone())],
                )
            }
            None => {
                debug!("Contact {} to {} emits no command", contact.access, contact.to);
                (state, Vec::new())
            }
        }
    }

    pub fn compile(&self, plan: &ContactPlan) -> FlightPlan {
        let (_, entries) = plan.contacts.iter().fold(
            (CompilerState::default(), Vec::new()),
            |(state, mut entries), contact| {
                let (state, emitted) = self.step(state, contact);
                entries.extend(emitted);
                (state, entries)
            },
        );
        info!("Compiled {} contacts into {} commands", plan.len(), entries.len());
        FlightPlan { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fitness::tests::{contact, ids};
    use mission_model::TaskTarget;

    fn task() -> Task {
        Task::new(
            1,
            "A",
            "B",
            vec![
                TaskTarget {
                    id: "T".into(),
                    command: "sim_take_data data1".into(),
                    result: Some("data1".into()),
                    prio: 1,
                },
                TaskTarget {
                    id: "U".into(),
                    command: "sim_ping".into(),
                    result: None,
                    prio: 0,
                },
            ],
        )
    }

    fn plan() -> ContactPlan {
        ContactPlan::new(vec![
            contact(0, "A", "S1", 100, 200),
            contact(1, "S1", "T", 300, 400),
            contact(2, "S1", "U", 420, 430),
            contact(3, "S1", "S2", 500, 600),
            contact(4, "S2", "V", 650, 660),
            contact(5, "S2", "B", 700, 800),
        ])
    }

    fn at(time: i64, node: &str, command: &str) -> FlightPlanEntry {
        FlightPlanEntry {
            time,
            node: node.into(),
            command: command.into(),
        }
    }

    #[test]
    fn test_compile_relays_and_targets() {
        let task = task();
        let compiler = FlightPlanCompiler::new(&task, ids(&["A", "B", "S1", "S2"]));
        let flight_plan = compiler.compile(&plan());

        assert_eq!(
            flight_plan.entries,
            vec![
                at(100, "A", "fp_send S1"),
                at(300, "S1", "sim_take_data data1"),
                at(420, "S1", "sim_ping"),
                at(500, "S1", "fp_send S2"),
                at(501, "S1", "send_data S2 data1"),
                at(700, "S2", "fp_send B"),
                at(701, "S2", "send_data B data1"),
            ]
        );
    }

    #[test]
    fn test_step_keeps_payload_without_result() {
        let task = task();
        let compiler = FlightPlanCompiler::new(&task, ids(&["S1"]));
        let state = CompilerState {
            pending: Some("data0".into()),
        };
        let (state, entries) = compiler.step(state, &contact(0, "S1", "U", 10, 20));
        assert_eq!(state.pending.as_deref(), Some("data0"));
        assert_eq!(entries, vec![at(10, "S1", "sim_ping")]);

        let (state, entries) = compiler.step(state, &contact(1, "S1", "V", 30, 40));
        assert_eq!(state.pending.as_deref(), Some("data0"));
        assert!(entries.is_empty());
    }

    #[test]
    fn test_compilation_is_idempotent() {
        let task = task();
        let compiler = FlightPlanCompiler::new(&task, ids(&["A", "B", "S1", "S2"]));
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");

        compiler.compile(&plan()).write_csv(&first).unwrap();
        compiler.compile(&plan()).write_csv(&second).unwrap();

        let bytes = std::fs::read(&first).unwrap();
        assert_eq!(bytes, std::fs::read(&second).unwrap());
        assert!(String::from_utf8(bytes).unwrap().starts_with("time,node,command\n100,A,fp_send S1"));
    }
}
