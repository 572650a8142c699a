//! Mission controller
//!
//! Drives one scenario (and optionally one task) through the artifact
//! pipeline. Every stage reuses what earlier runs left behind: a recorded
//! contact list is loaded as is, recorded tracks are rebuilt into contacts
//! without re-sampling, and a task carrying a solution skips the search.

use crate::config::EngineConfig;
use crate::contacts::{write_contacts, ContactList};
use crate::flight_plan::{FlightPlan, FlightPlanCompiler};
use crate::planner::{check_contact_plan, PlanOutcome, Planner};
use crate::tracks::{self, Tracks};
use crate::{ContactPlan, PlanError, Result};
use mission_model::loader::save_json;
use mission_model::{Scenario, Task};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct MissionController {
    scenario: Scenario,
    task: Option<Task>,
    config: EngineConfig,
    output_dir: PathBuf,
    contact_list: Option<ContactList>,
    contact_plan: Option<ContactPlan>,
    outcome: Option<PlanOutcome>,
    flight_plan: Option<FlightPlan>,
}

impl MissionController {
    pub fn new(
        scenario: Scenario,
        task: Option<Task>,
        config: EngineConfig,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            scenario,
            task,
            config,
            output_dir: output_dir.into(),
            contact_list: None,
            contact_plan: None,
            outcome: None,
            flight_plan: None,
        }
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn task(&self) -> Option<&Task> {
        self.task.as_ref()
    }

    /// GA diagnostics of the last search, if one ran
    pub fn outcome(&self) -> Option<&PlanOutcome> {
        self.outcome.as_ref()
    }

    fn artifact(&self, name: &str, id: u32) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}_{}.csv", name, id, self.scenario.start))
    }

    fn ensure_output_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir)?;
        Ok(())
    }

    fn require_task(&self, stage: &'static str) -> Result<&Task> {
        self.task.as_ref().ok_or(PlanError::MissingStage(stage, "a task"))
    }

    pub fn contact_list(&mut self) -> Result<&ContactList> {
        if self.contact_list.is_none() {
            let list = self.load_or_build_contacts()?;
            self.contact_list = Some(list);
        }
        self.contact_list
            .as_ref()
            .ok_or(PlanError::MissingStage("contact plan", "a contact list"))
    }

    fn load_or_build_contacts(&mut self) -> Result<ContactList> {
        if let Some(path) = self.scenario.contacts() {
            return ContactList::read_csv(path);
        }

        self.ensure_output_dir()?;
        let recorded = self.scenario.tracks().map(Path::to_path_buf);
        let tracks = match recorded {
            Some(path) => Tracks::read_csv(path)?,
            None => {
                let tracks = tracks::compute(&self.scenario, &self.config.visibility)?;
                let path = self.artifact("track", self.scenario.id);
                tracks.write_csv(&path)?;
                self.scenario.set_tracks(path)?;
                tracks
            }
        };

        let list = ContactList::from_tracks(&tracks);
        let path = self.artifact("contacts", self.scenario.id);
        list.write_csv(&path)?;
        self.scenario.set_contacts(path)?;
        Ok(list)
    }

    pub fn contact_plan(&mut self) -> Result<&ContactPlan> {
        if self.contact_plan.is_none() {
            let plan = self.design_contact_plan()?;
            self.contact_plan = Some(plan);
        }
        self.contact_plan
            .as_ref()
            .ok_or(PlanError::MissingStage("flight plan", "a contact plan"))
    }

    fn design_contact_plan(&mut self) -> Result<ContactPlan> {
        self.contact_list()?;
        let list = self
            .contact_list
            .as_ref()
            .ok_or(PlanError::MissingStage("contact plan", "a contact list"))?;
        let task = self.require_task("contact plan")?;

        if let Some(solution) = task.solution() {
            info!("Task {} carries solution {:?}, skipping search", task.id, solution);
            let contacts = solution
                .iter()
                .map(|&access| list.by_access(access).cloned().ok_or(PlanError::UnknownAccess(access)))
                .collect::<Result<Vec<_>>>()?;
            let plan = ContactPlan::in_time_order(contacts);
            check_contact_plan(&plan, task);
            return Ok(plan);
        }

        let outcome = Planner::new(self.config.planner.clone()).plan(list, task, &self.scenario)?;
        let task_id = task.id;
        let plan = outcome.plan.clone();

        self.ensure_output_dir()?;
        write_contacts(&self.artifact("contact_plan", task_id), &plan.contacts)?;
        outcome.write_history_csv(self.artifact("fitness", task_id))?;

        if let Some(task) = self.task.as_mut() {
            task.record_solution(plan.accesses())?;
        }
        self.outcome = Some(outcome);
        Ok(plan)
    }

    /// Structural verdict on the current contact plan
    pub fn check_contact_plan(&mut self) -> Result<bool> {
        self.contact_plan()?;
        let task = self.require_task("plan check")?;
        Ok(self
            .contact_plan
            .as_ref()
            .map_or(false, |plan| check_contact_plan(plan, task)))
    }

    pub fn flight_plan(&mut self) -> Result<&FlightPlan> {
        if self.flight_plan.is_none() {
            self.contact_plan()?;
            let task = self.require_task("flight plan")?;
            let plan = self
                .contact_plan
                .as_ref()
                .ok_or(PlanError::MissingStage("flight plan", "a contact plan"))?;

            let flight_plan = FlightPlanCompiler::for_scenario(task, &self.scenario).compile(plan);
            self.ensure_output_dir()?;
            flight_plan.write_csv(self.artifact("flight_plan", task.id))?;
            self.flight_plan = Some(flight_plan);
        }
        self.flight_plan
            .as_ref()
            .ok_or(PlanError::MissingStage("flight plan", "a contact plan"))
    }

    /// Write the scenario and task records, with their recorded artifacts
    /// and solution, next to the generated tables
    pub fn save_records(&self) -> Result<Vec<PathBuf>> {
        self.ensure_output_dir()?;
        let mut written = Vec::new();
        let path = self.output_dir.join(format!("scenario_{}.json", self.scenario.id));
        save_json(&path, &self.scenario)?;
        written.push(path);

        if let Some(task) = &self.task {
            let path = self.output_dir.join(format!("task_{}.json", task.id));
            save_json(&path, task)?;
            written.push(path);
        }
        for path in &written {
            info!("Saved {:?}", path);
        }
        Ok(written)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}
