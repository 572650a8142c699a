//! Scenario and task loading from JSON files

use crate::{Result, Scenario, Task};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

/// Load and validate a scenario definition
pub fn load_scenario(path: impl AsRef<Path>) -> Result<Scenario> {
    let path = path.as_ref();
    info!("Loading scenario from {:?}", path);

    let reader = BufReader::new(File::open(path)?);
    let scenario: Scenario = serde_json::from_reader(reader)?;
    scenario.validate()?;

    info!(
        "Scenario {}: {} satellites, {} stations, {} targets, {}s window at {}s step",
        scenario.id,
        scenario.satellites.len(),
        scenario.stations.len(),
        scenario.targets.len(),
        scenario.duration,
        scenario.step
    );

    Ok(scenario)
}

/// Load a task and check it against its scenario
pub fn load_task(path: impl AsRef<Path>, scenario: &Scenario) -> Result<Task> {
    let path = path.as_ref();
    info!("Loading task from {:?}", path);

    let reader = BufReader::new(File::open(path)?);
    let task: Task = serde_json::from_reader(reader)?;
    task.validate_against(scenario)?;

    info!(
        "Task {}: {} -> {} via {} targets",
        task.id,
        task.start,
        task.end,
        task.targets.len()
    );

    Ok(task)
}

/// Write a record back as pretty JSON, creating parent directories
pub fn save_json<T: Serialize>(path: impl AsRef<Path>, record: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, record)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModelError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SCENARIO: &str = r#"{
        "id": 1,
        "start": 1588054885,
        "duration": 43200,
        "step": 30,
        "satellites": [
            {"id": "STARLINK-1244", "node": 1,
             "tle1": "1 45196U 20012U   20094.58334491 -.00029761  00000-0 -20303-2 0  9999",
             "tle2": "2 45196  52.9956  50.6558 0001754  72.9283 341.9461 15.05609076  1716"}
        ],
        "stations": [
            {"id": "stgo", "node": 10, "lat": -33.3833, "lon": -70.7833, "alt": 476}
        ],
        "targets": [
            {"id": "saa", "lat": -15.0, "lon": -15, "alt": 0},
            {"id": "tokyo", "node": 11, "lat": 35.6830, "lon": 139.7670, "alt": 5}
        ]
    }"#;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_scenario_and_task() {
        let scenario_file = write_temp(SCENARIO);
        let scenario = load_scenario(scenario_file.path()).unwrap();
        assert_eq!(scenario.satellites.len(), 1);
        assert_eq!(scenario.targets.len(), 2);
        assert!(scenario.contacts().is_none());

        let task_file = write_temp(
            r#"{"id": 1, "start": "stgo", "end": "tokyo",
                "targets": [{"id": "saa", "command": "sim_take_data data1", "result": "data1", "prio": 1}]}"#,
        );
        let task = load_task(task_file.path(), &scenario).unwrap();
        assert_eq!(task.ids(), vec!["stgo", "saa", "tokyo"]);
    }

    #[test]
    fn test_task_with_unknown_node_fails_fast() {
        let scenario = load_scenario(write_temp(SCENARIO).path()).unwrap();
        let task_file = write_temp(r#"{"id": 2, "start": "stgo", "end": "paris", "targets": []}"#);
        assert!(matches!(
            load_task(task_file.path(), &scenario),
            Err(ModelError::UnknownNode { .. })
        ));
    }

    #[test]
    fn test_missing_collection_rejected() {
        let json = SCENARIO.replace(r#""targets""#, r#""extra_targets""#);
        assert!(matches!(
            load_scenario(write_temp(&json).path()),
            Err(ModelError::Json(_))
        ));
    }

    #[test]
    fn test_save_json_keeps_artifacts() {
        let mut scenario = load_scenario(write_temp(SCENARIO).path()).unwrap();
        scenario.set_contacts("contacts_1.csv").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/scenario.json");
        save_json(&path, &scenario).unwrap();

        let reloaded = load_scenario(&path).unwrap();
        assert_eq!(reloaded.contacts(), scenario.contacts());
    }
}
