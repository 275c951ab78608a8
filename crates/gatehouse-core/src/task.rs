use crate::policy::Policy;
use crate::types::TaskStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    /// Display order is file order; resolution treats this as a set.
    pub tags: Vec<String>,
    pub status: TaskStatus,
    /// 1-based line in the task list this record came from.
    pub source_line: usize,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            tags,
            status: TaskStatus::Open,
            source_line: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == TaskStatus::Open
    }
}

// ---------------------------------------------------------------------------
// TaskSource
// ---------------------------------------------------------------------------

/// Which open tasks a run should pick up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskSource {
    /// Open tasks listed in `pilot.include_task_ids`.
    #[default]
    Pilot,
    All,
    /// Open tasks named explicitly on the command line.
    Ids,
}

impl TaskSource {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskSource::Pilot => "pilot",
            TaskSource::All => "all",
            TaskSource::Ids => "ids",
        }
    }
}

impl fmt::Display for TaskSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pilot" => Ok(TaskSource::Pilot),
            "all" => Ok(TaskSource::All),
            "ids" => Ok(TaskSource::Ids),
            _ => Err(format!(
                "unknown task source '{s}': must be pilot, all, or ids"
            )),
        }
    }
}

/// Filter `tasks` down to the open tasks a run should process, keeping
/// file order.
pub fn select_tasks<'a>(
    tasks: &'a [Task],
    source: TaskSource,
    policy: &Policy,
    task_ids: &[String],
) -> Vec<&'a Task> {
    tasks
        .iter()
        .filter(|t| t.is_open())
        .filter(|t| match source {
            TaskSource::All => true,
            TaskSource::Ids => task_ids.iter().any(|id| *id == t.id),
            TaskSource::Pilot => policy.is_pilot_task(&t.id),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn policy_with_pilot(ids: &[&str]) -> Policy {
        let yaml = format!(
            "retry: {{max_retries: 1}}\n\
             defaults: {{default_profile: p}}\n\
             tags_to_profiles: {{}}\n\
             gates: {{g: {{command: \"true\"}}}}\n\
             profiles: {{p: {{blocking: false, gates: [g]}}}}\n\
             pilot: {{include_task_ids: [{}]}}\n",
            ids.join(", ")
        );
        Policy::parse(&yaml).unwrap()
    }

    fn tasks() -> Vec<Task> {
        let mut done = Task::new("S02", "Done already", vec![]);
        done.status = TaskStatus::Done;
        vec![
            Task::new("S01", "First", vec!["auth".to_string()]),
            done,
            Task::new("S03", "Third", vec![]),
        ]
    }

    fn ids(selected: &[&Task]) -> Vec<String> {
        selected.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn all_keeps_open_tasks_in_order() {
        let policy = policy_with_pilot(&[]);
        let tasks = tasks();
        let selected = select_tasks(&tasks, TaskSource::All, &policy, &[]);
        assert_eq!(ids(&selected), vec!["S01", "S03"]);
    }

    #[test]
    fn ids_never_selects_done_tasks() {
        let policy = policy_with_pilot(&[]);
        let tasks = tasks();
        let wanted = vec!["S02".to_string(), "S03".to_string()];
        let selected = select_tasks(&tasks, TaskSource::Ids, &policy, &wanted);
        assert_eq!(ids(&selected), vec!["S03"]);
    }

    #[test]
    fn pilot_uses_policy_list() {
        let policy = policy_with_pilot(&["S01"]);
        let tasks = tasks();
        let selected = select_tasks(&tasks, TaskSource::Pilot, &policy, &[]);
        assert_eq!(ids(&selected), vec!["S01"]);
    }

    #[test]
    fn task_source_parses() {
        assert_eq!("ids".parse::<TaskSource>().unwrap(), TaskSource::Ids);
        assert_eq!(TaskSource::default(), TaskSource::Pilot);
        assert!("some".parse::<TaskSource>().is_err());
    }
}
