//! Task list helpers used by the CLI views.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::task::{Priority, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriorityFilter {
    #[default]
    All,
    Only(Priority),
}

impl FromStr for PriorityFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(PriorityFilter::All),
            "high" => Ok(PriorityFilter::Only(Priority::High)),
            "medium" => Ok(PriorityFilter::Only(Priority::Medium)),
            "low" => Ok(PriorityFilter::Only(Priority::Low)),
            other => Err(format!("unknown priority filter '{other}'")),
        }
    }
}

impl fmt::Display for PriorityFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriorityFilter::All => f.write_str("all"),
            PriorityFilter::Only(p) => f.write_str(p.as_str()),
        }
    }
}

pub fn filter_by_priority(tasks: &[Task], filter: PriorityFilter) -> Vec<Task> {
    match filter {
        PriorityFilter::All => tasks.to_vec(),
        PriorityFilter::Only(p) => tasks.iter().filter(|t| t.priority == p).cloned().collect(),
    }
}

/// Group by `"<status>:<priority>"`, e.g. `"pending:high"`.
/// Every task lands in exactly one group; input order is kept within a group.
pub fn group_by_status_and_priority(tasks: &[Task]) -> BTreeMap<String, Vec<Task>> {
    let mut groups: BTreeMap<String, Vec<Task>> = BTreeMap::new();
    for task in tasks {
        let key = format!("{}:{}", task.status.as_str(), task.priority.as_str());
        groups.entry(key).or_default().push(task.clone());
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskStatus;
    use chrono::Utc;

    fn sample() -> Vec<Task> {
        let now = Utc::now();
        vec![
            Task::new("a", "a", now).with_priority(Priority::High),
            Task::new("b", "b", now).with_priority(Priority::Low),
            Task::new("c", "c", now)
                .with_priority(Priority::High)
                .with_status(TaskStatus::Completed),
            Task::new("d", "d", now).with_priority(Priority::High),
        ]
    }

    #[test]
    fn all_filter_returns_everything() {
        assert_eq!(filter_by_priority(&sample(), PriorityFilter::All).len(), 4);
    }

    #[test]
    fn priority_filter_keeps_matching_only() {
        let out = filter_by_priority(&sample(), "high".parse().unwrap());
        let ids: Vec<&str> = out.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c", "d"]);
    }

    #[test]
    fn grouping_partitions_tasks() {
        let tasks = sample();
        let groups = group_by_status_and_priority(&tasks);
        let total: usize = groups.values().map(Vec::len).sum();
        assert_eq!(total, tasks.len());

        let ids: Vec<&str> = groups["pending:high"].iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d"]);
        assert_eq!(groups["completed:high"].len(), 1);
        assert_eq!(groups["pending:low"].len(), 1);
    }
}
