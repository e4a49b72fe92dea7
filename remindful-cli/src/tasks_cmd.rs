use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::Subcommand;
use remindful_core::time::{parse_local_to_utc, parse_timezone};
use remindful_core::{
    NewReminder, NewTask, Priority, PriorityFilter, RepeatInterval, Task, TaskStatus, TaskUpdate,
    filter_by_priority, group_by_status_and_priority,
};

use crate::config::Config;
use crate::daemon::{build_scheduler, open_store};
use crate::notifier::DesktopNotifier;
use crate::reminders_cmd::reminder_summary;
use crate::state::Paths;

#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// Create a task, optionally with a reminder
    Add {
        title: String,

        #[arg(long)]
        description: Option<String>,

        /// high, medium or low (default: low)
        #[arg(long)]
        priority: Option<Priority>,

        /// Repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Local time "YYYY-MM-DD HH:MM"
        #[arg(long)]
        remind_at: Option<String>,

        /// once, daily or weekly; only used with --remind-at
        #[arg(long, default_value = "once")]
        repeat: RepeatInterval,

        /// IANA zone for --remind-at (default: config display.timezone)
        #[arg(long)]
        tz: Option<String>,
    },

    /// List tasks in store order
    List {
        /// all, high, medium or low
        #[arg(long, default_value = "all")]
        priority: PriorityFilter,

        /// Group by status and priority
        #[arg(long, default_value_t = false)]
        grouped: bool,
    },

    /// Set a task's status (pending, in-progress, completed)
    Status { id: String, status: TaskStatus },

    /// Delete a task and cancel its reminder
    Delete { id: String },

    /// Move the given tasks to the top, in order
    Reorder {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

pub fn run(cmd: TaskCommand, paths: &Paths, cfg: &Config) -> Result<()> {
    match cmd {
        TaskCommand::Add {
            title,
            description,
            priority,
            tags,
            remind_at,
            repeat,
            tz,
        } => {
            let zone = tz.as_deref().unwrap_or(&cfg.display.timezone);
            let reminder = remind_at
                .map(|at| future_instant(&at, zone, Utc::now()))
                .transpose()?
                .map(|trigger_at| NewReminder { trigger_at, repeat });
            add(paths, cfg, title, description, priority, tags, reminder)
        }
        TaskCommand::List { priority, grouped } => list(paths, cfg, priority, grouped),
        TaskCommand::Status { id, status } => set_status(paths, &id, status),
        TaskCommand::Delete { id } => delete(paths, cfg, &id),
        TaskCommand::Reorder { ids } => reorder(paths, &ids),
    }
}

fn add(
    paths: &Paths,
    cfg: &Config,
    title: String,
    description: Option<String>,
    priority: Option<Priority>,
    tags: Vec<String>,
    reminder: Option<NewReminder>,
) -> Result<()> {
    let store = open_store(paths)?;
    let task = store.add_task(NewTask {
        title,
        description,
        priority,
        reminder,
        tags,
        ..NewTask::default()
    })?;

    let tz = display_zone(cfg)?;
    println!("Added {}", task_line(&task, tz, Utc::now()));
    Ok(())
}

fn list(paths: &Paths, cfg: &Config, filter: PriorityFilter, grouped: bool) -> Result<()> {
    let store = open_store(paths)?;
    let tasks = filter_by_priority(&store.get_tasks()?, filter);
    if tasks.is_empty() {
        println!("No tasks.");
        return Ok(());
    }

    let tz = display_zone(cfg)?;
    let now = Utc::now();
    if grouped {
        for (group, members) in group_by_status_and_priority(&tasks) {
            println!("## {group} ({})", members.len());
            for t in &members {
                println!("- {}", task_line(t, tz, now));
            }
            println!();
        }
    } else {
        for t in &tasks {
            println!("- {}", task_line(t, tz, now));
        }
    }
    Ok(())
}

fn set_status(paths: &Paths, id: &str, status: TaskStatus) -> Result<()> {
    let store = open_store(paths)?;
    let id = resolve_id(&store.get_tasks()?, id)?;
    let task = store.update_task(&id, TaskUpdate::status(status))?;
    println!("{} -> {}", task.title, task.status.as_str());
    Ok(())
}

fn delete(paths: &Paths, cfg: &Config, id: &str) -> Result<()> {
    let store = open_store(paths)?;
    let id = resolve_id(&store.get_tasks()?, id)?;

    let scheduler = build_scheduler(store, DesktopNotifier::from_config(&cfg.notifications))?;
    scheduler.cancel_reminder(&id).context("cancel reminder")?;
    scheduler.store().delete_task(&id)?;
    println!("Deleted {}", short_id(&id));
    Ok(())
}

fn reorder(paths: &Paths, ids: &[String]) -> Result<()> {
    let store = open_store(paths)?;
    let tasks = store.get_tasks()?;
    let resolved = ids
        .iter()
        .map(|id| resolve_id(&tasks, id))
        .collect::<Result<Vec<_>>>()?;
    store.reorder_tasks(&resolved)?;
    println!("Reordered {} task(s)", resolved.len());
    Ok(())
}

pub(crate) fn display_zone(cfg: &Config) -> Result<Tz> {
    parse_timezone(&cfg.display.timezone).context("config display.timezone")
}

/// Parse a local "YYYY-MM-DD HH:MM" in `tz`; reminders only make sense in
/// the future.
pub(crate) fn future_instant(local: &str, tz: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let at = parse_local_to_utc(local, tz)?;
    if at <= now {
        bail!("{local} ({tz}) is not in the future");
    }
    Ok(at)
}

/// Find the one task whose id starts with `prefix`.
pub(crate) fn resolve_id(tasks: &[Task], prefix: &str) -> Result<String> {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        bail!("task id cannot be empty");
    }
    if let Some(exact) = tasks.iter().find(|t| t.id == prefix) {
        return Ok(exact.id.clone());
    }
    let matches: Vec<&Task> = tasks.iter().filter(|t| t.id.starts_with(prefix)).collect();
    match matches.as_slice() {
        [one] => Ok(one.id.clone()),
        [] => bail!("no task matches id '{prefix}'"),
        many => bail!("id '{prefix}' is ambiguous ({} tasks match)", many.len()),
    }
}

pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

pub(crate) fn task_line(task: &Task, tz: Tz, now: DateTime<Utc>) -> String {
    let mut line = format!(
        "{}  [{}] [{}] {}",
        short_id(&task.id),
        task.status.as_str(),
        task.priority.as_str(),
        task.title
    );
    if !task.tags.is_empty() {
        line.push_str(&format!("  #{}", task.tags.join(" #")));
    }
    if let Some(r) = &task.reminder {
        line.push_str(&format!("  ({})", reminder_summary(r, tz, now)));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use remindful_core::Reminder;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, h, 0, 0).unwrap()
    }

    #[test]
    fn resolve_id_accepts_unique_prefix_or_exact_id() {
        let tasks = vec![
            Task::new("abc123", "one", at(9)),
            Task::new("abd456", "two", at(9)),
            Task::new("ab", "three", at(9)),
        ];
        assert_eq!(resolve_id(&tasks, "abc").unwrap(), "abc123");
        assert_eq!(resolve_id(&tasks, "ab").unwrap(), "ab");
        assert!(resolve_id(&tasks, "a").is_err());
        assert!(resolve_id(&tasks, "zzz").is_err());
        assert!(resolve_id(&tasks, "  ").is_err());
    }

    #[test]
    fn future_instant_rejects_past_times() {
        let now = at(12);
        assert_eq!(future_instant("2026-05-04 13:00", "UTC", now).unwrap(), at(13));
        assert!(future_instant("2026-05-04 12:00", "UTC", now).is_err());
        assert!(future_instant("tomorrow", "UTC", now).is_err());
    }

    #[test]
    fn task_line_shows_tags_and_reminder() {
        let mut task = Task::new("0123456789abcdef", "Water plants", at(8))
            .with_priority(Priority::Medium)
            .with_reminder(Reminder::new(at(18), RepeatInterval::Daily));
        task.tags = vec!["home".to_string(), "garden".to_string()];

        let line = task_line(&task, Tz::UTC, at(9));
        assert_eq!(
            line,
            "01234567  [pending] [medium] Water plants  #home #garden  (daily, next 2026-05-04 18:00 UTC)"
        );
    }
}
