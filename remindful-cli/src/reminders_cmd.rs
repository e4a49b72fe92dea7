use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use clap::Subcommand;
use remindful_core::time::format_local;
use remindful_core::{Reminder, RepeatInterval, Task, TaskUpdate};

use crate::config::Config;
use crate::daemon::{build_scheduler, open_store};
use crate::notifier::DesktopNotifier;
use crate::state::Paths;
use crate::tasks_cmd::{display_zone, future_instant, resolve_id, short_id};

#[derive(Subcommand, Debug)]
pub enum ReminderCommand {
    /// Attach or replace a task's reminder
    Set {
        id: String,

        /// Local time "YYYY-MM-DD HH:MM"
        #[arg(long)]
        at: String,

        /// once, daily or weekly
        #[arg(long, default_value = "once")]
        repeat: RepeatInterval,

        /// IANA zone for --at (default: config display.timezone)
        #[arg(long)]
        tz: Option<String>,
    },

    /// Disable a task's reminder; its time and repeat are kept
    Cancel { id: String },

    /// Tasks with reminders, soonest first
    List,
}

pub fn run(cmd: ReminderCommand, paths: &Paths, cfg: &Config) -> Result<()> {
    match cmd {
        ReminderCommand::Set { id, at, repeat, tz } => {
            let zone = tz.as_deref().unwrap_or(&cfg.display.timezone);
            let trigger_at = future_instant(&at, zone, Utc::now())?;
            set(paths, cfg, &id, Reminder::new(trigger_at, repeat))
        }
        ReminderCommand::Cancel { id } => cancel(paths, cfg, &id),
        ReminderCommand::List => list(paths, cfg),
    }
}

fn set(paths: &Paths, cfg: &Config, id: &str, reminder: Reminder) -> Result<()> {
    let store = open_store(paths)?;
    let id = resolve_id(&store.get_tasks()?, id)?;
    let task = store.update_task(&id, TaskUpdate::reminder(reminder))?;

    let tz = display_zone(cfg)?;
    if let Some(r) = &task.reminder {
        println!("{}: {}", task.title, reminder_summary(r, tz, Utc::now()));
    }
    Ok(())
}

fn cancel(paths: &Paths, cfg: &Config, id: &str) -> Result<()> {
    let store = open_store(paths)?;
    let id = resolve_id(&store.get_tasks()?, id)?;

    let scheduler = build_scheduler(store, DesktopNotifier::from_config(&cfg.notifications))?;
    scheduler.cancel_reminder(&id).context("cancel reminder")?;
    println!("Reminder for {} cancelled", short_id(&id));
    Ok(())
}

fn list(paths: &Paths, cfg: &Config) -> Result<()> {
    let store = open_store(paths)?;
    let tasks = with_reminders(store.get_tasks()?);
    if tasks.is_empty() {
        println!("No reminders.");
        return Ok(());
    }

    let tz = display_zone(cfg)?;
    let now = Utc::now();
    for (task, reminder) in &tasks {
        println!(
            "- {}  {}  ({})",
            short_id(&task.id),
            task.title,
            reminder_summary(reminder, tz, now)
        );
    }
    Ok(())
}

/// Tasks carrying a reminder, ordered by next trigger.
fn with_reminders(tasks: Vec<Task>) -> Vec<(Task, Reminder)> {
    let mut out: Vec<(Task, Reminder)> = tasks
        .into_iter()
        .filter_map(|t| t.reminder.clone().map(|r| (t, r)))
        .collect();
    out.sort_by(|a, b| a.1.next_trigger.cmp(&b.1.next_trigger));
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderState {
    Scheduled,
    /// Enabled but its next trigger already passed; it will not fire.
    Missed,
    Off,
}

pub fn reminder_state(reminder: &Reminder, now: DateTime<Utc>) -> ReminderState {
    if !reminder.enabled {
        ReminderState::Off
    } else if reminder.next_trigger <= now {
        ReminderState::Missed
    } else {
        ReminderState::Scheduled
    }
}

pub fn reminder_summary(reminder: &Reminder, tz: Tz, now: DateTime<Utc>) -> String {
    let when = format_local(reminder.next_trigger, tz);
    match reminder_state(reminder, now) {
        ReminderState::Scheduled => format!("{}, next {when}", reminder.repeat),
        ReminderState::Missed => format!("{}, missed {when}", reminder.repeat),
        ReminderState::Off => format!("{}, off (was {when})", reminder.repeat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 4, h, 0, 0).unwrap()
    }

    #[test]
    fn state_reflects_enabled_flag_and_staleness() {
        let r = Reminder::new(at(10), RepeatInterval::Once);
        assert_eq!(reminder_state(&r, at(9)), ReminderState::Scheduled);
        assert_eq!(reminder_state(&r, at(10)), ReminderState::Missed);
        assert_eq!(reminder_state(&r.disabled(), at(9)), ReminderState::Off);
    }

    #[test]
    fn summary_renders_in_display_zone() {
        let r = Reminder::new(at(16), RepeatInterval::Weekly);
        let tz: Tz = "America/New_York".parse().unwrap();
        assert_eq!(reminder_summary(&r, tz, at(9)), "weekly, next 2026-05-04 12:00 EDT");
        assert_eq!(
            reminder_summary(&r.disabled(), Tz::UTC, at(9)),
            "weekly, off (was 2026-05-04 16:00 UTC)"
        );
    }

    #[test]
    fn listing_orders_by_next_trigger_and_skips_plain_tasks() {
        let tasks = vec![
            Task::new("late", "late", at(1)).with_reminder(Reminder::new(at(20), RepeatInterval::Once)),
            Task::new("plain", "plain", at(1)),
            Task::new("early", "early", at(1)).with_reminder(Reminder::new(at(8), RepeatInterval::Daily)),
        ];
        let ids: Vec<String> = with_reminders(tasks).into_iter().map(|(t, _)| t.id).collect();
        assert_eq!(ids, vec!["early", "late"]);
    }
}
