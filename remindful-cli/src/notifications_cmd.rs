use anyhow::{Result, bail};
use chrono_tz::Tz;
use clap::Subcommand;
use remindful_core::NotificationRecord;
use remindful_core::time::format_local;

use crate::config::Config;
use crate::daemon::open_history;
use crate::state::Paths;
use crate::tasks_cmd::display_zone;

#[derive(Subcommand, Debug)]
pub enum NotificationsCommand {
    /// Delivered notifications, newest first
    List {
        /// Only unread ones
        #[arg(long, default_value_t = false)]
        unread: bool,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Mark one notification (or --all) as read
    Read {
        #[arg(required_unless_present = "all")]
        id: Option<String>,

        #[arg(long, default_value_t = false, conflicts_with = "id")]
        all: bool,
    },

    /// Forget every delivered notification
    Clear,
}

pub fn run(cmd: NotificationsCommand, paths: &Paths, cfg: &Config) -> Result<()> {
    let history = open_history(paths)?;
    match cmd {
        NotificationsCommand::List { unread, limit } => {
            let records: Vec<NotificationRecord> = history
                .history()?
                .into_iter()
                .filter(|r| !unread || !r.read)
                .take(limit)
                .collect();
            if records.is_empty() {
                println!("No notifications.");
                return Ok(());
            }
            let tz = display_zone(cfg)?;
            for r in &records {
                println!("{}", record_line(r, tz));
            }
        }
        NotificationsCommand::Read { id: _, all: true } => {
            let n = history.mark_all_read()?;
            println!("Marked {n} notification(s) read");
        }
        NotificationsCommand::Read { id: Some(id), all: false } => {
            if !history.mark_read(&id)? {
                bail!("no notification with id '{id}'");
            }
            println!("Marked {id} read");
        }
        NotificationsCommand::Read { id: None, all: false } => {
            bail!("pass a notification id or --all");
        }
        NotificationsCommand::Clear => {
            history.clear()?;
            println!("Notification history cleared");
        }
    }
    Ok(())
}

fn record_line(r: &NotificationRecord, tz: Tz) -> String {
    format!(
        "{} {}  {}  {} ({})  [{}]",
        if r.read { " " } else { "*" },
        format_local(r.timestamp, tz),
        r.id,
        r.title,
        r.body,
        r.priority.as_str()
    )
}
