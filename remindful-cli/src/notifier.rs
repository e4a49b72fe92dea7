//! Console notifier with an optional external command and a delivery
//! history.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;

use chrono::Utc;
use remindful_core::{
    NotificationPayload, NotificationRecord, NotificationSink, Task, build_notification_payload,
};
use tracing::{info, warn};

use crate::config::NotificationsSection;
use crate::daemon::AppHistory;

#[derive(Debug, Default)]
pub struct DesktopNotifier {
    command: Option<PathBuf>,
    args: Vec<String>,
    history: Option<Arc<AppHistory>>,
}

impl DesktopNotifier {
    /// Resolve the configured command on `PATH`. A command that cannot be
    /// found is dropped with a warning; printing still works.
    pub fn from_config(cfg: &NotificationsSection) -> Self {
        let command = cfg.command.as_deref().and_then(|cmd| match which::which(cmd) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(command = cmd, error = %e, "notifier command not found; printing only");
                None
            }
        });
        Self {
            command,
            args: cfg.args.clone(),
            history: None,
        }
    }

    /// Record every delivery in `history`.
    pub fn with_history(mut self, history: Arc<AppHistory>) -> Self {
        self.history = Some(history);
        self
    }

    pub fn has_command(&self) -> bool {
        self.command.is_some()
    }

    /// Show the startup summary and keep it in the history.
    pub fn alert(&self, payload: &NotificationPayload) {
        self.announce(payload);
        self.remember(NotificationRecord::alert(payload, Utc::now()));
    }

    /// Print, log and hand off to the external command. Never waits for the
    /// command; the scheduler calls this while holding its job lock.
    pub fn announce(&self, payload: &NotificationPayload) {
        println!("Reminder: {} ({})", payload.title, payload.body);
        info!(title = %payload.title, body = %payload.body, "notification");

        if let Some(cmd) = &self.command {
            spawn_detached(cmd, &self.args, payload);
        }
    }

    fn remember(&self, record: NotificationRecord) {
        let Some(history) = &self.history else {
            return;
        };
        if let Err(e) = history.record(record) {
            warn!(error = %e, "could not record notification history");
        }
    }
}

fn spawn_detached(cmd: &Path, args: &[String], payload: &NotificationPayload) {
    let child = Command::new(cmd)
        .args(args)
        .arg(&payload.title)
        .arg(&payload.body)
        .stdin(Stdio::null())
        .spawn();
    let mut child = match child {
        Ok(child) => child,
        Err(e) => {
            warn!(command = %cmd.display(), error = %e, "notifier command could not start");
            return;
        }
    };

    let cmd = cmd.to_path_buf();
    // Reap off-thread so a hung notifier only costs a thread.
    thread::spawn(move || match child.wait() {
        Ok(s) if s.success() => {}
        Ok(s) => warn!(command = %cmd.display(), %s, "notifier command failed"),
        Err(e) => warn!(command = %cmd.display(), error = %e, "notifier command wait failed"),
    });
}

impl NotificationSink for DesktopNotifier {
    fn notify(&self, task: &Task) {
        let payload = build_notification_payload(task);
        self.announce(&payload);
        self.remember(NotificationRecord::reminder(task, &payload, Utc::now()));
    }
}
