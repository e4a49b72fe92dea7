//! `remindful run`: owns the timers for as long as it runs.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use remindful_core::{ReminderScheduler, startup_alert};
use remindful_store::{DataStore, JsonFileStore, NotificationLog};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::config::Config;
use crate::notifier::DesktopNotifier;
use crate::state::Paths;
use crate::timer::TokioTimer;

/// One store file, shared by the task list and the notification history.
pub type SharedFile = Arc<JsonFileStore>;
pub type AppStore = Arc<DataStore<SharedFile>>;
pub type AppHistory = NotificationLog<SharedFile>;
pub type AppScheduler = ReminderScheduler<AppStore, DesktopNotifier, TokioTimer>;

pub fn open_file(paths: &Paths) -> Result<SharedFile> {
    paths.ensure_home()?;
    let path = paths.store_path();
    let file =
        JsonFileStore::open(&path).with_context(|| format!("open store {}", path.display()))?;
    Ok(Arc::new(file))
}

pub fn open_store(paths: &Paths) -> Result<AppStore> {
    Ok(Arc::new(DataStore::new(open_file(paths)?)))
}

pub fn open_history(paths: &Paths) -> Result<AppHistory> {
    Ok(NotificationLog::new(open_file(paths)?))
}

/// Must be called from inside the tokio runtime.
pub fn build_scheduler(store: AppStore, notifier: DesktopNotifier) -> Result<AppScheduler> {
    let timer = TokioTimer::current().context("reminder timers need a tokio runtime")?;
    Ok(ReminderScheduler::new(store, notifier, timer))
}

pub async fn run(paths: &Paths, cfg: &Config) -> Result<()> {
    let file = open_file(paths)?;
    let store = Arc::new(DataStore::new(Arc::clone(&file)));
    let notifier = DesktopNotifier::from_config(&cfg.notifications)
        .with_history(Arc::new(NotificationLog::new(file)));

    if cfg.notifications.startup_alert {
        let tasks = store.get_tasks().context("load tasks")?;
        if let Some(alert) = startup_alert(&tasks) {
            notifier.alert(&alert);
        }
    }

    let scheduler = build_scheduler(store, notifier)?;
    scheduler.reschedule_all().context("schedule reminders")?;
    println!(
        "remindful running: {} reminder(s) armed, store {}",
        scheduler.active_job_count(),
        scheduler.store().backend().path().display()
    );

    let rescan = Duration::from_secs(cfg.scheduler.rescan_secs.max(1));
    run_until(&scheduler, rescan, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    })
    .await;

    info!("shutting down");
    Ok(())
}

/// Rescan the store every `every` until `shutdown` completes.
pub async fn run_until(scheduler: &AppScheduler, every: Duration, shutdown: impl Future<Output = ()>) {
    let mut tick = tokio::time::interval(every);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; startup already scheduled.
    tick.tick().await;

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = tick.tick() => {
                if let Err(e) = rescan(scheduler) {
                    warn!(error = %e, "store rescan failed");
                }
            }
        }
    }
}

/// Rebuild jobs if another process changed the store file. Returns whether
/// a rebuild happened.
pub fn rescan(scheduler: &AppScheduler) -> Result<bool> {
    let changed = scheduler
        .store()
        .backend()
        .refresh_if_changed()
        .context("refresh store")?;
    if changed {
        scheduler.reschedule_all().context("reschedule reminders")?;
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use remindful_core::{NewReminder, NewTask, RepeatInterval};

    fn reminder_in(hours: i64) -> NewReminder {
        NewReminder {
            trigger_at: Utc::now() + chrono::Duration::hours(hours),
            repeat: RepeatInterval::Once,
        }
    }

    #[tokio::test]
    async fn rescan_picks_up_edits_from_another_process() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::at(dir.path());

        let scheduler = build_scheduler(open_store(&paths).unwrap(), DesktopNotifier::default()).unwrap();
        scheduler.reschedule_all().unwrap();
        assert_eq!(scheduler.active_job_count(), 0);
        assert!(!rescan(&scheduler).unwrap());

        std::thread::sleep(std::time::Duration::from_millis(20));
        let cli = open_store(&paths).unwrap();
        cli.add_task(NewTask::titled("file taxes").with_reminder(reminder_in(3)))
            .unwrap();

        assert!(rescan(&scheduler).unwrap());
        assert_eq!(scheduler.active_job_count(), 1);
        assert!(!rescan(&scheduler).unwrap());
    }

    #[tokio::test]
    async fn run_until_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::at(dir.path());
        let store = open_store(&paths).unwrap();
        store
            .add_task(NewTask::titled("stand up").with_reminder(reminder_in(1)))
            .unwrap();

        let scheduler = build_scheduler(store, DesktopNotifier::default()).unwrap();
        scheduler.reschedule_all().unwrap();

        run_until(&scheduler, Duration::from_millis(5), tokio::time::sleep(Duration::from_millis(30))).await;
        assert_eq!(scheduler.active_job_count(), 1);
    }
}
