//! Two processes sharing one store file: the daemon holding timers and a CLI
//! invocation editing tasks in between.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use remindful_core::testing::{FakeTimer, RecordingSink};
use remindful_core::{
    NewReminder, NewTask, NotificationPayload, NotificationRecord, ReminderScheduler,
    RepeatInterval,
};
use remindful_store::{DataStore, JsonFileStore, NotificationLog};

fn titles(store: &DataStore<JsonFileStore>) -> Vec<String> {
    let mut titles: Vec<String> = store.get_tasks().unwrap().into_iter().map(|t| t.title).collect();
    titles.sort();
    titles
}

#[test]
fn firing_keeps_tasks_added_by_the_cli_and_reports_the_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.json");

    let daemon = Arc::new(DataStore::new(JsonFileStore::open(&path).unwrap()));
    let timer = FakeTimer::default();
    let sink = RecordingSink::default();
    let scheduler = ReminderScheduler::new(Arc::clone(&daemon), sink.clone(), timer.clone());

    let standup = daemon
        .add_task(NewTask::titled("standup").with_reminder(NewReminder {
            trigger_at: Utc::now() + Duration::hours(1),
            repeat: RepeatInterval::Daily,
        }))
        .unwrap();
    scheduler.reschedule_all().unwrap();
    assert!(!daemon.backend().refresh_if_changed().unwrap());

    std::thread::sleep(StdDuration::from_millis(20));
    let cli = DataStore::new(JsonFileStore::open(&path).unwrap());
    cli.add_task(NewTask::titled("from cli")).unwrap();

    timer.fire_latest().unwrap();
    assert_eq!(sink.task_ids(), vec![standup.id.clone()]);

    let on_disk = DataStore::new(JsonFileStore::open(&path).unwrap());
    assert_eq!(titles(&on_disk), vec!["from cli", "standup"]);
    assert!(on_disk.get_task(&standup.id).unwrap().unwrap().reminder.unwrap().enabled);

    // The daemon must still rebuild its jobs for the CLI's edit.
    assert!(daemon.backend().refresh_if_changed().unwrap());
    assert!(!daemon.backend().refresh_if_changed().unwrap());
}

#[test]
fn task_and_history_writers_share_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tasks.json");
    let backend = Arc::new(JsonFileStore::open(&path).unwrap());
    let tasks = DataStore::new(Arc::clone(&backend));
    let log = NotificationLog::new(Arc::clone(&backend));

    tasks.add_task(NewTask::titled("pay rent")).unwrap();
    let payload = NotificationPayload {
        title: "pay rent".to_string(),
        body: "Low priority".to_string(),
    };
    log.record(NotificationRecord::alert(&payload, Utc::now())).unwrap();

    // A CLI marks everything read while the daemon keeps writing tasks.
    std::thread::sleep(StdDuration::from_millis(20));
    let cli_log = NotificationLog::new(JsonFileStore::open(&path).unwrap());
    assert_eq!(cli_log.mark_all_read().unwrap(), 1);
    tasks.add_task(NewTask::titled("call mum")).unwrap();

    let reopened = Arc::new(JsonFileStore::open(&path).unwrap());
    assert_eq!(DataStore::new(Arc::clone(&reopened)).get_tasks().unwrap().len(), 2);
    assert!(NotificationLog::new(reopened).history().unwrap()[0].read);
}
