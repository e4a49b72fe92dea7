//! Notification history under the `notification_history` key.

use std::sync::{Mutex, PoisonError};

use remindful_core::{NotificationRecord, StoreError, mark_read, push_history};
use serde_json::Value;
use tracing::debug;

use crate::backend::StoreBackend;

const HISTORY_KEY: &str = "notification_history";

#[derive(Debug)]
pub struct NotificationLog<B> {
    backend: B,
    write_lock: Mutex<()>,
}

impl<B: StoreBackend> NotificationLog<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    /// Delivered notifications, newest first.
    pub fn history(&self) -> Result<Vec<NotificationRecord>, StoreError> {
        self.backend.refresh()?;
        match self.backend.get(HISTORY_KEY)? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(v) => serde_json::from_value(v).map_err(StoreError::backend),
        }
    }

    fn save(&self, history: &[NotificationRecord]) -> Result<(), StoreError> {
        let value = serde_json::to_value(history).map_err(StoreError::backend)?;
        self.backend.set(HISTORY_KEY, value)?;
        Ok(())
    }

    pub fn record(&self, record: NotificationRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut history = self.history()?;
        debug!(id = %record.id, "notification recorded");
        push_history(&mut history, record);
        self.save(&history)
    }

    /// Returns whether `id` was found.
    pub fn mark_read(&self, id: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut history = self.history()?;
        if !mark_read(&mut history, id) {
            return Ok(false);
        }
        self.save(&history)?;
        Ok(true)
    }

    /// Returns how many records changed.
    pub fn mark_all_read(&self) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut history = self.history()?;
        let mut changed = 0;
        for record in history.iter_mut().filter(|r| !r.read) {
            record.read = true;
            changed += 1;
        }
        if changed > 0 {
            self.save(&history)?;
        }
        Ok(changed)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.save(&[])
    }
}
