//! remindful-store: key-value persistence, task CRUD and notification history.

pub mod backend;
pub mod data_store;
pub mod history;

pub use backend::{BackendError, InMemoryStore, JsonFileStore, StoreBackend};
pub use data_store::DataStore;
pub use history::NotificationLog;
