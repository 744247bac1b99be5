//! Data directory watching with debounced catalog reloads

pub mod watcher;

pub use watcher::{is_data_file, DataWatcher, ReloadService, WatchEvent, DEFAULT_DEBOUNCE};
