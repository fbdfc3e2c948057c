//! rollout-watch CLI — polls a firmware rollout table and alerts on new builds and waves.

pub mod config;
pub mod fetch;
pub mod notify;
pub mod runner;

pub use config::{ConfigOverrides, WatchConfig};
pub use notify::{NotifyOutcome, TelegramNotifier};
pub use runner::{RunError, RunReport, Watcher};
