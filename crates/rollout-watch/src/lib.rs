//! rollout-watch — firmware rollout table parsing, change classification, and saved baselines.

pub mod compare;
pub mod parse;
pub mod storage;
pub mod types;

pub use compare::{detail_url, Comparator, Decision};
pub use parse::{parse_latest_row, CountFallback, CountField, ParsedRow};
pub use storage::StateStore;
pub use types::*;
