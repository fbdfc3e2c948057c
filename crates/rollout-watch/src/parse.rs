//! Extract the latest firmware row from the rollout table.
//!
//! The page lists firmware newest first, so the first `<tr>` whose leading
//! cell looks like a version label is taken as the current build. Counts are
//! read from column 1 (installed) and column 3 (pending); column 2 holds a
//! percentage and is ignored.

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

use crate::types::{Observation, WatchError, WatchResult};

/// Version labels are never this long; longer cells are prose, not versions.
const MAX_VERSION_LEN: usize = 25;

const INSTALLED_COLUMN: usize = 1;
const PENDING_COLUMN: usize = 3;

/// Which count cell fell back to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CountField {
    Installed,
    Pending,
}

impl std::fmt::Display for CountField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CountField::Installed => write!(f, "installed"),
            CountField::Pending => write!(f, "pending"),
        }
    }
}

/// A count cell whose text could not be read as a number and was taken as 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountFallback {
    pub field: CountField,
    /// Cell text as found, or `None` when the row has no such column.
    pub raw: Option<String>,
}

/// Result of parsing the rollout table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRow {
    pub observation: Observation,
    /// Every count cell that was replaced by 0. Empty when the row was clean.
    pub fallbacks: Vec<CountFallback>,
    pub installed: u64,
    pub pending: u64,
}

/// Whether a cell's text looks like a firmware version label (e.g. `2025.44.1`).
pub fn is_version_label(text: &str) -> bool {
    text.starts_with("20") && text.contains('.') && text.chars().count() < MAX_VERSION_LEN
}

/// Parse a count cell, ignoring thousands separators.
///
/// Returns `None` for empty or non-digit text.
pub fn parse_count(raw: &str) -> Option<u64> {
    let digits: String = raw
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Find the newest firmware row in `html` and compute its rollout count.
///
/// Fails only when no row carries a version label, which usually means the
/// page layout changed. Unreadable counts become 0 and are listed in
/// [`ParsedRow::fallbacks`].
pub fn parse_latest_row(html: &str) -> WatchResult<ParsedRow> {
    let document = Html::parse_document(html);
    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;

    for row in document.select(&row_sel) {
        let cells: Vec<ElementRef<'_>> = row.select(&cell_sel).collect();
        let Some(first) = cells.first() else {
            continue;
        };

        let label = cell_text(first);
        if !is_version_label(&label) {
            continue;
        }

        let mut fallbacks = Vec::new();

        let installed_raw = cells.get(INSTALLED_COLUMN).map(cell_text);
        let parsed_installed = installed_raw.as_deref().and_then(parse_count);
        let installed = match parsed_installed {
            Some(n) => n,
            None => {
                fallbacks.push(CountFallback {
                    field: CountField::Installed,
                    raw: installed_raw,
                });
                0
            }
        };

        // An empty or absent pending cell just means nothing is queued.
        let pending_raw = cells.get(PENDING_COLUMN).map(cell_text);
        let pending = match pending_raw.as_deref() {
            None | Some("") => 0,
            Some(text) => match parse_count(text) {
                Some(n) => n,
                None => {
                    fallbacks.push(CountFallback {
                        field: CountField::Pending,
                        raw: pending_raw.clone(),
                    });
                    0
                }
            },
        };

        for fb in &fallbacks {
            tracing::warn!(
                version = %label,
                field = %fb.field,
                raw = ?fb.raw,
                "unreadable count cell, using 0"
            );
        }

        return Ok(ParsedRow {
            observation: Observation::new(label, installed.saturating_add(pending)),
            fallbacks,
            installed,
            pending,
        });
    }

    Err(WatchError::Parse(
        "no table row with a firmware version found; page structure may have changed".to_string(),
    ))
}

fn selector(css: &str) -> WatchResult<Selector> {
    Selector::parse(css).map_err(|e| WatchError::Parse(format!("bad selector {css:?}: {e:?}")))
}

fn cell_text(cell: &ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}
