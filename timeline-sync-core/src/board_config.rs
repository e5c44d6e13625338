//! Per-board sync configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which propagation directions are active for a board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    DatesToTimeline,
    TimelineToDates,
    #[default]
    Bidirectional,
}

impl SyncMode {
    /// True when date column changes should be written to the timeline.
    pub fn allows_dates_to_timeline(self) -> bool {
        matches!(self, SyncMode::DatesToTimeline | SyncMode::Bidirectional)
    }

    /// True when timeline changes should be written to the date columns.
    pub fn allows_timeline_to_dates(self) -> bool {
        matches!(self, SyncMode::TimelineToDates | SyncMode::Bidirectional)
    }
}

/// Stored under `config:<boardId>`, one per configured board.
///
/// The three column ids are validated against the board's actual columns
/// (and checked for distinctness) before a config is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSyncConfig {
    pub board_id: i64,
    pub start_date_column_id: String,
    pub end_date_column_id: String,
    pub timeline_column_id: String,
    pub sync_mode: SyncMode,
    pub api_token: String,
    pub installed_at: DateTime<Utc>,
}
