//! The bidirectional sync engine.
//!
//! Given one column change event and the board's config, decides whether
//! a propagation is needed, which direction it flows, and performs it
//! exactly once. Two guards prevent runaway updates:
//!
//! - an equality check against current values breaks the write→notify→
//!   write oscillation between the date columns and the timeline column
//! - a short-lived debounce marker in the key-value store suppresses
//!   rapid retriggers for the same item
//!
//! The marker is set before the propagation attempt, so a failed sync
//! still holds off retriggers for the full window. No rollback.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info};

use crate::board_config::BoardSyncConfig;
use crate::error::Result;
use crate::event::ColumnChangeEvent;
use crate::monday::{BoardApi, ColumnValue};
use crate::storage::{KvStore, debounce_key};
use crate::values::{DateValue, TimelineValue, parse_date_value, parse_timeline_value};

pub const DEBOUNCE_WINDOW: Duration = Duration::from_secs(5);

/// What the engine did with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Ignored,
    Debounced,
    MissingDates,
    MissingTimeline,
    AlreadyInSync,
    DatesToTimeline,
    TimelineToDates,
}

/// Outcome of handling one column change. Serialized as the webhook
/// response body.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub synced: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<SyncAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncReport {
    fn skipped(action: SyncAction) -> Self {
        SyncReport {
            synced: false,
            action: Some(action),
            error: None,
        }
    }

    fn completed(action: SyncAction) -> Self {
        SyncReport {
            synced: true,
            action: Some(action),
            error: None,
        }
    }

    fn failed(message: String) -> Self {
        SyncReport {
            synced: false,
            action: None,
            error: Some(message),
        }
    }
}

pub struct SyncEngine {
    monday: Arc<dyn BoardApi>,
    storage: Arc<dyn KvStore>,
}

impl SyncEngine {
    pub fn new(monday: Arc<dyn BoardApi>, storage: Arc<dyn KvStore>) -> Self {
        SyncEngine { monday, storage }
    }

    /// Handle one column change. Never returns an error: every failure
    /// path is folded into the report so the webhook endpoint can always
    /// answer with a structured body.
    pub async fn handle_column_change(
        &self,
        event: &ColumnChangeEvent,
        config: &BoardSyncConfig,
    ) -> SyncReport {
        let column_id = event.column_id.as_str();

        if column_id != config.start_date_column_id
            && column_id != config.end_date_column_id
            && column_id != config.timeline_column_id
        {
            return SyncReport::skipped(SyncAction::Ignored);
        }

        match self.is_debounced(event.board_id, event.pulse_id).await {
            Ok(true) => return SyncReport::skipped(SyncAction::Debounced),
            Ok(false) => {}
            Err(e) => return SyncReport::failed(e.to_string()),
        }

        if let Err(e) = self.set_debounce(event.board_id, event.pulse_id).await {
            return SyncReport::failed(e.to_string());
        }

        let is_date_column =
            column_id == config.start_date_column_id || column_id == config.end_date_column_id;

        let outcome = if is_date_column && config.sync_mode.allows_dates_to_timeline() {
            self.sync_dates_to_timeline(event.board_id, event.pulse_id, config)
                .await
        } else if column_id == config.timeline_column_id
            && config.sync_mode.allows_timeline_to_dates()
        {
            self.sync_timeline_to_dates(event.board_id, event.pulse_id, config)
                .await
        } else {
            // Column matched but the direction is disabled by the mode.
            Ok(SyncReport::skipped(SyncAction::Ignored))
        };

        match outcome {
            Ok(report) => report,
            Err(e) => {
                error!(
                    "sync failed for board {} item {}: {e}",
                    event.board_id, event.pulse_id
                );
                SyncReport::failed(e.to_string())
            }
        }
    }

    /// Write the date columns' current range into the timeline column.
    ///
    /// Values are re-read from the API rather than taken from the event
    /// payload, so the sync always acts on latest state.
    async fn sync_dates_to_timeline(
        &self,
        board_id: i64,
        item_id: i64,
        config: &BoardSyncConfig,
    ) -> Result<SyncReport> {
        let columns = self
            .monday
            .item_column_values(
                item_id,
                &[
                    config.start_date_column_id.clone(),
                    config.end_date_column_id.clone(),
                ],
            )
            .await?;

        let start = parse_date_value(raw_value(&columns, &config.start_date_column_id));
        let end = parse_date_value(raw_value(&columns, &config.end_date_column_id));

        let (Some(start), Some(end)) = (start, end) else {
            return Ok(SyncReport::skipped(SyncAction::MissingDates));
        };

        let timeline_columns = self
            .monday
            .item_column_values(item_id, std::slice::from_ref(&config.timeline_column_id))
            .await?;
        let existing = parse_timeline_value(raw_value(&timeline_columns, &config.timeline_column_id));

        if existing.is_some_and(|t| t.from == start && t.to == end) {
            return Ok(SyncReport::skipped(SyncAction::AlreadyInSync));
        }

        let timeline = TimelineValue {
            from: start,
            to: end,
        };
        self.monday
            .change_column_value(
                board_id,
                item_id,
                &config.timeline_column_id,
                &serde_json::to_string(&timeline)?,
            )
            .await?;

        info!("synced dates -> timeline for item {item_id}: {start} to {end}");
        Ok(SyncReport::completed(SyncAction::DatesToTimeline))
    }

    /// Write the timeline's current range back into the two date columns
    /// as a single multi-column mutation.
    async fn sync_timeline_to_dates(
        &self,
        board_id: i64,
        item_id: i64,
        config: &BoardSyncConfig,
    ) -> Result<SyncReport> {
        let columns = self
            .monday
            .item_column_values(item_id, std::slice::from_ref(&config.timeline_column_id))
            .await?;

        let Some(timeline) = parse_timeline_value(raw_value(&columns, &config.timeline_column_id))
        else {
            return Ok(SyncReport::skipped(SyncAction::MissingTimeline));
        };

        let date_columns = self
            .monday
            .item_column_values(
                item_id,
                &[
                    config.start_date_column_id.clone(),
                    config.end_date_column_id.clone(),
                ],
            )
            .await?;
        let existing_start = parse_date_value(raw_value(&date_columns, &config.start_date_column_id));
        let existing_end = parse_date_value(raw_value(&date_columns, &config.end_date_column_id));

        if existing_start == Some(timeline.from) && existing_end == Some(timeline.to) {
            return Ok(SyncReport::skipped(SyncAction::AlreadyInSync));
        }

        let mut values = serde_json::Map::new();
        values.insert(
            config.start_date_column_id.clone(),
            serde_json::to_value(DateValue {
                date: timeline.from,
                time: None,
            })?,
        );
        values.insert(
            config.end_date_column_id.clone(),
            serde_json::to_value(DateValue {
                date: timeline.to,
                time: None,
            })?,
        );
        self.monday
            .change_multiple_columns(board_id, item_id, serde_json::Value::Object(values))
            .await?;

        info!(
            "synced timeline -> dates for item {item_id}: {} to {}",
            timeline.from, timeline.to
        );
        Ok(SyncReport::completed(SyncAction::TimelineToDates))
    }

    async fn is_debounced(&self, board_id: i64, item_id: i64) -> Result<bool> {
        Ok(self
            .storage
            .get(&debounce_key(board_id, item_id))
            .await?
            .is_some())
    }

    async fn set_debounce(&self, board_id: i64, item_id: i64) -> Result<()> {
        self.storage
            .put(&debounce_key(board_id, item_id), "1", Some(DEBOUNCE_WINDOW))
            .await
    }
}

fn raw_value<'a>(columns: &'a [ColumnValue], column_id: &str) -> Option<&'a str> {
    columns
        .iter()
        .find(|c| c.id == column_id)
        .and_then(|c| c.value.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board_config::SyncMode;
    use crate::monday::BoardColumn;
    use crate::storage::MemoryStore;
    use chrono::{NaiveDate, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Board backed by a plain map, recording every write.
    #[derive(Default)]
    struct FakeBoard {
        values: Mutex<HashMap<String, String>>,
        writes: Mutex<Vec<String>>,
    }

    impl FakeBoard {
        fn with_values(pairs: &[(&str, &str)]) -> Arc<Self> {
            let board = FakeBoard::default();
            {
                let mut values = board.values.lock().unwrap();
                for (column, value) in pairs {
                    values.insert(column.to_string(), value.to_string());
                }
            }
            Arc::new(board)
        }

        fn write_count(&self) -> usize {
            self.writes.lock().unwrap().len()
        }

        fn raw(&self, column: &str) -> Option<String> {
            self.values.lock().unwrap().get(column).cloned()
        }
    }

    #[async_trait::async_trait]
    impl BoardApi for FakeBoard {
        async fn item_column_values(
            &self,
            _item_id: i64,
            column_ids: &[String],
        ) -> Result<Vec<ColumnValue>> {
            let values = self.values.lock().unwrap();
            Ok(column_ids
                .iter()
                .map(|id| ColumnValue {
                    id: id.clone(),
                    column_type: String::new(),
                    value: values.get(id).cloned(),
                    text: None,
                })
                .collect())
        }

        async fn change_column_value(
            &self,
            _board_id: i64,
            _item_id: i64,
            column_id: &str,
            value: &str,
        ) -> Result<()> {
            self.values
                .lock()
                .unwrap()
                .insert(column_id.to_string(), value.to_string());
            self.writes.lock().unwrap().push(column_id.to_string());
            Ok(())
        }

        async fn change_multiple_columns(
            &self,
            _board_id: i64,
            _item_id: i64,
            values: serde_json::Value,
        ) -> Result<()> {
            let mut stored = self.values.lock().unwrap();
            let map = values.as_object().cloned().unwrap_or_default();
            for (column_id, value) in &map {
                stored.insert(column_id.clone(), value.to_string());
            }
            self.writes
                .lock()
                .unwrap()
                .push(map.keys().cloned().collect::<Vec<_>>().join("+"));
            Ok(())
        }

        async fn board_columns(&self, _board_id: i64) -> Result<Vec<BoardColumn>> {
            Ok(vec![])
        }

        async fn create_webhook(&self, _board_id: i64, _url: &str, _event: &str) -> Result<i64> {
            Ok(1)
        }

        async fn delete_webhook(&self, _webhook_id: i64) -> Result<()> {
            Ok(())
        }
    }

    /// Board whose reads always fail.
    struct BrokenBoard;

    #[async_trait::async_trait]
    impl BoardApi for BrokenBoard {
        async fn item_column_values(
            &self,
            _item_id: i64,
            _column_ids: &[String],
        ) -> Result<Vec<ColumnValue>> {
            Err(crate::error::SyncError::Api("boom".into()))
        }

        async fn change_column_value(
            &self,
            _board_id: i64,
            _item_id: i64,
            _column_id: &str,
            _value: &str,
        ) -> Result<()> {
            Err(crate::error::SyncError::Api("boom".into()))
        }

        async fn change_multiple_columns(
            &self,
            _board_id: i64,
            _item_id: i64,
            _values: serde_json::Value,
        ) -> Result<()> {
            Err(crate::error::SyncError::Api("boom".into()))
        }

        async fn board_columns(&self, _board_id: i64) -> Result<Vec<BoardColumn>> {
            Err(crate::error::SyncError::Api("boom".into()))
        }

        async fn create_webhook(&self, _board_id: i64, _url: &str, _event: &str) -> Result<i64> {
            Err(crate::error::SyncError::Api("boom".into()))
        }

        async fn delete_webhook(&self, _webhook_id: i64) -> Result<()> {
            Err(crate::error::SyncError::Api("boom".into()))
        }
    }

    fn config(mode: SyncMode) -> BoardSyncConfig {
        BoardSyncConfig {
            board_id: 100,
            start_date_column_id: "start".into(),
            end_date_column_id: "end".into(),
            timeline_column_id: "timeline".into(),
            sync_mode: mode,
            api_token: "token".into(),
            installed_at: Utc::now(),
        }
    }

    fn event(column_id: &str) -> ColumnChangeEvent {
        ColumnChangeEvent {
            user_id: 1,
            board_id: 100,
            pulse_id: 42,
            pulse_name: "Launch".into(),
            column_id: column_id.into(),
            column_type: String::new(),
            value: None,
            previous_value: None,
            changed_at: 0,
            trigger_uuid: "uuid".into(),
        }
    }

    fn engine(board: Arc<dyn BoardApi>) -> (SyncEngine, Arc<MemoryStore>) {
        let storage = Arc::new(MemoryStore::new());
        (SyncEngine::new(board, storage.clone()), storage)
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn unrelated_column_is_ignored() {
        let board = FakeBoard::with_values(&[("start", r#"{"date":"2026-03-01"}"#)]);
        let (engine, storage) = engine(board.clone());

        let report = engine
            .handle_column_change(&event("status"), &config(SyncMode::Bidirectional))
            .await;

        assert_eq!(report.action, Some(SyncAction::Ignored));
        assert!(!report.synced);
        assert_eq!(board.write_count(), 0);
        // An unrelated column should not even claim the debounce window.
        assert!(storage.get(&debounce_key(100, 42)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn second_event_within_window_is_debounced() {
        let board = FakeBoard::with_values(&[
            ("start", r#"{"date":"2026-03-01"}"#),
            ("end", r#"{"date":"2026-03-15"}"#),
        ]);
        let (engine, _storage) = engine(board.clone());
        let config = config(SyncMode::Bidirectional);

        let first = engine.handle_column_change(&event("start"), &config).await;
        assert!(first.synced);

        let second = engine.handle_column_change(&event("start"), &config).await;
        assert_eq!(second.action, Some(SyncAction::Debounced));
        assert!(!second.synced);
        assert_eq!(board.write_count(), 1);
    }

    #[tokio::test]
    async fn dates_to_timeline_writes_range() {
        let board = FakeBoard::with_values(&[
            ("start", r#"{"date":"2026-04-10"}"#),
            ("end", r#"{"date":"2026-04-20"}"#),
        ]);
        let (engine, _storage) = engine(board.clone());

        let report = engine
            .handle_column_change(&event("start"), &config(SyncMode::Bidirectional))
            .await;

        assert!(report.synced);
        assert_eq!(report.action, Some(SyncAction::DatesToTimeline));
        assert_eq!(board.write_count(), 1);

        let written: TimelineValue = serde_json::from_str(&board.raw("timeline").unwrap()).unwrap();
        assert_eq!(written.from, date("2026-04-10"));
        assert_eq!(written.to, date("2026-04-20"));
    }

    #[tokio::test]
    async fn equal_timeline_is_already_in_sync() {
        let board = FakeBoard::with_values(&[
            ("start", r#"{"date":"2026-03-01"}"#),
            ("end", r#"{"date":"2026-03-15"}"#),
            ("timeline", r#"{"from":"2026-03-01","to":"2026-03-15"}"#),
        ]);
        let (engine, _storage) = engine(board.clone());

        let report = engine
            .handle_column_change(&event("start"), &config(SyncMode::Bidirectional))
            .await;

        assert_eq!(report.action, Some(SyncAction::AlreadyInSync));
        assert!(!report.synced);
        assert_eq!(board.write_count(), 0);
    }

    #[tokio::test]
    async fn timeline_to_dates_writes_both_columns_at_once() {
        let board = FakeBoard::with_values(&[
            ("timeline", r#"{"from":"2026-05-01","to":"2026-05-09"}"#),
            ("start", r#"{"date":"2026-01-01"}"#),
            ("end", r#"{"date":"2026-01-02"}"#),
        ]);
        let (engine, _storage) = engine(board.clone());

        let report = engine
            .handle_column_change(&event("timeline"), &config(SyncMode::Bidirectional))
            .await;

        assert!(report.synced);
        assert_eq!(report.action, Some(SyncAction::TimelineToDates));
        // One multi-column write covering both date columns.
        assert_eq!(board.write_count(), 1);

        let start: DateValue = serde_json::from_str(&board.raw("start").unwrap()).unwrap();
        let end: DateValue = serde_json::from_str(&board.raw("end").unwrap()).unwrap();
        assert_eq!(start.date, date("2026-05-01"));
        assert_eq!(end.date, date("2026-05-09"));
    }

    #[tokio::test]
    async fn matching_dates_skip_timeline_to_dates() {
        let board = FakeBoard::with_values(&[
            ("timeline", r#"{"from":"2026-05-01","to":"2026-05-09"}"#),
            ("start", r#"{"date":"2026-05-01"}"#),
            ("end", r#"{"date":"2026-05-09"}"#),
        ]);
        let (engine, _storage) = engine(board.clone());

        let report = engine
            .handle_column_change(&event("timeline"), &config(SyncMode::Bidirectional))
            .await;

        assert_eq!(report.action, Some(SyncAction::AlreadyInSync));
        assert_eq!(board.write_count(), 0);
    }

    #[tokio::test]
    async fn disabled_direction_is_ignored() {
        let board = FakeBoard::with_values(&[
            ("timeline", r#"{"from":"2026-05-01","to":"2026-05-09"}"#),
        ]);
        let (engine, _storage) = engine(board.clone());

        let report = engine
            .handle_column_change(&event("timeline"), &config(SyncMode::DatesToTimeline))
            .await;

        assert_eq!(report.action, Some(SyncAction::Ignored));
        assert!(!report.synced);
        assert_eq!(board.write_count(), 0);
    }

    #[tokio::test]
    async fn missing_end_date_skips_sync() {
        let board = FakeBoard::with_values(&[("start", r#"{"date":"2026-03-01"}"#)]);
        let (engine, _storage) = engine(board.clone());

        let report = engine
            .handle_column_change(&event("start"), &config(SyncMode::Bidirectional))
            .await;

        assert_eq!(report.action, Some(SyncAction::MissingDates));
        assert_eq!(board.write_count(), 0);
    }

    #[tokio::test]
    async fn round_trip_reads_back_written_timeline() {
        let board = FakeBoard::with_values(&[
            ("start", r#"{"date":"2026-03-01"}"#),
            ("end", r#"{"date":"2026-03-15"}"#),
        ]);
        let (engine, _storage) = engine(board.clone());

        let report = engine
            .handle_column_change(&event("end"), &config(SyncMode::Bidirectional))
            .await;
        assert!(report.synced);

        let columns = board
            .item_column_values(42, &["timeline".to_string()])
            .await
            .unwrap();
        let timeline = parse_timeline_value(raw_value(&columns, "timeline")).unwrap();
        assert_eq!(timeline.from, date("2026-03-01"));
        assert_eq!(timeline.to, date("2026-03-15"));
    }

    #[tokio::test]
    async fn api_failure_is_reported_not_propagated() {
        let (engine, storage) = engine(Arc::new(BrokenBoard));

        let report = engine
            .handle_column_change(&event("start"), &config(SyncMode::Bidirectional))
            .await;

        assert!(!report.synced);
        assert!(report.error.as_deref().unwrap_or_default().contains("boom"));
        // The marker was set before the attempt and stays for the full
        // window even though the sync failed.
        assert!(storage.get(&debounce_key(100, 42)).await.unwrap().is_some());
    }
}
