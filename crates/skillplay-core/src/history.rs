use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ports::{PersistencePort, HISTORY_KEY};
use crate::run_config::RunConfig;

/// Maximum number of runs retained; older entries are evicted on write.
pub const HISTORY_LIMIT: usize = 50;

// ---------------------------------------------------------------------------
// RunStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Running,
    Success,
    Cancelled,
    /// Declared for compatibility with stored history; no code path produces it.
    Error,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Cancelled | RunStatus::Error)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Idle => "idle",
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Error => "error",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ExecutionHistoryItem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionHistoryItem {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    /// Snapshot taken at run start; never touched by later edits.
    pub config: RunConfig,
    #[serde(default)]
    pub terminal_log: String,
    #[serde(default)]
    pub result: String,
}

impl ExecutionHistoryItem {
    pub fn running(id: impl Into<String>, config: RunConfig) -> Self {
        Self {
            id: id.into(),
            started_at: Utc::now(),
            finished_at: None,
            status: RunStatus::Running,
            config,
            terminal_log: String::new(),
            result: String::new(),
        }
    }
}

/// Fields to overwrite on an existing entry; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct HistoryPatch {
    pub status: Option<RunStatus>,
    pub finished_at: Option<DateTime<Utc>>,
    pub terminal_log: Option<String>,
    pub result: Option<String>,
}

impl HistoryPatch {
    pub fn finished(status: RunStatus) -> Self {
        Self {
            status: Some(status),
            finished_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    fn apply(self, item: &mut ExecutionHistoryItem) {
        if let Some(status) = self.status {
            item.status = status;
        }
        if let Some(at) = self.finished_at {
            item.finished_at = Some(at);
        }
        if let Some(log) = self.terminal_log {
            item.terminal_log = log;
        }
        if let Some(result) = self.result {
            item.result = result;
        }
    }
}

// ---------------------------------------------------------------------------
// HistoryStore
// ---------------------------------------------------------------------------

/// Newest-first run log, capped at [`HISTORY_LIMIT`] and mirrored to storage
/// after every write. Storage failures are logged and otherwise ignored.
pub struct HistoryStore {
    items: Vec<ExecutionHistoryItem>,
    port: Arc<dyn PersistencePort>,
}

impl HistoryStore {
    /// Load persisted history. Missing, unreadable or corrupt data starts empty.
    pub fn load(port: Arc<dyn PersistencePort>) -> Self {
        let mut items: Vec<ExecutionHistoryItem> = match port.load(HISTORY_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "discarding corrupt run history");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "failed to read run history");
                Vec::new()
            }
        };
        items.truncate(HISTORY_LIMIT);
        Self { items, port }
    }

    /// Insert at the head, evicting the oldest entries past the cap.
    pub fn record(&mut self, item: ExecutionHistoryItem) {
        self.items.insert(0, item);
        self.items.truncate(HISTORY_LIMIT);
        self.persist();
    }

    /// Patch the entry with `id`. Returns `false` if it is no longer retained.
    pub fn update(&mut self, id: &str, patch: HistoryPatch) -> bool {
        let Some(item) = self.items.iter_mut().find(|i| i.id == id) else {
            return false;
        };
        patch.apply(item);
        self.persist();
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
        if let Err(e) = self.port.remove(HISTORY_KEY) {
            warn!(error = %e, "failed to clear persisted run history");
        }
    }

    pub fn list(&self) -> &[ExecutionHistoryItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&ExecutionHistoryItem> {
        self.items.iter().find(|i| i.id == id)
    }

    /// The configuration a past run was started with, for loading back into
    /// the editor.
    pub fn config_for(&self, id: &str) -> Option<RunConfig> {
        self.get(id).map(|i| i.config.clone())
    }

    /// Blocking write on the caller's thread, under the controller's state
    /// lock, so storage order always matches state order.
    fn persist(&self) {
        let result = serde_json::to_string(&self.items)
            .map_err(crate::error::PlaygroundError::from)
            .and_then(|json| self.port.save(HISTORY_KEY, &json));
        if let Err(e) = result {
            warn!(error = %e, "failed to persist run history");
        }
    }
}
