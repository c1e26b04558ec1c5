//! The run state machine.
//!
//! ```text
//! Idle ──start──▶ Running ──last step──▶ Success
//!                    │
//!                    ├──cancel()────────▶ Cancelled
//!                    └──start(other)────▶ Cancelled (superseded)
//! ```
//!
//! Every run captures the generation number current at its start. After each
//! scripted delay the playback task re-reads the generation under the state
//! lock; if it moved on, the run is stale and leaves the live view, history
//! and event stream untouched. Each run also owns a [`CancellationToken`] so a
//! pending delay is released as soon as the run is cancelled or superseded,
//! but the generation check is what guarantees no writes after cancellation.

use std::sync::Arc;

use chrono::{Local, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::Pacing;
use crate::history::{ExecutionHistoryItem, HistoryPatch, HistoryStore, RunStatus};
use crate::ports::{save_last_config, PersistencePort};
use crate::result;
use crate::run_config::RunConfig;
use crate::script::{self, LogStep};

pub const FINISHED_LINE: &str = "Run finished ok";
pub const CANCELLED_LINE: &str = "Run cancelled by user";

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// What the playground currently shows: the transcript and result of the
/// most recently started run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaygroundView {
    pub status: RunStatus,
    pub run_id: Option<String>,
    pub lines: Vec<String>,
    pub result: Option<String>,
}

impl Default for PlaygroundView {
    fn default() -> Self {
        Self {
            status: RunStatus::Idle,
            run_id: None,
            lines: Vec::new(),
            result: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    Started { run_id: String, skill: String },
    Line { run_id: String, line: String },
    Finished { run_id: String, status: RunStatus },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub run_id: String,
    pub status: RunStatus,
}

/// Handle to a started run's playback task.
pub struct RunTicket {
    pub run_id: String,
    handle: JoinHandle<RunOutcome>,
}

impl RunTicket {
    /// Wait for the run to reach a terminal state.
    pub async fn wait(self) -> RunOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(run_id = %self.run_id, error = %e, "playback task ended abnormally");
                RunOutcome {
                    run_id: self.run_id,
                    status: RunStatus::Cancelled,
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

struct Inner {
    /// Active run token. Only the continuation holding this value may write.
    generation: u64,
    view: PlaygroundView,
    cancel: Option<CancellationToken>,
    history: HistoryStore,
}

impl Inner {
    /// Close out a run that is still `Running` in history as cancelled.
    fn mark_cancelled(&mut self, run_id: &str, terminal_log: Option<String>) -> bool {
        let still_running = self
            .history
            .get(run_id)
            .is_some_and(|i| !i.status.is_terminal());
        if still_running {
            let mut patch = HistoryPatch::finished(RunStatus::Cancelled);
            patch.terminal_log = terminal_log;
            self.history.update(run_id, patch);
        }
        still_running
    }
}

fn stamp(message: &str) -> String {
    format!("[{}] {message}", Local::now().format("%H:%M:%S"))
}

// ---------------------------------------------------------------------------
// RunController
// ---------------------------------------------------------------------------

/// Owns the generation counter, the live view and the run history.
///
/// Cloning is cheap and every clone drives the same state.
#[derive(Clone)]
pub struct RunController {
    inner: Arc<Mutex<Inner>>,
    storage: Arc<dyn PersistencePort>,
    events: broadcast::Sender<RunEvent>,
    pacing: Pacing,
}

impl RunController {
    pub fn new(storage: Arc<dyn PersistencePort>, pacing: Pacing) -> Self {
        let (events, _) = broadcast::channel(256);
        let history = HistoryStore::load(storage.clone());
        Self {
            inner: Arc::new(Mutex::new(Inner {
                generation: 0,
                view: PlaygroundView::default(),
                cancel: None,
                history,
            })),
            storage,
            events,
            pacing,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> PlaygroundView {
        self.inner.lock().await.view.clone()
    }

    pub async fn history_item(&self, run_id: &str) -> Option<ExecutionHistoryItem> {
        self.inner.lock().await.history.get(run_id).cloned()
    }

    /// Start a run of `config`, superseding any run in progress.
    ///
    /// Returns `None` without touching any state when no skill is selected.
    pub async fn start(&self, config: RunConfig) -> Option<RunTicket> {
        if !config.has_skill() {
            debug!("start ignored: no skill selected");
            return None;
        }

        let run_id = uuid::Uuid::new_v4().to_string();
        let cancel = CancellationToken::new();
        let steps = script::generate(&config.skill_id, &config);

        let token = {
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            let token = inner.generation;

            if let Some(previous) = inner.cancel.replace(cancel.clone()) {
                previous.cancel();
            }
            if inner.view.status == RunStatus::Running {
                if let Some(previous_id) = inner.view.run_id.clone() {
                    let log = inner.view.lines.join("\n");
                    if inner.mark_cancelled(&previous_id, Some(log)) {
                        info!(run_id = %previous_id, superseded_by = %run_id, "run superseded");
                        let _ = self.events.send(RunEvent::Finished {
                            run_id: previous_id,
                            status: RunStatus::Cancelled,
                        });
                    }
                }
            }

            inner.view = PlaygroundView {
                status: RunStatus::Running,
                run_id: Some(run_id.clone()),
                lines: Vec::new(),
                result: None,
            };
            inner
                .history
                .record(ExecutionHistoryItem::running(&run_id, config.clone()));
            let _ = self.events.send(RunEvent::Started {
                run_id: run_id.clone(),
                skill: config.skill_id.clone(),
            });
            token
        };

        save_last_config(self.storage.as_ref(), &config);
        info!(
            run_id = %run_id,
            skill = %config.skill_id,
            model = %config.model,
            steps = steps.len(),
            expected_ms = script::total_delay_ms(&steps),
            "run started"
        );

        let this = self.clone();
        let task_run_id = run_id.clone();
        let handle = tokio::spawn(async move {
            this.play(token, task_run_id, config, steps, cancel).await
        });
        Some(RunTicket { run_id, handle })
    }

    /// Cancel the run in progress. Returns `false` when nothing is running.
    pub async fn cancel(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.view.status != RunStatus::Running {
            return false;
        }
        inner.generation += 1;
        if let Some(cancel) = inner.cancel.take() {
            cancel.cancel();
        }

        let line = stamp(CANCELLED_LINE);
        inner.view.lines.push(line.clone());
        inner.view.status = RunStatus::Cancelled;

        if let Some(run_id) = inner.view.run_id.clone() {
            let log = inner.view.lines.join("\n");
            inner.mark_cancelled(&run_id, Some(log));
            let _ = self.events.send(RunEvent::Line {
                run_id: run_id.clone(),
                line,
            });
            let _ = self.events.send(RunEvent::Finished {
                run_id: run_id.clone(),
                status: RunStatus::Cancelled,
            });
            info!(run_id = %run_id, "run cancelled");
        }
        true
    }

    async fn play(
        self,
        token: u64,
        run_id: String,
        config: RunConfig,
        steps: Vec<LogStep>,
        cancel: CancellationToken,
    ) -> RunOutcome {
        let cancelled = RunOutcome {
            run_id: run_id.clone(),
            status: RunStatus::Cancelled,
        };

        for step in steps {
            let delay = self.pacing.scale(step.delay_ms);
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {}
            }

            let mut inner = self.inner.lock().await;
            if inner.generation != token {
                inner.mark_cancelled(&run_id, None);
                debug!(run_id = %run_id, "stale step discarded");
                return cancelled;
            }
            let line = stamp(&step.message);
            inner.view.lines.push(line.clone());
            let _ = self.events.send(RunEvent::Line {
                run_id: run_id.clone(),
                line,
            });
        }

        let result_text = match result::synthesize(&config.skill_id, &config).to_json_pretty() {
            Ok(text) => text,
            Err(e) => {
                warn!(run_id = %run_id, error = %e, "failed to serialize run result");
                String::new()
            }
        };

        let mut inner = self.inner.lock().await;
        if inner.generation != token {
            inner.mark_cancelled(&run_id, None);
            return cancelled;
        }
        let line = stamp(FINISHED_LINE);
        inner.view.lines.push(line.clone());
        inner.view.status = RunStatus::Success;
        inner.view.result = Some(result_text.clone());
        inner.cancel = None;

        let terminal_log = inner.view.lines.join("\n");
        inner.history.update(
            &run_id,
            HistoryPatch {
                status: Some(RunStatus::Success),
                finished_at: Some(Utc::now()),
                terminal_log: Some(terminal_log),
                result: Some(result_text),
            },
        );
        let _ = self.events.send(RunEvent::Line {
            run_id: run_id.clone(),
            line,
        });
        let _ = self.events.send(RunEvent::Finished {
            run_id: run_id.clone(),
            status: RunStatus::Success,
        });
        info!(run_id = %run_id, "run finished");

        RunOutcome {
            run_id,
            status: RunStatus::Success,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HISTORY_LIMIT;
    use crate::ports::{MemoryStore, HISTORY_KEY, LAST_CONFIG_KEY};
    use std::time::Duration;

    fn weather() -> RunConfig {
        RunConfig::new("weather", "claude-sonnet")
            .with_param("location", "Boston")
            .with_param("days", "3")
    }

    fn controller(pacing: Pacing) -> (RunController, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (RunController::new(store.clone(), pacing), store)
    }

    async fn history(ctl: &RunController) -> Vec<ExecutionHistoryItem> {
        ctl.inner.lock().await.history.list().to_vec()
    }

    fn strip_stamp(line: &str) -> &str {
        line.split_once("] ").map(|(_, msg)| msg).unwrap_or(line)
    }

    #[tokio::test]
    async fn start_without_skill_is_a_noop() {
        let (ctl, _) = controller(Pacing::instant());
        assert!(ctl.start(RunConfig::new("  ", "m")).await.is_none());
        assert!(history(&ctl).await.is_empty());
        assert_eq!(ctl.snapshot().await, PlaygroundView::default());
    }

    #[tokio::test]
    async fn start_to_completion() {
        let (ctl, store) = controller(Pacing::instant());
        let ticket = ctl.start(weather()).await.unwrap();
        let run_id = ticket.run_id.clone();
        let outcome = ticket.wait().await;
        assert_eq!(outcome.status, RunStatus::Success);

        let item = ctl.history_item(&run_id).await.unwrap();
        assert_eq!(item.status, RunStatus::Success);
        assert!(item.finished_at.is_some());
        assert!(item.terminal_log.lines().last().unwrap().ends_with(FINISHED_LINE));

        let result: serde_json::Value = serde_json::from_str(&item.result).unwrap();
        assert_eq!(result["parameters"]["location"], "Boston");

        let view = ctl.snapshot().await;
        assert_eq!(view.status, RunStatus::Success);
        assert_eq!(view.result.as_deref(), Some(item.result.as_str()));

        let steps = script::generate("weather", &weather());
        let messages: Vec<&str> = view.lines.iter().map(|l| strip_stamp(l)).collect();
        assert_eq!(messages.len(), steps.len() + 1);
        for (msg, step) in messages.iter().zip(&steps) {
            assert_eq!(*msg, step.message);
        }

        assert!(store.get_raw(HISTORY_KEY).unwrap().contains(&run_id));
        assert!(store.get_raw(LAST_CONFIG_KEY).unwrap().contains("Boston"));
    }

    #[tokio::test]
    async fn history_insert_is_optimistic() {
        let (ctl, _) = controller(Pacing::default());
        let ticket = ctl.start(weather()).await.unwrap();
        let items = history(&ctl).await;
        assert_eq!(items[0].id, ticket.run_id);
        assert_eq!(items[0].status, RunStatus::Running);
        assert!(items[0].finished_at.is_none());
        ctl.cancel().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_mid_run() {
        let (ctl, _) = controller(Pacing::default());
        let ticket = ctl.start(weather()).await.unwrap();
        let run_id = ticket.run_id.clone();

        // First four header steps take 900ms in total.
        tokio::time::sleep(Duration::from_millis(950)).await;
        assert!(ctl.cancel().await);
        let lines_at_cancel = ctl.snapshot().await.lines;
        assert_eq!(lines_at_cancel.len(), 5);
        assert!(lines_at_cancel.last().unwrap().ends_with(CANCELLED_LINE));

        let outcome = ticket.wait().await;
        assert_eq!(outcome.status, RunStatus::Cancelled);

        tokio::time::sleep(Duration::from_secs(10)).await;
        let view = ctl.snapshot().await;
        assert_eq!(view.status, RunStatus::Cancelled);
        assert_eq!(view.lines, lines_at_cancel);
        assert!(view.result.is_none());

        let item = ctl.history_item(&run_id).await.unwrap();
        assert_eq!(item.status, RunStatus::Cancelled);
        assert!(item.finished_at.is_some());
        assert!(item.result.is_empty());
    }

    #[tokio::test]
    async fn cancel_when_idle_is_a_noop() {
        let (ctl, _) = controller(Pacing::instant());
        assert!(!ctl.cancel().await);
        assert!(ctl.snapshot().await.lines.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn new_start_supersedes_running_run() {
        let (ctl, _) = controller(Pacing::default());
        let mut events = ctl.subscribe();

        let first = ctl.start(weather()).await.unwrap();
        let first_id = first.run_id.clone();
        tokio::time::sleep(Duration::from_millis(550)).await;

        let second_config = RunConfig::new("sql-query", "claude-opus");
        let second = ctl.start(second_config.clone()).await.unwrap();
        let second_id = second.run_id.clone();

        assert_eq!(first.wait().await.status, RunStatus::Cancelled);
        assert_eq!(second.wait().await.status, RunStatus::Success);

        let history = history(&ctl).await;
        assert_eq!(history[0].id, second_id);
        assert_eq!(history[0].status, RunStatus::Success);
        assert_eq!(history[1].id, first_id);
        assert_eq!(history[1].status, RunStatus::Cancelled);
        assert!(history[1].finished_at.is_some());
        assert_eq!(history[1].config, weather());

        // Nothing from the first run may appear once the second has started.
        let mut second_started = false;
        while let Ok(event) = events.try_recv() {
            match event {
                RunEvent::Started { run_id, .. } if run_id == second_id => second_started = true,
                RunEvent::Line { run_id, .. } if second_started => assert_eq!(run_id, second_id),
                _ => {}
            }
        }
        assert!(second_started);

        let view = ctl.snapshot().await;
        assert_eq!(view.run_id.as_deref(), Some(second_id.as_str()));
        assert!(view.lines[0].ends_with("Starting skill 'sql-query'"));
    }

    #[tokio::test]
    async fn snapshot_is_immune_to_later_edits() {
        let (ctl, _) = controller(Pacing::instant());
        let mut working = weather();
        let ticket = ctl.start(working.clone()).await.unwrap();
        working.parameters.insert("location".into(), "Denver".into());
        let run_id = ticket.run_id.clone();
        ticket.wait().await;
        let snapshot = ctl.history_item(&run_id).await.unwrap().config;
        assert_eq!(snapshot.param("location"), Some("Boston"));
    }

    #[tokio::test]
    async fn history_cap_holds_across_runs() {
        let (ctl, _) = controller(Pacing::instant());
        let mut ids = Vec::new();
        for n in 0..(HISTORY_LIMIT + 5) {
            let config = weather().with_param("n", n.to_string());
            let ticket = ctl.start(config).await.unwrap();
            ids.push(ticket.run_id.clone());
            ticket.wait().await;
        }
        let history = history(&ctl).await;
        assert_eq!(history.len(), HISTORY_LIMIT);
        let expected: Vec<&String> = ids.iter().rev().take(HISTORY_LIMIT).collect();
        let actual: Vec<&String> = history.iter().map(|i| &i.id).collect();
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn storage_failure_does_not_interrupt_run() {
        let (ctl, store) = controller(Pacing::instant());
        store.set_failing(true);
        let ticket = ctl.start(weather()).await.unwrap();
        assert_eq!(ticket.wait().await.status, RunStatus::Success);
        assert_eq!(history(&ctl).await[0].status, RunStatus::Success);
    }

    #[tokio::test]
    async fn history_survives_controller_restart() {
        let (ctl, store) = controller(Pacing::instant());
        let ticket = ctl.start(weather()).await.unwrap();
        let run_id = ticket.run_id.clone();
        ticket.wait().await;

        let reopened = RunController::new(store, Pacing::instant());
        let item = reopened.history_item(&run_id).await.unwrap();
        assert_eq!(item.status, RunStatus::Success);
    }
}
