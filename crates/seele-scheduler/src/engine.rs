use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use seele_core::clock;
use seele_store::{ScheduledTask, Store, TaskStatus, TriggerConfig};
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    error::{Result, SchedulerError},
    types::BootstrapTask,
};

/// Invoked once per claimed task, with `task.message` as the payload. The
/// Conversation Driver implements this to run the message through
/// retrieval and the LLM chat path without saving it to history, saving
/// only the resulting reply.
#[async_trait]
pub trait TaskCallback: Send + Sync {
    async fn on_task_fired(&self, task: &ScheduledTask) -> std::result::Result<(), String>;
}

/// Single background loop, period 10s: claim due tasks, invoke the
/// callback, and reschedule or complete each one. Cooperates with a
/// `watch::Receiver<bool>` shutdown signal, matching the engine's
/// single-writer `Store` handle shared with the rest of the process.
pub struct SchedulerEngine {
    store: Arc<Store>,
    callback: Arc<dyn TaskCallback>,
    tick_period: std::time::Duration,
}

impl SchedulerEngine {
    pub fn new(store: Arc<Store>, callback: Arc<dyn TaskCallback>) -> Self {
        Self {
            store,
            callback,
            tick_period: std::time::Duration::from_secs(10),
        }
    }

    /// Load `scheduled_tasks.json` (if present) from the profile directory
    /// and upsert each entry into the store by name.
    pub fn bootstrap_from_file(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            SchedulerError::InvalidTimeExpression(format!("reading {}: {e}", path.display()))
        })?;
        let entries: Vec<BootstrapTask> = serde_json::from_str(&text).map_err(|e| {
            SchedulerError::InvalidTimeExpression(format!("parsing {}: {e}", path.display()))
        })?;

        let existing = self.store.get_all_tasks(None)?;
        for entry in entries {
            if existing.iter().any(|t| t.name == entry.name) {
                continue;
            }
            let now = clock::now_secs();
            let next_run_at = match &entry.trigger_config {
                TriggerConfig::Once { timestamp } => *timestamp,
                TriggerConfig::Interval { interval_seconds } => now + interval_seconds,
            };
            let id = Uuid::new_v4().to_string();
            self.store.insert_scheduled_task(
                &id,
                &entry.name,
                entry.trigger_type,
                &entry.trigger_config,
                &entry.message,
                now,
                next_run_at,
            )?;
            info!(task = %entry.name, "bootstrapped scheduled task from file");
        }
        Ok(())
    }

    /// Main loop. Runs until `shutdown` broadcasts `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("scheduler engine started");
        let mut interval = tokio::time::interval(self.tick_period);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        error!("scheduler tick error: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("scheduler engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    async fn tick(&self) -> Result<()> {
        let now = clock::now_secs();
        let claimed = self.store.claim_due_tasks(now)?;

        for task in claimed {
            match self.callback.on_task_fired(&task).await {
                Ok(()) => self.complete_or_reschedule(&task, now)?,
                Err(e) => {
                    warn!(task_id = %task.id, "task callback failed, resetting to active: {e}");
                    self.store.update_task_status(&task.id, TaskStatus::Active)?;
                }
            }
        }
        Ok(())
    }

    fn complete_or_reschedule(&self, task: &ScheduledTask, now: i64) -> Result<()> {
        match task.trigger_config {
            TriggerConfig::Once { .. } => {
                self.store
                    .update_task_status_and_last_run(&task.id, TaskStatus::Completed, now)?;
            }
            TriggerConfig::Interval { interval_seconds } => {
                self.store
                    .update_task_next_run(&task.id, now + interval_seconds, now)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use seele_store::TriggerType;

    use super::*;

    struct CountingCallback {
        count: AtomicUsize,
        fail_until: usize,
    }

    #[async_trait]
    impl TaskCallback for CountingCallback {
        async fn on_task_fired(&self, _task: &ScheduledTask) -> std::result::Result<(), String> {
            let n = self.count.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_until {
                Err("simulated failure".to_string())
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn tick_completes_a_once_task() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        store
            .insert_scheduled_task(
                "t1",
                "ping",
                TriggerType::Once,
                &TriggerConfig::Once { timestamp: 0 },
                "hello",
                0,
                0,
            )
            .unwrap();
        let callback = Arc::new(CountingCallback {
            count: AtomicUsize::new(0),
            fail_until: 0,
        });
        let engine = SchedulerEngine::new(store.clone(), callback);
        engine.tick().await.unwrap();

        let task = store.get_task("t1").unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn tick_resets_to_active_on_callback_failure() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        store
            .insert_scheduled_task(
                "t2",
                "ping",
                TriggerType::Once,
                &TriggerConfig::Once { timestamp: 0 },
                "hello",
                0,
                0,
            )
            .unwrap();
        let callback = Arc::new(CountingCallback {
            count: AtomicUsize::new(0),
            fail_until: 1,
        });
        let engine = SchedulerEngine::new(store.clone(), callback);
        engine.tick().await.unwrap();

        let task = store.get_task("t2").unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Active);
    }

    #[tokio::test]
    async fn tick_reschedules_interval_task() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        store
            .insert_scheduled_task(
                "t3",
                "tick",
                TriggerType::Interval,
                &TriggerConfig::Interval { interval_seconds: 60 },
                "hi",
                0,
                0,
            )
            .unwrap();
        let callback = Arc::new(CountingCallback {
            count: AtomicUsize::new(0),
            fail_until: 0,
        });
        let engine = SchedulerEngine::new(store.clone(), callback);
        engine.tick().await.unwrap();

        let task = store.get_task("t3").unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Active);
        assert_eq!(task.next_run_at, 60);
    }

    #[test]
    fn bootstrap_skips_existing_names_by_name() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        store
            .insert_scheduled_task(
                "existing",
                "reminder",
                TriggerType::Once,
                &TriggerConfig::Once { timestamp: 100 },
                "already here",
                0,
                100,
            )
            .unwrap();
        let callback = Arc::new(CountingCallback {
            count: AtomicUsize::new(0),
            fail_until: 0,
        });
        let engine = SchedulerEngine::new(store.clone(), callback);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scheduled_tasks.json");
        std::fs::write(
            &path,
            serde_json::to_string(&[BootstrapTask {
                name: "reminder".to_string(),
                trigger_type: TriggerType::Once,
                trigger_config: TriggerConfig::Once { timestamp: 200 },
                message: "new payload".to_string(),
            }])
            .unwrap(),
        )
        .unwrap();

        engine.bootstrap_from_file(&path).unwrap();

        let all = store.get_all_tasks(None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].message, "already here");
    }
}
