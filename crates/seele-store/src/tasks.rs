use rusqlite::{params, OptionalExtension};

use crate::{
    error::Result,
    types::{ScheduledTask, TaskStatus, TriggerConfig, TriggerType},
    Store,
};

impl Store {
    #[allow(clippy::too_many_arguments)]
    pub fn insert_scheduled_task(
        &self,
        id: &str,
        name: &str,
        trigger_type: TriggerType,
        trigger_config: &TriggerConfig,
        message: &str,
        created_at: i64,
        next_run_at: i64,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let config_json = serde_json::to_string(trigger_config)?;
        conn.execute(
            "INSERT INTO scheduled_tasks
             (id, name, trigger_type, trigger_config_json, message, created_at, next_run_at, last_run_at, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, 'active')",
            params![id, name, trigger_type.to_string(), config_json, message, created_at, next_run_at],
        )?;
        Ok(())
    }

    /// Atomically select due `active` tasks and flip them to `running`,
    /// returning the claimed rows. Guarantees at-most-once execution under
    /// multiple concurrent scheduler instances sharing this store.
    pub fn claim_due_tasks(&self, now: i64) -> Result<Vec<ScheduledTask>> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let due_ids: Vec<String> = {
            let mut stmt = tx.prepare(
                "SELECT id FROM scheduled_tasks WHERE status = 'active' AND next_run_at <= ?1",
            )?;
            stmt.query_map(params![now], |row| row.get(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?
        };

        if due_ids.is_empty() {
            tx.commit()?;
            return Ok(Vec::new());
        }

        for id in &due_ids {
            tx.execute(
                "UPDATE scheduled_tasks SET status = 'running' WHERE id = ?1",
                params![id],
            )?;
        }

        let mut claimed = Vec::with_capacity(due_ids.len());
        for id in &due_ids {
            let task = tx.query_row(
                "SELECT id, name, trigger_type, trigger_config_json, message,
                        created_at, next_run_at, last_run_at, status
                 FROM scheduled_tasks WHERE id = ?1",
                params![id],
                row_to_task,
            )?;
            claimed.push(task);
        }

        tx.commit()?;
        Ok(claimed)
    }

    /// Update `next_run_at`/`last_run_at` and return the task's status to
    /// `active` (used after a successful `interval` task execution).
    pub fn update_task_next_run(
        &self,
        id: &str,
        next_run_at: i64,
        last_run_at: i64,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE scheduled_tasks SET next_run_at = ?1, last_run_at = ?2, status = 'active'
             WHERE id = ?3",
            params![next_run_at, last_run_at, id],
        )?;
        Ok(())
    }

    /// Set status and `last_run_at` together (used to mark a `once` task
    /// `completed`).
    pub fn update_task_status_and_last_run(
        &self,
        id: &str,
        status: TaskStatus,
        last_run_at: i64,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE scheduled_tasks SET status = ?1, last_run_at = ?2 WHERE id = ?3",
            params![status.to_string(), last_run_at, id],
        )?;
        Ok(())
    }

    /// Plain status update, used by the `scheduled_task` tool's
    /// pause/resume/cancel actions and by failure-retry (`running` ->
    /// `active`).
    pub fn update_task_status(&self, id: &str, status: TaskStatus) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE scheduled_tasks SET status = ?1 WHERE id = ?2",
            params![status.to_string(), id],
        )?;
        Ok(())
    }

    pub fn delete_task(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM scheduled_tasks WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn get_task(&self, id: &str) -> Result<Option<ScheduledTask>> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT id, name, trigger_type, trigger_config_json, message,
                    created_at, next_run_at, last_run_at, status
             FROM scheduled_tasks WHERE id = ?1",
            params![id],
            row_to_task,
        )
        .optional()
        .map_err(Into::into)
    }

    pub fn get_all_tasks(&self, status: Option<TaskStatus>) -> Result<Vec<ScheduledTask>> {
        let conn = self.conn.lock().unwrap();
        let rows = match status {
            Some(s) => {
                let mut stmt = conn.prepare(
                    "SELECT id, name, trigger_type, trigger_config_json, message,
                            created_at, next_run_at, last_run_at, status
                     FROM scheduled_tasks WHERE status = ?1 ORDER BY created_at ASC",
                )?;
                stmt.query_map(params![s.to_string()], row_to_task)?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT id, name, trigger_type, trigger_config_json, message,
                            created_at, next_run_at, last_run_at, status
                     FROM scheduled_tasks ORDER BY created_at ASC",
                )?;
                stmt.query_map([], row_to_task)?
                    .collect::<std::result::Result<Vec<_>, _>>()?
            }
        };
        Ok(rows)
    }
}

fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<ScheduledTask> {
    let trigger_type_str: String = row.get(2)?;
    let config_json: String = row.get(3)?;
    let status_str: String = row.get(8)?;
    Ok(ScheduledTask {
        id: row.get(0)?,
        name: row.get(1)?,
        trigger_type: trigger_type_str.parse::<TriggerType>().unwrap_or(TriggerType::Once),
        trigger_config: serde_json::from_str(&config_json).unwrap_or(TriggerConfig::Once {
            timestamp: 0,
        }),
        message: row.get(4)?,
        created_at: row.get(5)?,
        next_run_at: row.get(6)?,
        last_run_at: row.get(7)?,
        status: status_str.parse::<TaskStatus>().unwrap_or(TaskStatus::Active),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_due_tasks_flips_status_and_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_scheduled_task(
                "t1",
                "ping",
                TriggerType::Once,
                &TriggerConfig::Once { timestamp: 100 },
                "hello",
                0,
                100,
            )
            .unwrap();

        let claimed = store.claim_due_tasks(200).unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].status, TaskStatus::Running);

        // second claim at the same "tick" finds nothing — already running.
        let claimed_again = store.claim_due_tasks(200).unwrap();
        assert!(claimed_again.is_empty());
    }

    #[test]
    fn interval_task_returns_to_active_after_update() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_scheduled_task(
                "t2",
                "tick",
                TriggerType::Interval,
                &TriggerConfig::Interval { interval_seconds: 60 },
                "hi",
                0,
                100,
            )
            .unwrap();
        store.claim_due_tasks(100).unwrap();
        store.update_task_next_run("t2", 160, 100).unwrap();
        let task = store.get_task("t2").unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Active);
        assert_eq!(task.next_run_at, 160);
    }
}
