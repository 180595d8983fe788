//! `scheduled_task` tool — create, list, inspect, and manage scheduled
//! reminders/check-ins, backed directly by the store's `ScheduledTask` table.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use seele_core::clock;
use seele_llm::ToolResult;
use seele_store::{Store, TaskStatus, TriggerConfig, TriggerType};

use super::Tool;

pub struct ScheduledTaskTool {
    store: Arc<Store>,
    timezone: String,
}

impl ScheduledTaskTool {
    pub fn new(store: Arc<Store>, timezone: String) -> Self {
        Self { store, timezone }
    }

    fn add(&self, input: &Value) -> ToolResult {
        let name = match input.get("name").and_then(Value::as_str) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => return ToolResult::error("'name' is required for the add action"),
        };
        let trigger_type = match input.get("trigger_type").and_then(Value::as_str) {
            Some("once") => TriggerType::Once,
            Some("interval") => TriggerType::Interval,
            Some(other) => {
                return ToolResult::error(format!("invalid trigger_type '{other}', expected once or interval"))
            }
            None => return ToolResult::error("'trigger_type' is required for the add action"),
        };
        let time = match input.get("time").and_then(Value::as_str) {
            Some(t) if !t.is_empty() => t,
            _ => return ToolResult::error("'time' is required for the add action"),
        };
        let message = match input.get("message").and_then(Value::as_str) {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => return ToolResult::error("'message' is required for the add action"),
        };

        let now = clock::now_secs();
        let trigger_config = match trigger_type {
            TriggerType::Once => match clock::parse_time_expression(time, &self.timezone, now) {
                Ok(timestamp) => TriggerConfig::Once { timestamp },
                Err(e) => return ToolResult::error(format!("could not parse time '{time}': {e}")),
            },
            TriggerType::Interval => {
                // An interval length is parsed the same grammar, anchored at zero,
                // so a duration shorthand or bare integer yields seconds directly.
                match clock::parse_time_expression(time, &self.timezone, 0) {
                    Ok(interval_seconds) if interval_seconds > 0 => {
                        TriggerConfig::Interval { interval_seconds }
                    }
                    Ok(_) => return ToolResult::error("interval must be a positive duration"),
                    Err(e) => return ToolResult::error(format!("could not parse interval '{time}': {e}")),
                }
            }
        };

        let next_run_at = match &trigger_config {
            TriggerConfig::Once { timestamp } => *timestamp,
            TriggerConfig::Interval { interval_seconds } => now + interval_seconds,
        };

        let id = Uuid::new_v4().to_string();
        if let Err(e) = self.store.insert_scheduled_task(
            &id,
            &name,
            trigger_type,
            &trigger_config,
            &message,
            now,
            next_run_at,
        ) {
            return ToolResult::error(format!("failed to create task: {e}"));
        }

        let when = clock::timestamp_to_str(next_run_at, &self.timezone);
        ToolResult::success(format!(
            "Task created (ID: {id})\nName: {name}\nNext run: {when}\nMessage: {message}"
        ))
    }

    fn list(&self) -> ToolResult {
        match self.store.get_all_tasks(Some(TaskStatus::Active)) {
            Ok(tasks) if tasks.is_empty() => ToolResult::success("No active tasks found."),
            Ok(tasks) => {
                let mut out = format!("Active tasks ({}):\n", tasks.len());
                for t in &tasks {
                    out.push_str(&format!(
                        "- {} | ID: {} | next run: {}\n",
                        t.name,
                        t.id,
                        clock::timestamp_to_str(t.next_run_at, &self.timezone)
                    ));
                }
                ToolResult::success(out)
            }
            Err(e) => ToolResult::error(format!("failed to list tasks: {e}")),
        }
    }

    fn get(&self, input: &Value) -> ToolResult {
        let Some(task_id) = require_task_id(input) else {
            return ToolResult::error("'task_id' is required for the get action");
        };
        match self.store.get_task(task_id) {
            Ok(Some(t)) => {
                let mut out = format!(
                    "Task: {}\nID: {}\nType: {}\nStatus: {}\nNext run: {}\n",
                    t.name,
                    t.id,
                    t.trigger_type,
                    t.status,
                    clock::timestamp_to_str(t.next_run_at, &self.timezone)
                );
                if let Some(last) = t.last_run_at {
                    out.push_str(&format!("Last run: {}\n", clock::timestamp_to_str(last, &self.timezone)));
                }
                out.push_str(&format!("Message: {}", t.message));
                ToolResult::success(out)
            }
            Ok(None) => ToolResult::error(format!("task not found: {task_id}")),
            Err(e) => ToolResult::error(format!("failed to get task: {e}")),
        }
    }

    fn cancel(&self, input: &Value) -> ToolResult {
        let Some(task_id) = require_task_id(input) else {
            return ToolResult::error("'task_id' is required for the cancel action");
        };
        match self.store.get_task(task_id) {
            Ok(Some(t)) => match self.store.delete_task(task_id) {
                Ok(()) => ToolResult::success(format!("Task cancelled: {}", t.name)),
                Err(e) => ToolResult::error(format!("failed to cancel task: {e}")),
            },
            Ok(None) => ToolResult::error(format!("task not found: {task_id}")),
            Err(e) => ToolResult::error(format!("failed to cancel task: {e}")),
        }
    }

    fn pause(&self, input: &Value) -> ToolResult {
        let Some(task_id) = require_task_id(input) else {
            return ToolResult::error("'task_id' is required for the pause action");
        };
        match self.store.get_task(task_id) {
            Ok(Some(t)) if t.status == TaskStatus::Active => {
                match self.store.update_task_status(task_id, TaskStatus::Paused) {
                    Ok(()) => ToolResult::success(format!("Task paused: {}", t.name)),
                    Err(e) => ToolResult::error(format!("failed to pause task: {e}")),
                }
            }
            Ok(Some(t)) => ToolResult::error(format!("task is not active (current status: {})", t.status)),
            Ok(None) => ToolResult::error(format!("task not found: {task_id}")),
            Err(e) => ToolResult::error(format!("failed to pause task: {e}")),
        }
    }

    fn resume(&self, input: &Value) -> ToolResult {
        let Some(task_id) = require_task_id(input) else {
            return ToolResult::error("'task_id' is required for the resume action");
        };
        match self.store.get_task(task_id) {
            Ok(Some(t)) if t.status == TaskStatus::Paused => {
                match self.store.update_task_status(task_id, TaskStatus::Active) {
                    Ok(()) => ToolResult::success(format!("Task resumed: {}", t.name)),
                    Err(e) => ToolResult::error(format!("failed to resume task: {e}")),
                }
            }
            Ok(Some(t)) => ToolResult::error(format!("task is not paused (current status: {})", t.status)),
            Ok(None) => ToolResult::error(format!("task not found: {task_id}")),
            Err(e) => ToolResult::error(format!("failed to resume task: {e}")),
        }
    }
}

fn require_task_id(input: &Value) -> Option<&str> {
    input.get("task_id").and_then(Value::as_str).filter(|s| !s.is_empty())
}

#[async_trait]
impl Tool for ScheduledTaskTool {
    fn name(&self) -> &str {
        "scheduled_task"
    }

    fn description(&self) -> &str {
        "Manage scheduled tasks like reminders and recurring messages. \
Actions: add (create), list (show active tasks), get (view details), \
cancel (delete permanently), pause (temporarily stop), resume (reactivate)."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["add", "list", "get", "cancel", "pause", "resume"],
                },
                "task_id": {"type": "string", "description": "Required for get/cancel/pause/resume."},
                "name": {"type": "string", "description": "Required for add."},
                "trigger_type": {"type": "string", "enum": ["once", "interval"], "description": "Required for add."},
                "time": {"type": "string", "description": "Required for add. '30m', '2h', '1d', RFC3339, 'tomorrow', 'next week'."},
                "message": {"type": "string", "description": "Required for add."},
            },
            "required": ["action"],
        })
    }

    async fn execute(&self, input: Value) -> ToolResult {
        match input.get("action").and_then(Value::as_str) {
            Some("add") => self.add(&input),
            Some("list") => self.list(),
            Some("get") => self.get(&input),
            Some("cancel") => self.cancel(&input),
            Some("pause") => self.pause(&input),
            Some("resume") => self.resume(&input),
            Some(other) => ToolResult::error(format!("unknown action: {other}")),
            None => ToolResult::error("'action' is required"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool() -> ScheduledTaskTool {
        ScheduledTaskTool::new(Arc::new(Store::open_in_memory().unwrap()), "UTC".to_string())
    }

    #[tokio::test]
    async fn add_requires_all_fields() {
        let tool = tool();
        let result = tool.execute(json!({"action": "add"})).await;
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn add_then_list_then_cancel() {
        let tool = tool();
        let added = tool
            .execute(json!({
                "action": "add",
                "name": "check in",
                "trigger_type": "once",
                "time": "1h",
                "message": "how's it going?"
            }))
            .await;
        assert!(!added.is_error, "{}", added.content);

        let listed = tool.execute(json!({"action": "list"})).await;
        assert!(!listed.is_error);
        assert!(listed.content.contains("check in"));

        let task_id = tool
            .store
            .get_all_tasks(None)
            .unwrap()
            .first()
            .unwrap()
            .id
            .clone();

        let cancelled = tool.execute(json!({"action": "cancel", "task_id": task_id})).await;
        assert!(!cancelled.is_error);
        assert!(tool.store.get_task(&task_id).unwrap().is_none());
    }

    #[tokio::test]
    async fn pause_rejects_non_active_task() {
        let tool = tool();
        tool.execute(json!({
            "action": "add",
            "name": "x",
            "trigger_type": "interval",
            "time": "1h",
            "message": "ping"
        }))
        .await;
        let task_id = tool.store.get_all_tasks(None).unwrap().first().unwrap().id.clone();
        tool.execute(json!({"action": "pause", "task_id": task_id})).await;

        let result = tool.execute(json!({"action": "pause", "task_id": task_id})).await;
        assert!(result.is_error);
    }
}
