use seele_store::{TriggerConfig, TriggerType};
use serde::{Deserialize, Serialize};

/// One entry of the profile directory's `scheduled_tasks.json`, loaded once
/// at startup and upserted into the store by name (create if absent, left
/// untouched if a task with that name already exists).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapTask {
    pub name: String,
    pub trigger_type: TriggerType,
    pub trigger_config: TriggerConfig,
    pub message: String,
}
