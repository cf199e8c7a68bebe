//! Task context handed to the dispatcher

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unit of work. Selection only ever inspects `task_type`; the remaining
/// fields belong to the intake and execution layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskContext {
    #[serde(default)]
    pub task_id: TaskId,
    pub task_type: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

fn default_priority() -> u8 {
    5
}

impl TaskContext {
    pub fn new(task_type: impl Into<String>) -> Self {
        Self {
            task_id: TaskId::new(),
            task_type: task_type.into(),
            title: None,
            priority: default_priority(),
            created_at: Utc::now(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_builder() {
        let task = TaskContext::new("code_review")
            .with_title("Review PR")
            .with_priority(9)
            .with_metadata(serde_json::json!({"repo": "core"}));

        assert_eq!(task.task_type, "code_review");
        assert_eq!(task.title.as_deref(), Some("Review PR"));
        assert_eq!(task.priority, 9);
        assert_eq!(task.metadata["repo"], "core");
    }

    #[test]
    fn test_task_ids_unique() {
        assert_ne!(TaskContext::new("a").task_id, TaskContext::new("a").task_id);
    }

    #[test]
    fn test_minimal_deserialization() {
        let task: TaskContext = serde_json::from_str(r#"{"task_type": "docker"}"#).unwrap();
        assert_eq!(task.task_type, "docker");
        assert_eq!(task.priority, 5);
        assert!(task.metadata.is_null());
    }
}
