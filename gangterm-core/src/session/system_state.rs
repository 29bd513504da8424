//! Internal-state record reported by `SYSTEM_STATE_RESPONSE`.

use chrono::{DateTime, Local};
use serde_json::{Map, Value};

/// Whole-record snapshot of the backend's internal status.
///
/// Replaced wholesale on every response; fields are whatever the backend
/// sent, with accessors for the flags the control panel knows about.
#[derive(Debug, Clone, PartialEq)]
pub struct InternalStateSnapshot {
    fields: Map<String, Value>,
    received_at: DateTime<Local>,
}

impl InternalStateSnapshot {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            received_at: Local::now(),
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn received_at(&self) -> DateTime<Local> {
        self.received_at
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn model_loaded(&self) -> Option<bool> {
        self.get_bool("model_loaded")
    }

    pub fn workspace_hydrated(&self) -> Option<bool> {
        self.get_bool("workspace_hydrated")
    }

    pub fn snapshot_exists(&self) -> Option<bool> {
        self.get_bool("snapshot_exists")
    }

    pub fn model_path(&self) -> Option<&str> {
        self.get_str("model_path")
    }

    pub fn workspace_sync_target(&self) -> Option<&str> {
        self.get_str("workspace_sync_target")
    }

    pub fn python_version(&self) -> Option<&str> {
        self.get_str("python_version")
    }

    /// `(key, value)` pairs for display, strings unquoted.
    pub fn display_rows(&self) -> Vec<(String, String)> {
        self.fields
            .iter()
            .map(|(key, value)| {
                let rendered = match value {
                    Value::String(s) => s.clone(),
                    Value::Null => "—".to_string(),
                    other => other.to_string(),
                };
                (key.clone(), rendered)
            })
            .collect()
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.fields.get(key).and_then(Value::as_bool)
    }

    fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(value: Value) -> InternalStateSnapshot {
        match value {
            Value::Object(map) => InternalStateSnapshot::new(map),
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_known_fields() {
        let state = snapshot(json!({
            "model_loaded": true,
            "model_path": "/kaggle/working/model",
            "workspace_hydrated": false,
            "workspace_sync_target": null,
            "snapshot_exists": false,
            "python_version": "3.10.12",
        }));

        assert_eq!(state.model_loaded(), Some(true));
        assert_eq!(state.workspace_hydrated(), Some(false));
        assert_eq!(state.snapshot_exists(), Some(false));
        assert_eq!(state.model_path(), Some("/kaggle/working/model"));
        assert_eq!(state.workspace_sync_target(), None);
        assert_eq!(state.python_version(), Some("3.10.12"));
    }

    #[test]
    fn test_display_rows_unquote_strings() {
        let state = snapshot(json!({"model_path": "/m", "gpu_count": 2, "target": null}));
        let rows = state.display_rows();
        assert!(rows.contains(&("model_path".to_string(), "/m".to_string())));
        assert!(rows.contains(&("gpu_count".to_string(), "2".to_string())));
        assert!(rows.contains(&("target".to_string(), "—".to_string())));
    }
}
