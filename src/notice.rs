//! Purpose: Define a stable, structured schema for non-fatal stderr notices.
//! Exports: `Notice`, `notice_json`.
//! Role: Shared contract helper for CLI diagnostics (forced CSV split, unmatched patterns, cancellation).
//! Invariants: Notices are non-fatal and never alter stdout payloads.
//! Invariants: JSON schema is stable once published; fields are additive-only.
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: String,
    pub time: String,
    pub cmd: String,
    pub database: String,
    pub message: String,
    pub details: Map<String, Value>,
}

impl Notice {
    /// Notice stamped with `time`; callers pass the current RFC 3339 time.
    pub fn new(
        kind: impl Into<String>,
        cmd: impl Into<String>,
        database: impl Into<String>,
        message: impl Into<String>,
        time: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            time: time.into(),
            cmd: cmd.into(),
            database: database.into(),
            message: message.into(),
            details: Map::new(),
        }
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

pub fn notice_json(notice: &Notice) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(notice.kind));
    inner.insert("time".to_string(), json!(notice.time));
    inner.insert("cmd".to_string(), json!(notice.cmd));
    inner.insert("database".to_string(), json!(notice.database));
    inner.insert("message".to_string(), json!(notice.message));
    inner.insert("details".to_string(), Value::Object(notice.details.clone()));

    let mut outer = Map::new();
    outer.insert("notice".to_string(), Value::Object(inner));
    Value::Object(outer)
}

#[cfg(test)]
mod tests {
    use super::{Notice, notice_json};

    #[test]
    fn notice_json_has_required_fields() {
        let notice = Notice::new(
            "unmatched_pattern",
            "export",
            "lighting.json",
            "pattern matched no tables",
            "2026-02-01T00:00:00Z",
        )
        .with_detail("patterns", vec!["Phys_*".to_string()]);

        let value = notice_json(&notice);
        let obj = value
            .get("notice")
            .and_then(|v| v.as_object())
            .expect("notice object");

        assert_eq!(
            obj.get("kind").and_then(|v| v.as_str()),
            Some("unmatched_pattern")
        );
        assert_eq!(obj.get("cmd").and_then(|v| v.as_str()), Some("export"));
        assert_eq!(
            obj.get("database").and_then(|v| v.as_str()),
            Some("lighting.json")
        );
        assert_eq!(
            obj.get("message").and_then(|v| v.as_str()),
            Some("pattern matched no tables")
        );
        let details = obj.get("details").and_then(|v| v.as_object()).expect("details");
        assert_eq!(details["patterns"][0], "Phys_*");
    }
}
