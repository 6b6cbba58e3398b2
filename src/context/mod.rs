// Module: Context
// Per-test-case execution state: identity, accumulated step results and the
// monotonic success flag consulted by conditional guards.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::protocol::ActionResult;

fn default_true() -> bool {
    true
}

/// Mutable record that lives for exactly one test-case execution.
///
/// Unknown caller-supplied fields are preserved verbatim in `extra`;
/// the engine neither reads nor writes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionContext {
    #[serde(rename = "testCaseId")]
    pub test_case_id: String,

    #[serde(rename = "testCaseName")]
    pub test_case_name: String,

    /// Results keyed by step id, inserted as steps reach a terminal state.
    #[serde(rename = "stepResults", default)]
    pub step_results: HashMap<String, ActionResult>,

    /// Starts true; flips to false on the first failed step and never
    /// flips back.
    #[serde(rename = "testSuccess", default = "default_true")]
    pub test_success: bool,

    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl ExecutionContext {
    /// Creates a context for one run. A missing id gets a fresh UUID.
    pub fn new(id: Option<String>, name: impl Into<String>) -> Self {
        Self {
            test_case_id: id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            test_case_name: name.into(),
            step_results: HashMap::new(),
            test_success: true,
            extra: HashMap::new(),
        }
    }

    /// Records a terminal step result. `test_success` only ever goes from
    /// true to false.
    pub fn record(&mut self, step_id: impl Into<String>, result: ActionResult) {
        if !result.success {
            self.test_success = false;
        }
        self.step_results.insert(step_id.into(), result);
    }

    pub fn result_of(&self, step_id: &str) -> Option<&ActionResult> {
        self.step_results.get(step_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_generates_id_when_absent() {
        let ctx = ExecutionContext::new(None, "caso");
        assert!(!ctx.test_case_id.is_empty());
        assert_eq!(ctx.test_case_name, "caso");
        assert!(ctx.test_success);
    }

    #[test]
    fn test_new_keeps_caller_id() {
        let ctx = ExecutionContext::new(Some("run-42".to_string()), "caso");
        assert_eq!(ctx.test_case_id, "run-42");
    }

    #[test]
    fn test_record_flips_success_monotonically() {
        let mut ctx = ExecutionContext::new(None, "caso");

        ctx.record("a", ActionResult::ok(json!({})));
        assert!(ctx.test_success);

        ctx.record("b", ActionResult::fail(json!({"error": "boom"})));
        assert!(!ctx.test_success);

        // um sucesso posterior não restaura o flag
        ctx.record("c", ActionResult::ok(json!({})));
        assert!(!ctx.test_success);
    }

    #[test]
    fn test_unknown_fields_survive_a_roundtrip() {
        let raw = json!({
            "testCaseId": "id-1",
            "testCaseName": "caso",
            "environment": "staging",
        });
        let ctx: ExecutionContext = serde_json::from_value(raw).unwrap();
        assert_eq!(ctx.extra["environment"], json!("staging"));

        let back = serde_json::to_value(&ctx).unwrap();
        assert_eq!(back["environment"], json!("staging"));
    }
}
