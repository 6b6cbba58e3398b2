//! # Ações Stub - Echo, Noop e Fail
//!
//! Três ações triviais usadas para compor casos de teste de controle e
//! para exercitar o engine nos próprios testes:
//!
//! - `echo`: devolve os params resolvidos como output
//! - `noop`: não faz nada e passa
//! - `fail`: falha sempre; com `raise: true`, levanta um erro em vez de
//!   retornar falha (útil para verificar o embrulho de erros)

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::context::ExecutionContext;
use crate::protocol::{ActionResult, Step};
use crate::registry::Action;

// ============================================================================
// ECHO
// ============================================================================

/// Devolve os próprios params como output.
///
/// Como os params chegam já resolvidos, o echo é a forma mais direta de
/// observar o que o resolver produziu.
pub struct EchoAction;

#[async_trait]
impl Action for EchoAction {
    async fn run(&self, step: &Step, _context: &ExecutionContext) -> Result<ActionResult> {
        debug!(step_id = %step.id, "echo");
        Ok(ActionResult::ok(step.params.clone()))
    }
}

// ============================================================================
// NOOP
// ============================================================================

/// Passa sem fazer nada.
pub struct NoopAction;

#[async_trait]
impl Action for NoopAction {
    async fn run(&self, step: &Step, _context: &ExecutionContext) -> Result<ActionResult> {
        debug!(step_id = %step.id, "noop");
        Ok(ActionResult::ok(json!({})))
    }
}

// ============================================================================
// FAIL
// ============================================================================

/// Falha sempre.
///
/// Params aceitos:
/// - `message`: texto da falha (padrão: "falha forçada")
/// - `raise`: se true, levanta um erro em vez de retornar `success=false`
pub struct FailAction;

#[async_trait]
impl Action for FailAction {
    async fn run(&self, step: &Step, _context: &ExecutionContext) -> Result<ActionResult> {
        let message = step
            .params
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("falha forçada")
            .to_string();

        if step
            .params
            .get("raise")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
        {
            return Err(anyhow!(message));
        }

        Ok(ActionResult::fail(json!({ "error": message })))
    }
}

// ============================================================================
// TESTES
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn step_with_params(kind: &str, params: serde_json::Value) -> Step {
        Step {
            id: "s1".to_string(),
            name: "stub".to_string(),
            kind: kind.to_string(),
            params,
            condition: None,
            depends_on: vec![],
        }
    }

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(None, "stubs")
    }

    #[tokio::test]
    async fn test_echo_returns_params() {
        let params = json!({"msg": "oi", "n": 2});
        let step = step_with_params("echo", params.clone());

        let result = EchoAction.run(&step, &ctx()).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, params);
    }

    #[tokio::test]
    async fn test_noop_succeeds_with_empty_output() {
        let step = step_with_params("noop", serde_json::Value::Null);
        let result = NoopAction.run(&step, &ctx()).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, json!({}));
    }

    #[tokio::test]
    async fn test_fail_returns_failure_with_message() {
        let step = step_with_params("fail", json!({"message": "quebrou"}));
        let result = FailAction.run(&step, &ctx()).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.output["error"], json!("quebrou"));
    }

    #[tokio::test]
    async fn test_fail_with_raise_returns_err() {
        let step = step_with_params("fail", json!({"message": "explodiu", "raise": true}));
        let err = FailAction.run(&step, &ctx()).await.unwrap_err();
        assert_eq!(err.to_string(), "explodiu");
    }
}
