//! # Ação Assert
//!
//! Aplica o avaliador de assertions sobre os params do step: compara a
//! forma declarada em `expected` com o valor em `actual`. O step passa
//! somente se **todos** os registros de assertion passarem.
//!
//! ## Params:
//!
//! ```yaml
//! params:
//!   actual: "[cria.output.body]"    # forma curta: valor tipado do contexto
//!   expected:
//!     id: ["shouldNotBeNull"]
//!     name: ana
//! ```
//!
//! `actual` também aceita qualquer valor literal (os placeholders
//! `{expr}` já chegam resolvidos pelo engine). A forma curta
//! `"[caminho]"` preserva o tipo original do valor, enquanto o
//! placeholder produziria texto.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::assertions;
use crate::context::ExecutionContext;
use crate::protocol::{ActionResult, Step};
use crate::registry::Action;
use crate::resolver;

pub struct AssertAction;

#[async_trait]
impl Action for AssertAction {
    async fn run(&self, step: &Step, context: &ExecutionContext) -> Result<ActionResult> {
        let expected = step
            .params
            .get("expected")
            .ok_or_else(|| anyhow!("parâmetro 'expected' ausente na ação assert"))?;

        let actual = step.params.get("actual").map(|v| resolve_actual(v, context));

        let results = assertions::evaluate(expected, actual.as_ref(), context);
        let passed = assertions::all_passed(&results);

        debug!(
            step_id = %step.id,
            total = results.len(),
            failed = results.iter().filter(|r| !r.passed).count(),
            "assertions avaliadas"
        );

        let output = json!({
            "passed": passed,
            "assertions": results,
        });

        Ok(if passed {
            ActionResult::ok(output)
        } else {
            ActionResult::fail(output)
        })
    }
}

/// `"[caminho]"` vira o valor tipado do contexto; qualquer outra coisa é
/// usada como está. Caminho que não resolve fica como a string literal.
fn resolve_actual(value: &Value, context: &ExecutionContext) -> Value {
    if let Value::String(s) = value {
        if s.len() >= 2 && s.starts_with('[') && s.ends_with(']') {
            if let Some(resolved) = resolver::lookup_path(&s[1..s.len() - 1], context) {
                return resolved;
            }
        }
    }
    value.clone()
}
