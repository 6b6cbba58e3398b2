//! # Ação Wait/Sleep - Delays e Pausas
//!
//! Pausa a execução do step pelo tempo pedido. Útil para aguardar
//! processamento assíncrono do sistema sob teste ou para espaçar
//! requisições.
//!
//! ## Kinds atendidas:
//! - `wait` - pausa pelo tempo especificado
//! - `sleep` - alias de `wait`
//!
//! ## Exemplo no documento:
//!
//! ```yaml
//! - name: aguarda processamento
//!   kind: wait
//!   params:
//!     duration_ms: 2000
//! ```

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{info, instrument};

use crate::context::ExecutionContext;
use crate::protocol::{ActionResult, Step};
use crate::registry::Action;

// ============================================================================
// PARÂMETROS
// ============================================================================

/// Parâmetros aceitos por `wait`/`sleep`.
///
/// ## Formatos:
/// - `{ "duration_ms": 1000 }` - formato canônico
/// - `{ "ms": 1000 }` - alias curto
///
/// Se ambos aparecem, `duration_ms` tem precedência.
#[derive(Debug, Deserialize)]
struct WaitParams {
    #[serde(default)]
    duration_ms: Option<u64>,

    #[serde(default)]
    ms: Option<u64>,
}

impl WaitParams {
    fn duration(&self) -> Option<u64> {
        self.duration_ms.or(self.ms)
    }
}

// ============================================================================
// AÇÃO
// ============================================================================

/// Ação de pausa. Sem estado interno, portanto reentrante por
/// construção e segura no modo DAG.
pub struct WaitAction;

impl WaitAction {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WaitAction {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Action for WaitAction {
    /// Aguarda a duração pedida e retorna sucesso com a duração real.
    ///
    /// A duração real pode exceder ligeiramente a pedida por conta do
    /// overhead do runtime.
    #[instrument(skip(self, _context), fields(step_id = %step.id))]
    async fn run(&self, step: &Step, _context: &ExecutionContext) -> Result<ActionResult> {
        let start = Instant::now();

        let params: WaitParams = serde_json::from_value(step.params.clone()).map_err(|e| {
            anyhow!(
                "parâmetros inválidos para {}: {}. Esperado: {{ \"duration_ms\": <número> }} ou {{ \"ms\": <número> }}",
                step.kind,
                e
            )
        })?;

        let duration_ms = params.duration().ok_or_else(|| {
            anyhow!(
                "parâmetros incompletos para {}: forneça 'duration_ms' ou 'ms'",
                step.kind
            )
        })?;

        info!(step_id = %step.id, duration_ms = duration_ms, "⏳ Aguardando...");
        sleep(Duration::from_millis(duration_ms)).await;

        let elapsed = start.elapsed().as_millis() as u64;
        info!(step_id = %step.id, actual_duration_ms = elapsed, "✅ Wait concluído");

        Ok(ActionResult::ok(json!({ "waited_ms": elapsed })))
    }
}

// ============================================================================
// TESTES
// ============================================================================
