//! # Ação HTTP
//!
//! Executa uma requisição HTTP com `reqwest` e devolve status e body
//! como output, para steps posteriores referenciarem via placeholder ou
//! verificarem com a ação `assert`.
//!
//! ## Params:
//!
//! ```yaml
//! params:
//!   method: POST
//!   url: "http://localhost:8080/users"
//!   headers:
//!     Authorization: "Bearer {login.output.body.token}"
//!   body:
//!     name: ana
//!   timeout_ms: 3000        # opcional; senão usa o padrão configurado
//! ```
//!
//! O step passa quando o transporte funciona e o status é menor que 400.
//! Erro de transporte (DNS, conexão recusada, timeout) vira falha do
//! step com a mensagem no output, não um erro levantado.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::context::ExecutionContext;
use crate::protocol::{ActionResult, Step};
use crate::registry::Action;

/// Timeout padrão quando nem o step nem a configuração definem um.
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

// ============================================================================
// PARÂMETROS
// ============================================================================

#[derive(Debug, Deserialize)]
struct HttpParams {
    method: String,
    url: String,

    #[serde(default)]
    headers: HashMap<String, String>,

    #[serde(default)]
    body: Option<Value>,

    #[serde(default)]
    timeout_ms: Option<u64>,
}

// ============================================================================
// AÇÃO
// ============================================================================

/// Ação de requisição HTTP.
///
/// O cliente `reqwest` é reutilizado entre chamadas (pool de conexões);
/// o timeout padrão vem da chave de configuração `http.timeout_ms`.
pub struct HttpAction {
    client: Client,
    default_timeout: Duration,
}

impl HttpAction {
    pub fn new(config: &Config) -> Self {
        let timeout_ms = config
            .get_u64("http.timeout_ms")
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        Self {
            client: Client::new(),
            default_timeout: Duration::from_millis(timeout_ms),
        }
    }
}

#[async_trait]
impl Action for HttpAction {
    #[instrument(skip(self, _context), fields(step_id = %step.id))]
    async fn run(&self, step: &Step, _context: &ExecutionContext) -> Result<ActionResult> {
        let params: HttpParams = serde_json::from_value(step.params.clone())
            .map_err(|e| anyhow!("parâmetros inválidos para http: {}", e))?;

        let method = Method::from_bytes(params.method.to_uppercase().as_bytes())
            .map_err(|_| anyhow!("método HTTP '{}' inválido", params.method))?;

        let timeout = params
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(self.default_timeout);

        let mut request = self
            .client
            .request(method.clone(), &params.url)
            .timeout(timeout);
        for (name, value) in &params.headers {
            request = request.header(name, value);
        }
        if let Some(body) = &params.body {
            request = request.json(body);
        }

        let start = Instant::now();
        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(step_id = %step.id, error = %e, "❌ falha de transporte HTTP");
                return Ok(ActionResult::fail(json!({
                    "error": format!("falha de transporte: {}", e),
                })));
            }
        };

        let status = response.status().as_u16();
        let duration_ms = start.elapsed().as_millis() as u64;

        // body como JSON quando possível, senão como texto cru
        let text = response.text().await.unwrap_or_default();
        let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));

        info!(
            step_id = %step.id,
            method = %method,
            url = %params.url,
            status = status,
            duration_ms = duration_ms,
            "requisição concluída"
        );

        let output = json!({
            "status": status,
            "body": body,
            "duration_ms": duration_ms,
        });

        Ok(if status < 400 {
            ActionResult::ok(output)
        } else {
            ActionResult::fail(output)
        })
    }
}

// ============================================================================
// TESTES
// ============================================================================
