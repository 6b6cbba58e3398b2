//! # Módulo de Reporter - Eventos de Ciclo de Vida
//!
//! O engine notifica um `Reporter` a cada transição relevante:
//!
//! | Evento          | Quando                                          |
//! |-----------------|--------------------------------------------------|
//! | `test_start`    | uma vez, após a validação, antes de qualquer step |
//! | `step_start`    | imediatamente antes de cada ação despachada       |
//! | `step_end`      | após cada ação (inclui falha de dependência)      |
//! | `step_skipped`  | uma vez por step excluído pelo guard              |
//! | `test_end`      | uma vez, por último                               |
//! | `generate_report` | sob demanda do chamador, idempotente            |
//!
//! As chamadas são aguardadas pelo engine, mas **não** são serializadas
//! entre branches paralelos do modo DAG: implementações protegem seus
//! próprios buffers.
//!
//! Duas implementações acompanham o runner: uma de console (logs
//! estruturados + resumo) e uma que acumula tudo e grava um relatório
//! JSON no disco.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

// ============================================================================
// CONTRATO
// ============================================================================

/// Sink de eventos de ciclo de vida de um caso de teste.
///
/// Erros propagam para o chamador: o engine não tenta de novo nem
/// engole falhas de reporter.
#[async_trait]
pub trait Reporter: Send + Sync {
    async fn test_start(&self, test_case_id: &str, name: &str) -> Result<()>;

    async fn step_start(&self, step_id: &str, name: &str, kind: &str) -> Result<()>;

    async fn step_end(&self, step_id: &str, success: bool, output: &Value) -> Result<()>;

    async fn step_skipped(&self, step_id: &str, name: &str, kind: &str, reason: &str)
        -> Result<()>;

    async fn test_end(&self, test_case_id: &str, success: bool) -> Result<()>;

    /// Materializa o relatório acumulado. Pode ser chamada mais de uma
    /// vez; o efeito é o mesmo.
    async fn generate_report(&self) -> Result<()>;
}

// ============================================================================
// ESTRUTURAS DO RELATÓRIO
// ============================================================================

/// Registro de um step no relatório.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// "running", "finished", "failed" ou "skipped".
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Resumo estatístico de um caso, para dashboards e CI.
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total: usize,
    pub finished: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl Summary {
    fn from_steps(steps: &[StepRecord]) -> Self {
        let count = |status: &str| steps.iter().filter(|s| s.status == status).count();
        Self {
            total: steps.len(),
            finished: count("finished"),
            failed: count("failed"),
            skipped: count("skipped"),
        }
    }
}

/// Registro de um caso de teste no relatório.
#[derive(Debug, Clone, Serialize)]
pub struct TestCaseRecord {
    pub id: String,
    pub name: String,

    /// "running" enquanto executa; "passed"/"failed" após `test_end`.
    pub status: String,

    pub started_at: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,

    pub steps: Vec<StepRecord>,
}

/// Documento final gravado pelo reporter JSON.
#[derive(Debug, Serialize)]
struct RunReport {
    run_id: String,
    generated_at: String,
    summary: Summary,
    test_cases: Vec<TestCaseRecord>,
}

// ============================================================================
// REPORTER DE CONSOLE
// ============================================================================

/// Relata o progresso via logs estruturados e imprime um resumo ao
/// final. Não escreve nada em disco.
#[derive(Default)]
pub struct ConsoleReporter {
    cases: Mutex<Vec<TestCaseRecord>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Reporter for ConsoleReporter {
    async fn test_start(&self, test_case_id: &str, name: &str) -> Result<()> {
        info!(test_case_id = %test_case_id, name = %name, "▶ caso de teste iniciado");
        self.cases.lock().await.push(TestCaseRecord {
            id: test_case_id.to_string(),
            name: name.to_string(),
            status: "running".to_string(),
            started_at: Utc::now().to_rfc3339(),
            finished_at: None,
            steps: Vec::new(),
        });
        Ok(())
    }

    async fn step_start(&self, step_id: &str, name: &str, kind: &str) -> Result<()> {
        info!(step_id = %step_id, name = %name, kind = %kind, "step iniciado");
        record_step_start(&self.cases, step_id, name, kind).await;
        Ok(())
    }

    async fn step_end(&self, step_id: &str, success: bool, output: &Value) -> Result<()> {
        if success {
            info!(step_id = %step_id, "✅ step concluído");
        } else {
            error!(step_id = %step_id, output = %output, "❌ step falhou");
        }
        record_step_end(&self.cases, step_id, success, output).await;
        Ok(())
    }

    async fn step_skipped(
        &self,
        step_id: &str,
        name: &str,
        kind: &str,
        reason: &str,
    ) -> Result<()> {
        warn!(step_id = %step_id, reason = %reason, "step pulado");
        record_step_skipped(&self.cases, step_id, name, kind, reason).await;
        Ok(())
    }

    async fn test_end(&self, test_case_id: &str, success: bool) -> Result<()> {
        record_test_end(&self.cases, test_case_id, success).await;
        if success {
            info!(test_case_id = %test_case_id, "✅ caso de teste passou");
        } else {
            error!(test_case_id = %test_case_id, "❌ caso de teste falhou");
        }
        Ok(())
    }

    async fn generate_report(&self) -> Result<()> {
        let cases = self.cases.lock().await;
        for case in cases.iter() {
            let summary = Summary::from_steps(&case.steps);
            info!(
                test_case = %case.name,
                status = %case.status,
                total = summary.total,
                finished = summary.finished,
                failed = summary.failed,
                skipped = summary.skipped,
                "resumo"
            );
        }
        Ok(())
    }
}

// ============================================================================
// REPORTER JSON
// ============================================================================

/// Acumula todos os eventos e grava um relatório JSON no caminho
/// configurado quando `generate_report` é chamado.
pub struct JsonFileReporter {
    run_id: String,
    path: PathBuf,
    cases: Mutex<Vec<TestCaseRecord>>,
}

impl JsonFileReporter {
    pub fn new(path: impl Into<PathBuf>, run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            path: path.into(),
            cases: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Reporter for JsonFileReporter {
    async fn test_start(&self, test_case_id: &str, name: &str) -> Result<()> {
        self.cases.lock().await.push(TestCaseRecord {
            id: test_case_id.to_string(),
            name: name.to_string(),
            status: "running".to_string(),
            started_at: Utc::now().to_rfc3339(),
            finished_at: None,
            steps: Vec::new(),
        });
        Ok(())
    }

    async fn step_start(&self, step_id: &str, name: &str, kind: &str) -> Result<()> {
        record_step_start(&self.cases, step_id, name, kind).await;
        Ok(())
    }

    async fn step_end(&self, step_id: &str, success: bool, output: &Value) -> Result<()> {
        record_step_end(&self.cases, step_id, success, output).await;
        Ok(())
    }

    async fn step_skipped(
        &self,
        step_id: &str,
        name: &str,
        kind: &str,
        reason: &str,
    ) -> Result<()> {
        record_step_skipped(&self.cases, step_id, name, kind, reason).await;
        Ok(())
    }

    async fn test_end(&self, test_case_id: &str, success: bool) -> Result<()> {
        record_test_end(&self.cases, test_case_id, success).await;
        Ok(())
    }

    async fn generate_report(&self) -> Result<()> {
        let cases = self.cases.lock().await.clone();
        let all_steps: Vec<StepRecord> = cases.iter().flat_map(|c| c.steps.clone()).collect();
        let report = RunReport {
            run_id: self.run_id.clone(),
            generated_at: Utc::now().to_rfc3339(),
            summary: Summary::from_steps(&all_steps),
            test_cases: cases,
        };

        let json = serde_json::to_string_pretty(&report)
            .context("falha ao serializar o relatório")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("falha ao gravar o relatório em {:?}", self.path))?;
        info!(path = ?self.path, "📄 relatório gravado");
        Ok(())
    }
}

// ============================================================================
// MANUTENÇÃO DO BUFFER (compartilhada pelas duas implementações)
// ============================================================================

async fn record_step_start(
    cases: &Mutex<Vec<TestCaseRecord>>,
    step_id: &str,
    name: &str,
    kind: &str,
) {
    let mut cases = cases.lock().await;
    if let Some(case) = cases.last_mut() {
        case.steps.push(StepRecord {
            id: step_id.to_string(),
            name: Some(name.to_string()),
            kind: Some(kind.to_string()),
            status: "running".to_string(),
            output: None,
            reason: None,
        });
    }
}

async fn record_step_end(
    cases: &Mutex<Vec<TestCaseRecord>>,
    step_id: &str,
    success: bool,
    output: &Value,
) {
    let status = if success { "finished" } else { "failed" };
    let mut cases = cases.lock().await;
    if let Some(case) = cases.last_mut() {
        match case.steps.iter_mut().rev().find(|s| s.id == step_id) {
            Some(step) => {
                step.status = status.to_string();
                step.output = Some(output.clone());
            }
            // step_end sem step_start: falha de dependência sintetizada
            None => case.steps.push(StepRecord {
                id: step_id.to_string(),
                name: None,
                kind: None,
                status: status.to_string(),
                output: Some(output.clone()),
                reason: None,
            }),
        }
    }
}

async fn record_step_skipped(
    cases: &Mutex<Vec<TestCaseRecord>>,
    step_id: &str,
    name: &str,
    kind: &str,
    reason: &str,
) {
    let mut cases = cases.lock().await;
    if let Some(case) = cases.last_mut() {
        case.steps.push(StepRecord {
            id: step_id.to_string(),
            name: Some(name.to_string()),
            kind: Some(kind.to_string()),
            status: "skipped".to_string(),
            output: None,
            reason: Some(reason.to_string()),
        });
    }
}

async fn record_test_end(cases: &Mutex<Vec<TestCaseRecord>>, test_case_id: &str, success: bool) {
    let mut cases = cases.lock().await;
    if let Some(case) = cases.iter_mut().rev().find(|c| c.id == test_case_id) {
        case.status = if success { "passed" } else { "failed" }.to_string();
        case.finished_at = Some(Utc::now().to_rfc3339());
    }
}

// ============================================================================
// TESTES
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_json_reporter_accumulates_and_writes() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("caserunner-report-{}.json", uuid::Uuid::new_v4()));
        let reporter = JsonFileReporter::new(&path, "run-1");

        reporter.test_start("tc-1", "caso").await.unwrap();
        reporter.step_start("a", "primeiro", "noop").await.unwrap();
        reporter.step_end("a", true, &json!({})).await.unwrap();
        reporter
            .step_skipped("b", "segundo", "noop", "guard success() não satisfeito")
            .await
            .unwrap();
        reporter.test_end("tc-1", true).await.unwrap();
        reporter.generate_report().await.unwrap();

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["run_id"], json!("run-1"));
        assert_eq!(written["summary"]["total"], json!(2));
        assert_eq!(written["summary"]["finished"], json!(1));
        assert_eq!(written["summary"]["skipped"], json!(1));
        assert_eq!(written["test_cases"][0]["status"], json!("passed"));

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_generate_report_is_idempotent() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("caserunner-report-{}.json", uuid::Uuid::new_v4()));
        let reporter = JsonFileReporter::new(&path, "run-2");

        reporter.test_start("tc-1", "caso").await.unwrap();
        reporter.test_end("tc-1", false).await.unwrap();

        reporter.generate_report().await.unwrap();
        reporter.generate_report().await.unwrap();

        let written: Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["test_cases"][0]["status"], json!("failed"));

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_synthesized_step_end_without_start_is_recorded() {
        let reporter = ConsoleReporter::new();
        reporter.test_start("tc-1", "caso").await.unwrap();
        // falha de dependência: só chega o step_end
        reporter
            .step_end("dependente", false, &json!({"error": "Dependency 'a' failed"}))
            .await
            .unwrap();

        let cases = reporter.cases.lock().await;
        assert_eq!(cases[0].steps.len(), 1);
        assert_eq!(cases[0].steps[0].status, "failed");
    }
}
