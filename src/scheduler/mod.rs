//! # Módulo de Scheduler - Execução de Casos de Teste
//!
//! Este módulo implementa o motor que dirige um caso de teste validado
//! até todos os steps alcançarem um estado terminal.
//!
//! ## Para todos entenderem:
//!
//! Imagine uma lista de tarefas da casa:
//! - Lavar roupa (não depende de nada)
//! - Fazer café (não depende de nada)
//! - Dobrar roupa (depende de "lavar roupa")
//!
//! Quando ninguém declara dependências, o runner simplesmente executa
//! na ordem da lista (**modo sequencial**). Quando alguém declara, o
//! runner monta o grafo e executa em paralelo tudo que estiver liberado
//! (**modo DAG**): "lavar roupa" e "fazer café" rodam juntos, "dobrar
//! roupa" espera.
//!
//! Os dois modos compartilham o mesmo procedimento por step, então na
//! ausência de dependências eles são observacionalmente equivalentes —
//! o sequencial é só o caso degenerado do DAG.
//!
//! ## Procedimento por step:
//!
//! 1. Se alguma dependência falhou: falha sintética, ação nunca invocada
//! 2. Cópia profunda do step + resolução de placeholders no contexto atual
//! 3. Guard condicional (`always()` / `success()` / `failure()`)
//! 4. `step_start` no reporter
//! 5. Lookup da kind no registry (desconhecida = falha do step)
//! 6. Invocação da ação; erro levantado vira `{error, stack}`
//! 7. Resultado gravado no contexto; `testSuccess` desce para false se falhou
//! 8. `step_end` no reporter
//!
//! ## Thread Safety:
//!
//! O contexto e o mapa de estados ficam atrás de `tokio::sync::Mutex`,
//! compartilhados via `Arc` entre as tasks do modo DAG. Um `Semaphore`
//! limita quantos steps rodam ao mesmo tempo sem quebrar a equidade:
//! todo step pronto eventualmente adquire uma vaga. Chamadas ao
//! reporter acontecem fora dos locks.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

use crate::context::ExecutionContext;
use crate::errors::ErrorCode;
use crate::limits::ExecutionLimits;
use crate::protocol::{ActionResult, Condition, Step, StepState, TestCase};
use crate::registry::ActionRegistry;
use crate::reporter::Reporter;
use crate::resolver;
use crate::validation::{self, ValidationError};

// ============================================================================
// ERROS DO ENGINE
// ============================================================================

/// Erros que interrompem a execução de um caso de teste.
///
/// Falhas de step **não** aparecem aqui: elas são capturadas nos
/// resultados e a execução continua (guards `failure()`/`always()`
/// existem justamente para reagir a elas).
#[derive(Debug, Error)]
pub enum EngineError {
    /// Caso de teste malformado. Nenhum step executou e nenhum evento
    /// chegou ao reporter.
    #[error("caso de teste inválido: {0}")]
    Validation(#[from] ValidationError),

    /// Uma chamada ao reporter falhou; o engine não tenta de novo.
    #[error("reporter falhou: {0}")]
    Reporter(#[source] anyhow::Error),

    /// Erro inesperado do runtime (join de task, semáforo).
    #[error("erro interno do scheduler: {0}")]
    Internal(String),
}

// ============================================================================
// SCHEDULER
// ============================================================================

/// Mapa de estados dos steps, vivo apenas durante uma execução.
type StateMap = Arc<Mutex<HashMap<String, StepState>>>;

/// Motor de execução de casos de teste.
///
/// Construído uma vez com o registry (somente leitura durante a
/// execução) e o reporter; pode executar vários casos em sequência.
#[derive(Clone)]
pub struct Scheduler {
    registry: Arc<ActionRegistry>,
    reporter: Arc<dyn Reporter>,
    limits: ExecutionLimits,
}

impl Scheduler {
    pub fn new(registry: Arc<ActionRegistry>, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            registry,
            reporter,
            limits: ExecutionLimits::default(),
        }
    }

    /// Substitui os limites padrão (teto de paralelismo do modo DAG).
    pub fn with_limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Executa um caso de teste e retorna o veredito agregado.
    ///
    /// O veredito é o AND do sucesso percebido de cada step, onde um
    /// step pulado conta como sucesso.
    ///
    /// O contexto chega compartilhado para o chamador poder inspecionar
    /// `stepResults` depois. O flag `testSuccess` não é reinicializado
    /// aqui: um chamador que o pré-ajustou sabe o que está fazendo.
    #[instrument(skip_all, fields(test_case = %test_case.name))]
    pub async fn execute_test_case(
        &self,
        test_case: &TestCase,
        context: Arc<Mutex<ExecutionContext>>,
    ) -> Result<bool, EngineError> {
        // 1. validação fail-fast: erro de configuração sobe sem que
        // nenhum step rode ou evento seja emitido
        validation::validate_test_case(test_case)?;

        // 2. todos os steps começam pendentes
        let states: StateMap = Arc::new(Mutex::new(
            test_case
                .steps
                .iter()
                .map(|step| (step.id.clone(), StepState::Pending))
                .collect(),
        ));

        let (case_id, case_name) = {
            let ctx = context.lock().await;
            (ctx.test_case_id.clone(), ctx.test_case_name.clone())
        };

        self.reporter
            .test_start(&case_id, &case_name)
            .await
            .map_err(EngineError::Reporter)?;

        // 3. seleção de modo: dependências declaradas ligam o DAG
        let mode_result = if test_case.declares_dependencies() {
            info!(steps = test_case.steps.len(), "executando em modo DAG");
            self.run_dag(test_case, &context, &states).await
        } else {
            info!(steps = test_case.steps.len(), "executando em modo sequencial");
            self.run_sequential(test_case, &context, &states).await
        };
        mode_result?;

        // 4. veredito agregado: skipped conta como sucesso
        let verdict = {
            let ctx = context.lock().await;
            let states = states.lock().await;
            test_case.steps.iter().all(|step| {
                states.get(step.id.as_str()) == Some(&StepState::Skipped)
                    || ctx.result_of(&step.id).is_some_and(|r| r.success)
            })
        };

        self.reporter
            .test_end(&case_id, verdict)
            .await
            .map_err(EngineError::Reporter)?;

        Ok(verdict)
    }

    // ========================================================================
    // MODO SEQUENCIAL
    // ========================================================================

    /// Itera os steps na ordem declarada, um por vez.
    ///
    /// Caso degenerado do DAG: mesmo procedimento por step, sem
    /// concorrência. O resultado de um step nunca muda por ter rodado
    /// aqui em vez de lá.
    async fn run_sequential(
        &self,
        test_case: &TestCase,
        context: &Arc<Mutex<ExecutionContext>>,
        states: &StateMap,
    ) -> Result<(), EngineError> {
        for step in &test_case.steps {
            self.run_step(step, context, states).await?;
        }
        Ok(())
    }

    // ========================================================================
    // MODO DAG
    // ========================================================================

    /// Executa com paralelismo máximo respeitando dependências.
    ///
    /// ## Algoritmo:
    ///
    /// 1. Seleciona todo step pendente cujas dependências são terminais
    /// 2. Marca como `Running` e lança uma task para cada um
    /// 3. Espera **pelo menos uma** task terminar
    /// 4. Repete até não restar nada pendente nem em voo
    ///
    /// O `Semaphore` limita quantas tasks trabalham ao mesmo tempo; as
    /// demais ficam na fila da vaga, preservando a equidade.
    async fn run_dag(
        &self,
        test_case: &TestCase,
        context: &Arc<Mutex<ExecutionContext>>,
        states: &StateMap,
    ) -> Result<(), EngineError> {
        let max_parallel = if self.limits.max_parallel > 0 {
            self.limits.max_parallel
        } else {
            test_case.steps.len().max(1)
        };
        let semaphore = Arc::new(Semaphore::new(max_parallel));
        let mut join_set: JoinSet<Result<(), EngineError>> = JoinSet::new();

        loop {
            // seleciona e marca os prontos sob o mesmo lock, para duas
            // iterações não despacharem o mesmo step
            let ready: Vec<Step> = {
                let mut states = states.lock().await;
                let ready: Vec<Step> = test_case
                    .steps
                    .iter()
                    .filter(|step| {
                        states.get(step.id.as_str()) == Some(&StepState::Pending)
                            && step.depends_on.iter().all(|dep| {
                                states.get(dep.as_str()).is_some_and(|s| s.is_terminal())
                            })
                    })
                    .cloned()
                    .collect();
                for step in &ready {
                    states.insert(step.id.clone(), StepState::Running);
                }
                ready
            };

            for step in ready {
                let engine = self.clone();
                let context = Arc::clone(context);
                let states = Arc::clone(states);
                let semaphore = Arc::clone(&semaphore);
                join_set.spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| EngineError::Internal(format!("semáforo fechado: {e}")))?;
                    engine.run_step(&step, &context, &states).await
                });
            }

            // nada em voo e nada pronto: todos os steps são terminais
            match join_set.join_next().await {
                None => break,
                Some(Ok(outcome)) => outcome?,
                Some(Err(join_error)) => {
                    return Err(EngineError::Internal(join_error.to_string()))
                }
            }
        }

        Ok(())
    }

    // ========================================================================
    // PROCEDIMENTO POR STEP
    // ========================================================================

    /// Executa um único step do começo ao estado terminal.
    ///
    /// Compartilhado pelos dois modos; os `Err` retornados aqui são
    /// exclusivamente falhas de reporter.
    #[instrument(skip_all, fields(step_id = %step.id, kind = %step.kind))]
    async fn run_step(
        &self,
        step: &Step,
        context: &Arc<Mutex<ExecutionContext>>,
        states: &StateMap,
    ) -> Result<(), EngineError> {
        states
            .lock()
            .await
            .insert(step.id.clone(), StepState::Running);

        // 0. curto-circuito por dependência que falhou: o guard não é
        // consultado e a ação nunca é invocada
        let failed_dep = {
            let ctx = context.lock().await;
            step.depends_on
                .iter()
                .find(|dep| ctx.result_of(dep).is_some_and(|r| !r.success))
                .cloned()
        };
        if let Some(dep) = failed_dep {
            warn!(step_id = %step.id, failed_dep = %dep, "dependência falhou; step não despachado");
            let result = ActionResult::dependency_failed(&dep);
            self.finish_step(step, StepState::Failed, result, context, states)
                .await?;
            return Ok(());
        }

        // 1-2. cópia profunda + resolução just-in-time contra o contexto
        // corrente; o snapshot segue para a ação
        let (resolved, snapshot) = {
            let ctx = context.lock().await;
            let mut copy = step.clone();
            copy.params = resolver::resolve(&step.params, &ctx);
            (copy, ctx.clone())
        };

        // 3. guard condicional; a validação já garantiu a sintaxe
        let condition = resolved
            .condition
            .as_deref()
            .and_then(Condition::parse)
            .unwrap_or(Condition::Success);
        if !condition.should_run(snapshot.test_success) {
            let reason = format!(
                "guard {} não satisfeito (testSuccess={})",
                condition, snapshot.test_success
            );
            info!(step_id = %step.id, reason = %reason, "step pulado");
            {
                let mut ctx = context.lock().await;
                ctx.record(&step.id, ActionResult::skipped());
            }
            states
                .lock()
                .await
                .insert(step.id.clone(), StepState::Skipped);
            self.reporter
                .step_skipped(&step.id, &resolved.name, &resolved.kind, &reason)
                .await
                .map_err(EngineError::Reporter)?;
            return Ok(());
        }

        // 4. início
        self.reporter
            .step_start(&step.id, &resolved.name, &resolved.kind)
            .await
            .map_err(EngineError::Reporter)?;

        // 5-6. dispatch; kind desconhecida e erro levantado viram falha
        // do step sem interromper o scheduler
        let result = match self.registry.get(&resolved.kind) {
            None => {
                error!(step_id = %step.id, kind = %resolved.kind, "nenhuma ação registrada");
                ActionResult::fail(json!({
                    "error": format!("nenhuma ação registrada para kind '{}'", resolved.kind),
                    "code": ErrorCode::UNKNOWN_ACTION_KIND.formatted(),
                    "known_kinds": self.registry.kinds(),
                }))
            }
            Some(action) => match action.run(&resolved, &snapshot).await {
                Ok(result) => result,
                Err(raised) => {
                    error!(step_id = %step.id, error = %raised, "ação levantou erro");
                    ActionResult::from_error(&raised)
                }
            },
        };

        // 7-8. grava e notifica
        let state = if result.success {
            StepState::Finished
        } else {
            StepState::Failed
        };
        self.finish_step(step, state, result, context, states).await
    }

    /// Grava o resultado, marca o estado terminal e emite `step_end`.
    ///
    /// A ordem importa: o resultado entra no contexto **antes** do
    /// estado virar terminal, então quando um dependente é liberado o
    /// resultado já está visível para o resolver dele.
    async fn finish_step(
        &self,
        step: &Step,
        state: StepState,
        result: ActionResult,
        context: &Arc<Mutex<ExecutionContext>>,
        states: &StateMap,
    ) -> Result<(), EngineError> {
        let success = result.success;
        let output = result.output.clone();
        {
            let mut ctx = context.lock().await;
            ctx.record(&step.id, result);
        }
        states.lock().await.insert(step.id.clone(), state);

        info!(step_id = %step.id, success = success, state = ?state, "step terminou");
        self.reporter
            .step_end(&step.id, success, &output)
            .await
            .map_err(EngineError::Reporter)
    }
}

// ============================================================================
// TESTES
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::stub::{EchoAction, FailAction, NoopAction};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::Value;

    // ------------------------------------------------------------------
    // infra de teste: reporter gravador e construtores de fixture
    // ------------------------------------------------------------------

    /// Grava cada evento como uma linha "tipo:id[:detalhe]".
    #[derive(Default)]
    struct RecordingReporter {
        events: Mutex<Vec<String>>,
    }

    impl RecordingReporter {
        async fn events(&self) -> Vec<String> {
            self.events.lock().await.clone()
        }
    }

    #[async_trait]
    impl Reporter for RecordingReporter {
        async fn test_start(&self, id: &str, _name: &str) -> anyhow::Result<()> {
            self.events.lock().await.push(format!("test_start:{id}"));
            Ok(())
        }

        async fn step_start(&self, id: &str, _name: &str, _kind: &str) -> anyhow::Result<()> {
            self.events.lock().await.push(format!("step_start:{id}"));
            Ok(())
        }

        async fn step_end(&self, id: &str, success: bool, _output: &Value) -> anyhow::Result<()> {
            self.events
                .lock()
                .await
                .push(format!("step_end:{id}:{success}"));
            Ok(())
        }

        async fn step_skipped(
            &self,
            id: &str,
            _name: &str,
            _kind: &str,
            reason: &str,
        ) -> anyhow::Result<()> {
            self.events
                .lock()
                .await
                .push(format!("step_skipped:{id}:{reason}"));
            Ok(())
        }

        async fn test_end(&self, id: &str, success: bool) -> anyhow::Result<()> {
            self.events
                .lock()
                .await
                .push(format!("test_end:{id}:{success}"));
            Ok(())
        }

        async fn generate_report(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    /// Reporter que falha no primeiro step_start.
    struct BrokenReporter;

    #[async_trait]
    impl Reporter for BrokenReporter {
        async fn test_start(&self, _id: &str, _name: &str) -> anyhow::Result<()> {
            Ok(())
        }

        async fn step_start(&self, _id: &str, _name: &str, _kind: &str) -> anyhow::Result<()> {
            Err(anyhow!("sink indisponível"))
        }

        async fn step_end(
            &self,
            _id: &str,
            _success: bool,
            _output: &Value,
        ) -> anyhow::Result<()> {
            Ok(())
        }

        async fn step_skipped(
            &self,
            _id: &str,
            _name: &str,
            _kind: &str,
            _reason: &str,
        ) -> anyhow::Result<()> {
            Ok(())
        }

        async fn test_end(&self, _id: &str, _success: bool) -> anyhow::Result<()> {
            Ok(())
        }

        async fn generate_report(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn registry() -> Arc<ActionRegistry> {
        let mut registry = ActionRegistry::new();
        registry.register("noop", Arc::new(NoopAction));
        registry.register("echo", Arc::new(EchoAction));
        registry.register("fail", Arc::new(FailAction));
        Arc::new(registry)
    }

    fn step(id: &str, kind: &str) -> Step {
        Step {
            id: id.to_string(),
            name: format!("step {id}"),
            kind: kind.to_string(),
            params: Value::Null,
            condition: None,
            depends_on: vec![],
        }
    }

    fn case(steps: Vec<Step>) -> TestCase {
        TestCase {
            kind: crate::protocol::TEST_CASE_KIND.to_string(),
            version: "1".to_string(),
            name: "caso".to_string(),
            steps,
        }
    }

    fn shared_context() -> Arc<Mutex<ExecutionContext>> {
        Arc::new(Mutex::new(ExecutionContext::new(
            Some("tc-1".to_string()),
            "caso",
        )))
    }

    async fn run(
        test_case: &TestCase,
        reporter: Arc<RecordingReporter>,
    ) -> (Result<bool, EngineError>, Arc<Mutex<ExecutionContext>>) {
        let context = shared_context();
        let scheduler = Scheduler::new(registry(), reporter);
        let verdict = scheduler
            .execute_test_case(test_case, Arc::clone(&context))
            .await;
        (verdict, context)
    }

    // ------------------------------------------------------------------
    // cenários
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_linear_success() {
        let mut echo = step("B", "echo");
        echo.params = serde_json::json!({ "msg": "{A}" });
        let tc = case(vec![step("A", "noop"), echo]);

        let reporter = Arc::new(RecordingReporter::default());
        let (verdict, context) = run(&tc, Arc::clone(&reporter)).await;

        assert!(verdict.unwrap());

        let ctx = context.lock().await;
        let a_json = serde_json::to_value(ctx.result_of("A").unwrap())
            .unwrap()
            .to_string();
        assert_eq!(
            ctx.result_of("B").unwrap().output["msg"],
            Value::String(a_json)
        );

        let events = reporter.events().await;
        assert_eq!(events.first().unwrap(), "test_start:tc-1");
        assert_eq!(events.last().unwrap(), "test_end:tc-1:true");
    }

    #[tokio::test]
    async fn test_conditional_short_circuit() {
        let mut always = step("C", "echo");
        always.condition = Some("always()".to_string());
        let tc = case(vec![step("A", "fail"), step("B", "noop"), always]);

        let reporter = Arc::new(RecordingReporter::default());
        let (verdict, context) = run(&tc, Arc::clone(&reporter)).await;

        assert!(!verdict.unwrap());

        let events = reporter.events().await;
        let skipped = events
            .iter()
            .find(|e| e.starts_with("step_skipped:B"))
            .unwrap();
        assert!(skipped.contains("success()"));
        assert!(events.contains(&"step_end:C:true".to_string()));

        // B recebeu o resultado sintético de pulado
        let ctx = context.lock().await;
        assert_eq!(
            ctx.result_of("B").unwrap().output,
            Value::String("SKIPPED".to_string())
        );
    }

    #[tokio::test]
    async fn test_failure_branch_runs_on_failure() {
        let mut cleanup = step("C", "noop");
        cleanup.condition = Some("failure()".to_string());
        let tc = case(vec![step("A", "noop"), step("B", "fail"), cleanup]);

        let reporter = Arc::new(RecordingReporter::default());
        let (verdict, context) = run(&tc, Arc::clone(&reporter)).await;

        assert!(!verdict.unwrap());
        let ctx = context.lock().await;
        assert!(ctx.result_of("C").unwrap().success);
    }

    #[tokio::test]
    async fn test_failure_branch_skips_on_success() {
        let mut recovery = step("B", "noop");
        recovery.condition = Some("failure()".to_string());
        let tc = case(vec![step("A", "noop"), recovery]);

        let reporter = Arc::new(RecordingReporter::default());
        let (verdict, _context) = run(&tc, Arc::clone(&reporter)).await;

        // pulado conta como sucesso no agregado
        assert!(verdict.unwrap());
        let events = reporter.events().await;
        assert!(events.iter().any(|e| e.starts_with("step_skipped:B")));
    }

    #[tokio::test]
    async fn test_dag_respects_dependency_order() {
        let mut b = step("B", "noop");
        b.depends_on = vec!["A".to_string()];
        let mut c = step("C", "noop");
        c.depends_on = vec!["A".to_string()];
        let mut d = step("D", "noop");
        d.depends_on = vec!["B".to_string(), "C".to_string()];
        let tc = case(vec![step("A", "noop"), b, c, d]);

        let reporter = Arc::new(RecordingReporter::default());
        let (verdict, context) = run(&tc, Arc::clone(&reporter)).await;

        assert!(verdict.unwrap());

        let ctx = context.lock().await;
        for id in ["A", "B", "C", "D"] {
            assert!(ctx.result_of(id).unwrap().success);
        }

        let events = reporter.events().await;
        let index_of = |needle: &str| events.iter().position(|e| e == needle).unwrap();
        // A termina antes de B e C começarem; D começa depois de B e C
        assert!(index_of("step_end:A:true") < index_of("step_start:B"));
        assert!(index_of("step_end:A:true") < index_of("step_start:C"));
        assert!(index_of("step_end:B:true") < index_of("step_start:D"));
        assert!(index_of("step_end:C:true") < index_of("step_start:D"));
    }

    #[tokio::test]
    async fn test_dependency_failure_propagates_without_dispatch() {
        let mut dependent = step("B", "noop");
        dependent.depends_on = vec!["A".to_string()];
        dependent.condition = Some("always()".to_string());
        let tc = case(vec![step("A", "fail"), dependent]);

        let reporter = Arc::new(RecordingReporter::default());
        let (verdict, context) = run(&tc, Arc::clone(&reporter)).await;

        assert!(!verdict.unwrap());

        let ctx = context.lock().await;
        let b = ctx.result_of("B").unwrap();
        assert!(!b.success);
        assert_eq!(
            b.output["error"],
            Value::String("Dependency 'A' failed".to_string())
        );

        // a ação de B nunca foi invocada: sem step_start para B
        let events = reporter.events().await;
        assert!(!events.contains(&"step_start:B".to_string()));
        assert!(events.contains(&"step_end:B:false".to_string()));
    }

    #[tokio::test]
    async fn test_forward_reference_rejected_before_any_event() {
        let mut a = step("A", "noop");
        a.depends_on = vec!["B".to_string()];
        let tc = case(vec![a, step("B", "noop")]);

        let reporter = Arc::new(RecordingReporter::default());
        let (verdict, _context) = run(&tc, Arc::clone(&reporter)).await;

        assert!(matches!(verdict, Err(EngineError::Validation(_))));
        assert!(reporter.events().await.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_kind_fails_step_but_not_scheduler() {
        let tc = case(vec![step("A", "inexistente"), step("B", "noop")]);

        let reporter = Arc::new(RecordingReporter::default());
        let (verdict, context) = run(&tc, Arc::clone(&reporter)).await;

        assert!(!verdict.unwrap());

        let ctx = context.lock().await;
        let a = ctx.result_of("A").unwrap();
        assert!(!a.success);
        assert_eq!(a.output["code"], Value::String("E2001".to_string()));

        // B ainda foi considerado (e pulado pelo guard padrão success())
        let events = reporter.events().await;
        assert!(events.iter().any(|e| e.starts_with("step_skipped:B")));
    }

    #[tokio::test]
    async fn test_raised_action_error_is_wrapped() {
        let mut boom = step("A", "fail");
        boom.params = serde_json::json!({ "message": "explodiu", "raise": true });
        let tc = case(vec![boom]);

        let reporter = Arc::new(RecordingReporter::default());
        let (verdict, context) = run(&tc, Arc::clone(&reporter)).await;

        assert!(!verdict.unwrap());

        let ctx = context.lock().await;
        let a = ctx.result_of("A").unwrap();
        assert_eq!(a.output["error"], Value::String("explodiu".to_string()));
        assert!(a.output.get("stack").is_some());
    }

    #[tokio::test]
    async fn test_every_step_reaches_exactly_one_terminal_result() {
        let mut always = step("C", "echo");
        always.condition = Some("always()".to_string());
        let tc = case(vec![step("A", "fail"), step("B", "noop"), always]);

        let (_verdict, context) = run(&tc, Arc::new(RecordingReporter::default())).await;

        let ctx = context.lock().await;
        assert_eq!(ctx.step_results.len(), 3);
    }

    #[tokio::test]
    async fn test_reporter_failure_propagates() {
        let tc = case(vec![step("A", "noop")]);
        let scheduler = Scheduler::new(registry(), Arc::new(BrokenReporter));

        let outcome = scheduler.execute_test_case(&tc, shared_context()).await;
        assert!(matches!(outcome, Err(EngineError::Reporter(_))));
    }

    #[tokio::test]
    async fn test_dag_mode_resolves_dependency_results() {
        // B referencia o output de A via placeholder no modo DAG
        let mut b = step("B", "echo");
        b.depends_on = vec!["A".to_string()];
        b.params = serde_json::json!({ "anterior": "{A.success}" });
        let tc = case(vec![step("A", "noop"), b]);

        let (verdict, context) = run(&tc, Arc::new(RecordingReporter::default())).await;

        assert!(verdict.unwrap());
        let ctx = context.lock().await;
        assert_eq!(
            ctx.result_of("B").unwrap().output["anterior"],
            Value::String("true".to_string())
        );
    }

    #[tokio::test]
    async fn test_admission_limit_still_completes_everything() {
        // mais steps prontos do que vagas: todos terminam mesmo assim
        let mut steps: Vec<Step> = (0..8).map(|i| step(&format!("s{i}"), "noop")).collect();
        let mut last = step("fim", "noop");
        last.depends_on = (0..8).map(|i| format!("s{i}")).collect();
        steps.push(last);
        let tc = case(steps);

        let scheduler = Scheduler::new(registry(), Arc::new(RecordingReporter::default()))
            .with_limits(ExecutionLimits { max_parallel: 2 });
        let context = shared_context();
        let verdict = scheduler
            .execute_test_case(&tc, Arc::clone(&context))
            .await
            .unwrap();

        assert!(verdict);
        assert_eq!(context.lock().await.step_results.len(), 9);
    }

    #[tokio::test]
    async fn test_caller_preset_failure_flag_is_respected() {
        // chamador pré-ajustou testSuccess=false: o guard padrão pula tudo
        let tc = case(vec![step("A", "noop")]);
        let context = shared_context();
        context.lock().await.test_success = false;

        let reporter = Arc::new(RecordingReporter::default());
        let scheduler = Scheduler::new(registry(), Arc::clone(&reporter) as Arc<dyn Reporter>);
        let verdict = scheduler
            .execute_test_case(&tc, Arc::clone(&context))
            .await
            .unwrap();

        // pulado conta como sucesso
        assert!(verdict);
        assert!(reporter
            .events()
            .await
            .iter()
            .any(|e| e.starts_with("step_skipped:A")));
    }
}
