//! # Caserunner - Motor de Execução de Casos de Teste Declarativos
//!
//! Este é o **ponto de entrada** do runner: o binário que carrega
//! documentos YAML de casos de teste, valida, executa (sequencial ou em
//! DAG paralelo) e emite um relatório estruturado.
//!
//! ## O que este arquivo faz?
//!
//! 1. **Processa argumentos da CLI** usando a biblioteca `clap`
//! 2. **Carrega e valida** os documentos de caso de teste
//! 3. **Inicializa a telemetria** (logs estruturados + OTEL opcional)
//! 4. **Executa os steps** de cada caso via scheduler
//! 5. **Gera o relatório** (console ou arquivo JSON)
//!
//! ## Exemplo de uso:
//!
//! ```bash
//! # Executar um caso de teste
//! caserunner run casos/login.yaml
//!
//! # Executar um diretório inteiro, com relatório JSON e OTEL
//! caserunner run casos/ --output relatorio.json --otel
//!
//! # Só validar, sem executar nada
//! caserunner validate casos/login.yaml
//! ```
//!
//! ## Arquitetura:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                       main.rs                           │
//! │          (CLI, descoberta de arquivos, exit code)       │
//! └─────────────────────────────────────────────────────────┘
//!                            │
//!        ┌───────────────────┼───────────────────┐
//!        ▼                   ▼                   ▼
//!  ┌──────────┐        ┌───────────┐       ┌──────────┐
//!  │ loader/  │        │scheduler/ │       │ actions/ │
//!  │ (YAML)   │        │(seq + DAG)│       │ (builtin)│
//!  └──────────┘        └───────────┘       └──────────┘
//!                            │
//!              ┌─────────────┼─────────────┐
//!              ▼             ▼             ▼
//!        ┌──────────┐  ┌──────────┐  ┌───────────┐
//!        │resolver/ │  │validation│  │ reporter/ │
//!        └──────────┘  └──────────┘  └───────────┘
//! ```

// ============================================================================
// DECLARAÇÃO DE MÓDULOS
// ============================================================================

/// Módulo de ações embutidas: echo, noop, fail, wait, http, assert.
mod actions;

/// Módulo de assertions: comparação de forma esperada vs. obtida.
mod assertions;

/// Módulo de configuração: chaves pontilhadas com projeção de ambiente.
mod config;

/// Módulo de contexto: estado por caso de teste (resultados, testSuccess).
mod context;

/// Módulo de erros: códigos estruturados (E1xxx, E2xxx, ...).
mod errors;

/// Módulo de limites: teto de paralelismo do modo DAG.
mod limits;

/// Módulo de carregamento: YAML → TestCase.
mod loader;

/// Módulo de protocolo: TestCase, Step, ActionResult, estados.
mod protocol;

/// Módulo de registry: contrato Action e mapa kind → ação.
mod registry;

/// Módulo de reporter: eventos de ciclo de vida e relatórios.
mod reporter;

/// Módulo de resolução: placeholders {expr} sobre o contexto.
mod resolver;

/// Módulo de scheduler: execução sequencial e DAG.
mod scheduler;

/// Módulo de telemetria: tracing + OpenTelemetry.
mod telemetry;

/// Módulo de validação: checagens estáticas do caso de teste.
mod validation;

// ============================================================================
// IMPORTS
// ============================================================================

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::Mutex;
use tracing::{error, info, Level};
use uuid::Uuid;

use config::Config;
use context::ExecutionContext;
use limits::ExecutionLimits;
use reporter::{ConsoleReporter, JsonFileReporter, Reporter};
use scheduler::Scheduler;
use telemetry::{init_telemetry, shutdown_telemetry, TelemetryConfig};

// ============================================================================
// DEFINIÇÃO DA CLI
// ============================================================================

/// Estrutura principal da CLI, gerada pelo `clap`.
#[derive(Parser)]
#[command(name = "caserunner")]
#[command(about = "Motor de execução de casos de teste declarativos", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Subcomandos disponíveis.
#[derive(Subcommand)]
enum Commands {
    /// Executa casos de teste (arquivos YAML ou diretórios com eles).
    Run {
        /// Arquivos de caso de teste ou diretórios contendo `*.yaml`/`*.yml`.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Caminho do relatório JSON. Sem ele, o resumo sai no console.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Arquivo YAML de configuração (chaves pontilhadas, com
        /// projeção de variáveis de ambiente por cima).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Habilita exportação de traces OpenTelemetry.
        #[arg(long, default_value = "false")]
        otel: bool,

        /// Endpoint do coletor OTLP. Padrão: OTEL_EXPORTER_OTLP_ENDPOINT
        /// ou http://localhost:4317.
        #[arg(long)]
        otel_endpoint: Option<String>,

        /// Modo silencioso: apenas erros no stderr. Ideal para CI.
        #[arg(long, short = 's', default_value = "false")]
        silent: bool,

        /// Modo verbose: logs de debug (resolução de placeholders,
        /// dispatch, etc.).
        #[arg(long, short = 'v', default_value = "false")]
        verbose: bool,

        /// Identificador desta execução no relatório. Padrão: UUID v4.
        #[arg(long)]
        execution_id: Option<String>,
    },

    /// Valida documentos sem executar nenhum step.
    Validate {
        /// Arquivos de caso de teste ou diretórios contendo `*.yaml`/`*.yml`.
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

// ============================================================================
// FUNÇÃO PRINCIPAL
// ============================================================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            paths,
            output,
            config,
            otel,
            otel_endpoint,
            silent,
            verbose,
            execution_id,
        } => {
            let exec_id = execution_id.unwrap_or_else(|| Uuid::new_v4().to_string());

            let mut telemetry_config = TelemetryConfig::from_env();
            telemetry_config.log_level = if silent {
                Level::ERROR
            } else if verbose {
                Level::DEBUG
            } else {
                Level::INFO
            };
            if otel {
                if let Some(endpoint) = otel_endpoint {
                    telemetry_config.otlp_endpoint = Some(endpoint);
                } else if telemetry_config.otlp_endpoint.is_none() {
                    telemetry_config.otlp_endpoint = Some("http://localhost:4317".to_string());
                }
            }

            if let Err(e) = init_telemetry(telemetry_config) {
                if !silent {
                    eprintln!("Warning: falha ao inicializar a telemetria: {}", e);
                }
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                    .try_init();
            }

            let all_passed = run_test_cases(&paths, output.as_deref(), config.as_deref(), &exec_id).await;

            shutdown_telemetry();

            if !all_passed {
                std::process::exit(1);
            }
        }

        Commands::Validate { paths } => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init();
            if !validate_documents(&paths) {
                std::process::exit(1);
            }
        }
    }
}

// ============================================================================
// EXECUÇÃO
// ============================================================================

/// Carrega e executa cada caso de teste encontrado nos caminhos.
///
/// Retorna true somente se **todo** caso terminou com veredito de
/// sucesso. Qualquer erro de carga, validação ou reporter derruba o
/// resultado.
async fn run_test_cases(
    paths: &[PathBuf],
    output: Option<&Path>,
    config_path: Option<&Path>,
    execution_id: &str,
) -> bool {
    let documents = match discover_documents(paths) {
        Ok(docs) => docs,
        Err(e) => {
            error!(error = %e, "falha ao descobrir documentos");
            return false;
        }
    };
    if documents.is_empty() {
        error!("nenhum documento de caso de teste encontrado");
        return false;
    }

    let config = match config_path {
        Some(path) => match Config::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                error!(error = %e, "falha ao carregar a configuração");
                return false;
            }
        },
        None => Config::empty(),
    };

    // registry montado uma única vez; somente leitura durante as execuções
    let registry = Arc::new(actions::builtin_registry(&config));

    let reporter: Arc<dyn Reporter> = match output {
        Some(path) => Arc::new(JsonFileReporter::new(path, execution_id)),
        None => Arc::new(ConsoleReporter::new()),
    };

    let scheduler =
        Scheduler::new(registry, Arc::clone(&reporter)).with_limits(ExecutionLimits::from_env());

    info!(execution_id = %execution_id, documents = documents.len(), "execução iniciada");

    let mut all_passed = true;
    for document in &documents {
        let test_case = match loader::load_test_case(document) {
            Ok(case) => case,
            Err(e) => {
                error!(document = ?document, error = %e, "falha ao carregar o caso de teste");
                all_passed = false;
                continue;
            }
        };

        let context = Arc::new(Mutex::new(ExecutionContext::new(None, &test_case.name)));
        match scheduler.execute_test_case(&test_case, context).await {
            Ok(verdict) => {
                all_passed &= verdict;
            }
            Err(e) => {
                error!(document = ?document, error = %e, "execução interrompida");
                all_passed = false;
            }
        }
    }

    if let Err(e) = reporter.generate_report().await {
        error!(error = %e, "falha ao gerar o relatório");
        all_passed = false;
    }

    all_passed
}

/// Valida cada documento e loga o resultado, sem executar steps.
fn validate_documents(paths: &[PathBuf]) -> bool {
    let documents = match discover_documents(paths) {
        Ok(docs) => docs,
        Err(e) => {
            error!(error = %e, "falha ao descobrir documentos");
            return false;
        }
    };
    if documents.is_empty() {
        error!("nenhum documento de caso de teste encontrado");
        return false;
    }

    let mut all_valid = true;
    for document in &documents {
        let case = match loader::load_test_case(document) {
            Ok(case) => case,
            Err(e) => {
                error!(document = ?document, error = %e, "❌ documento ilegível");
                all_valid = false;
                continue;
            }
        };
        match validation::validate_test_case(&case) {
            Ok(()) => info!(document = ?document, "✅ documento válido"),
            Err(e) => {
                let code = e.code();
                error!(
                    document = ?document,
                    code = %code,
                    category = %code.category(),
                    error = %e,
                    "❌ documento inválido"
                );
                all_valid = false;
            }
        }
    }
    all_valid
}

// ============================================================================
// DESCOBERTA DE DOCUMENTOS
// ============================================================================

/// Expande os caminhos da CLI em uma lista de arquivos YAML.
///
/// Diretórios contribuem seus `*.yaml`/`*.yml` diretos, em ordem
/// alfabética; arquivos entram como estão.
fn discover_documents(paths: &[PathBuf]) -> anyhow::Result<Vec<PathBuf>> {
    let mut documents = Vec::new();

    for path in paths {
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|p| {
                    p.is_file()
                        && matches!(
                            p.extension().and_then(|e| e.to_str()),
                            Some("yaml") | Some("yml")
                        )
                })
                .collect();
            entries.sort();
            documents.extend(entries);
        } else {
            documents.push(path.clone());
        }
    }

    Ok(documents)
}
