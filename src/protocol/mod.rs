//! # Módulo de Protocolo - Estruturas de Dados do Caso de Teste
//!
//! Este módulo define todas as **estruturas de dados** que representam
//! um caso de teste declarativo e os resultados da sua execução.
//!
//! ## O que é um caso de teste?
//!
//! É um documento (YAML) com uma sequência ordenada de steps. Cada step
//! nomeia uma ação (`kind`) e os parâmetros dela, e pode declarar:
//! - **Dependências** (`depends_on`): steps que precisam terminar antes
//! - **Guard condicional** (`if`): quando o step deve executar
//!
//! ## Estrutura de um documento:
//!
//! ```yaml
//! kind: TestCase
//! version: "1"
//! name: Login flow
//! step:
//!   - name: cria usuario
//!     kind: http
//!     params:
//!       method: POST
//!       url: "http://localhost:8080/users"
//!   - id: verifica
//!     name: confere resposta
//!     kind: assert
//!     if: success()
//!     params:
//!       actual: "[#1.output.status]"
//!       expected: 201
//! ```
//!
//! ## Hierarquia de Tipos:
//!
//! ```text
//! TestCase
//! └── Step[]  (sequência ordenada; a ordem importa para depends_on)
//!     ├── Condition  (guard: always/success/failure)
//!     └── params     (estrutura livre, com placeholders {expr})
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::ErrorCode;

// ============================================================================
// CASO DE TESTE
// ============================================================================

/// Discriminador obrigatório no topo do documento.
pub const TEST_CASE_KIND: &str = "TestCase";

/// Representa um caso de teste completo, imutável após o carregamento.
///
/// ## Campos:
/// - `kind`: discriminador do documento; deve ser `"TestCase"`
/// - `version`: versão do formato (string opaca, não interpretada)
/// - `name`: nome legível do caso
/// - `steps`: sequência ordenada de steps (campo `step` no documento)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TestCase {
    /// Discriminador do documento. O loader rejeita qualquer outro valor.
    pub kind: String,

    /// Versão do formato. Mantida apenas para rastreabilidade.
    pub version: String,

    /// Nome legível do caso de teste.
    ///
    /// Ex: "Login Flow", "User CRUD Operations"
    pub name: String,

    /// Sequência ordenada de steps.
    ///
    /// A posição de cada step é significativa: `depends_on` só pode
    /// referenciar steps declarados antes.
    #[serde(rename = "step")]
    pub steps: Vec<Step>,
}

impl TestCase {
    /// Atribui `#<indice-1-based>` a todo step sem id explícito.
    ///
    /// Chamado pelo loader logo após o parse do documento, antes de
    /// qualquer validação.
    pub fn assign_missing_ids(&mut self) {
        for (index, step) in self.steps.iter_mut().enumerate() {
            if step.id.trim().is_empty() {
                step.id = format!("#{}", index + 1);
            }
        }
    }

    /// Indica se algum step declara dependências.
    ///
    /// Decide o modo de execução do scheduler: sem dependências o caso
    /// roda em modo sequencial, com dependências roda no modo DAG.
    pub fn declares_dependencies(&self) -> bool {
        self.steps.iter().any(|s| !s.depends_on.is_empty())
    }
}

// ============================================================================
// STEP
// ============================================================================

/// Um passo de execução dentro de um caso de teste.
///
/// Cada step é uma **operação atômica**: o scheduler resolve os
/// placeholders dos `params`, consulta o registry pela `kind` e invoca
/// a ação correspondente.
///
/// ## Campos obrigatórios no documento:
/// - `name`: nome legível
/// - `kind`: chave da ação no registry ("echo", "http", "assert", ...)
///
/// ## Campos opcionais:
/// - `id`: identificador único; se ausente, o loader atribui `#<indice>`
/// - `params`: parâmetros da ação (estrutura livre)
/// - `if`: guard condicional (`always()`, `success()`, `failure()`)
/// - `depends_on`: ids de steps anteriores que precisam terminar antes
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Step {
    /// Identificador único dentro do caso de teste.
    ///
    /// Usado em `depends_on`, nos placeholders (`{meu_step.output}`)
    /// e nos relatórios.
    #[serde(default)]
    pub id: String,

    /// Nome legível do step. Aparece nos logs e relatórios.
    pub name: String,

    /// Chave da ação no registry.
    ///
    /// Precisa resolver no momento do dispatch; uma kind desconhecida
    /// falha o step (mas não interrompe o scheduler).
    pub kind: String,

    /// Parâmetros da ação: escalares, sequências e mapas aninhados
    /// livremente. Placeholders `{expr}` podem aparecer em qualquer
    /// string e são resolvidos imediatamente antes do dispatch.
    #[serde(default)]
    pub params: Value,

    /// Guard condicional. Ausente equivale a `success()`.
    #[serde(rename = "if", default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,

    /// Ids de steps que precisam alcançar estado terminal antes deste
    /// começar. Cada id referenciado deve aparecer antes na sequência.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

// ============================================================================
// GUARD CONDICIONAL
// ============================================================================

/// As três políticas de dispatch de um step.
///
/// O guard é avaliado contra o flag `testSuccess` do contexto no
/// momento em que chega a vez do step:
///
/// | Guard       | Executa quando                        |
/// |-------------|---------------------------------------|
/// | `always()`  | sempre                                |
/// | `success()` | nenhum step anterior falhou (padrão)  |
/// | `failure()` | algum step anterior falhou            |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Always,
    Success,
    Failure,
}

impl Condition {
    /// Interpreta o texto do guard, tolerando maiúsculas e espaços.
    ///
    /// Retorna `None` para qualquer valor fora do conjunto permitido;
    /// a validação rejeita o caso de teste nessa situação.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "always()" => Some(Self::Always),
            "success()" => Some(Self::Success),
            "failure()" => Some(Self::Failure),
            _ => None,
        }
    }

    /// Decide se o step executa dado o estado corrente do caso.
    pub fn should_run(&self, test_success: bool) -> bool {
        match self {
            Self::Always => true,
            Self::Success => test_success,
            Self::Failure => !test_success,
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Always => write!(f, "always()"),
            Self::Success => write!(f, "success()"),
            Self::Failure => write!(f, "failure()"),
        }
    }
}

// ============================================================================
// RESULTADO DE AÇÃO
// ============================================================================

/// Resultado da execução de uma ação.
///
/// Contrato uniforme entre o engine e qualquer ação: um flag de
/// sucesso e um output de forma livre (por convenção um mapa, mas
/// qualquer valor JSON é aceito).
///
/// Resultados ficam no contexto (`stepResults`) até o fim do caso,
/// para que steps posteriores os referenciem via placeholder.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ActionResult {
    /// Se a ação considera que o step passou.
    pub success: bool,

    /// Saída da ação, de forma livre.
    #[serde(default)]
    pub output: Value,
}

impl ActionResult {
    /// Resultado de sucesso com o output fornecido.
    pub fn ok(output: Value) -> Self {
        Self {
            success: true,
            output,
        }
    }

    /// Resultado de falha com o output fornecido.
    pub fn fail(output: Value) -> Self {
        Self {
            success: false,
            output,
        }
    }

    /// Embrulha um erro levantado por uma ação.
    ///
    /// O scheduler trata erro levantado como equivalente a uma falha
    /// retornada, preservando mensagem e cadeia de causas.
    pub fn from_error(err: &anyhow::Error) -> Self {
        Self {
            success: false,
            output: json!({
                "error": err.to_string(),
                "stack": format!("{:?}", err),
                "code": ErrorCode::ACTION_RAISED.formatted(),
            }),
        }
    }

    /// Falha sintética para um step cuja dependência falhou.
    ///
    /// O step nunca chega a ser despachado; este resultado é gravado
    /// no lugar do que a ação teria produzido.
    pub fn dependency_failed(dep: &str) -> Self {
        Self {
            success: false,
            output: json!({
                "error": format!("Dependency '{}' failed", dep),
                "code": ErrorCode::DEPENDENCY_FAILED.formatted(),
            }),
        }
    }

    /// Resultado sintético de um step pulado pelo guard condicional.
    ///
    /// Conta como sucesso no veredito agregado.
    pub fn skipped() -> Self {
        Self {
            success: true,
            output: Value::String("SKIPPED".to_string()),
        }
    }
}

// ============================================================================
// ESTADO DE STEP
// ============================================================================

/// Estados possíveis de um step durante a execução.
///
/// A progressão é sempre `Pending → Running → {Finished, Failed,
/// Skipped}`; nunca regride, e todo step alcança exatamente um estado
/// terminal antes do engine retornar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    /// Aguardando a vez (ou as dependências).
    Pending,

    /// Em execução (ou tendo o guard/resolução avaliados).
    Running,

    /// Terminou com `success = true`.
    Finished,

    /// Terminou com `success = false` (inclui falha de dependência
    /// e erro levantado pela ação).
    Failed,

    /// Excluído pelo guard condicional; conta como sucesso.
    Skipped,
}

impl StepState {
    /// Estados que liberam os dependentes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Skipped)
    }
}

// ============================================================================
// TESTES
// ============================================================================
