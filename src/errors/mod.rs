//! # Módulo de Códigos de Erro Estruturados
//!
//! Define códigos padronizados para integração com sistemas externos
//! (CI/CD, dashboards, alertas) e para facilitar a busca na documentação.
//!
//! ## Categorias de Erro
//!
//! | Faixa  | Categoria     | Descrição                                |
//! |--------|---------------|------------------------------------------|
//! | E1xxx  | Validação     | Caso de teste malformado                 |
//! | E2xxx  | Dispatch      | Problema ao despachar/executar uma ação  |
//! | E3xxx  | Assertion     | Comparação esperado vs. obtido falhou    |
//! | E4xxx  | Configuração  | Problema de setup/ambiente               |
//!
//! Os códigos aparecem nos outputs de diagnóstico dos steps e nas
//! mensagens dos registros de assertion, no formato `E<4 dígitos>`.

use std::fmt;

// ============================================================================
// CÓDIGO DE ERRO
// ============================================================================

/// Código de erro com categoria embutida no primeiro dígito.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode(u16);

impl ErrorCode {
    // ------------------------------------------------------------------
    // E1xxx: validação do caso de teste (antes de qualquer execução)
    // ------------------------------------------------------------------

    /// Ids de step duplicados no caso de teste.
    pub const DUPLICATE_STEP_ID: Self = Self(1001);

    /// `depends_on` referencia um step inexistente.
    pub const UNKNOWN_DEPENDENCY: Self = Self(1002);

    /// `depends_on` referencia um step declarado depois.
    pub const FORWARD_DEPENDENCY: Self = Self(1003);

    /// Guard `if` fora do conjunto permitido.
    pub const INVALID_CONDITION: Self = Self(1004);

    /// Documento com discriminador ou estrutura inválida.
    pub const INVALID_DOCUMENT: Self = Self(1005);

    // ------------------------------------------------------------------
    // E2xxx: dispatch e execução de ações
    // ------------------------------------------------------------------

    /// Nenhuma ação registrada para a kind do step.
    pub const UNKNOWN_ACTION_KIND: Self = Self(2001);

    /// A ação levantou um erro (embrulhado como falha do step).
    pub const ACTION_RAISED: Self = Self(2002);

    /// Step não despachado porque uma dependência falhou.
    pub const DEPENDENCY_FAILED: Self = Self(2003);

    // ------------------------------------------------------------------
    // E3xxx: assertions
    // ------------------------------------------------------------------

    /// Valor obtido diverge do esperado.
    pub const ASSERTION_MISMATCH: Self = Self(3001);

    /// Esperado um mapa, obtido outra coisa.
    pub const ASSERTION_NOT_MAPPING: Self = Self(3002);

    /// Esperada uma sequência, obtido outra coisa.
    pub const ASSERTION_NOT_SEQUENCE: Self = Self(3003);

    /// Campo esperado ausente no valor obtido.
    pub const ASSERTION_FIELD_MISSING: Self = Self(3004);

    /// Token reservado (shouldBeNull etc.) não satisfeito.
    pub const ASSERTION_TOKEN: Self = Self(3005);

    // ------------------------------------------------------------------
    // E4xxx: configuração e ambiente
    // ------------------------------------------------------------------

    /// Documento de caso de teste não encontrado ou ilegível.
    pub const DOCUMENT_NOT_FOUND: Self = Self(4001);

    /// Retorna o código formatado com prefixo "E" (ex: "E3001").
    pub fn formatted(&self) -> String {
        format!("E{:04}", self.0)
    }

    /// Categoria derivada do primeiro dígito.
    pub fn category(&self) -> ErrorCategory {
        match self.0 / 1000 {
            1 => ErrorCategory::Validation,
            2 => ErrorCategory::Dispatch,
            3 => ErrorCategory::Assertion,
            4 => ErrorCategory::Configuration,
            _ => ErrorCategory::Unknown,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.formatted())
    }
}

// ============================================================================
// CATEGORIA DE ERRO
// ============================================================================

/// Agrupamento de códigos para relatórios e dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// E1xxx: o caso de teste está malformado.
    Validation,

    /// E2xxx: problema ao despachar ou executar uma ação.
    Dispatch,

    /// E3xxx: assertion não passou.
    Assertion,

    /// E4xxx: problema de setup/ambiente.
    Configuration,

    /// Fora das faixas conhecidas.
    Unknown,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "Validação"),
            Self::Dispatch => write!(f, "Dispatch"),
            Self::Assertion => write!(f, "Assertion"),
            Self::Configuration => write!(f, "Configuração"),
            Self::Unknown => write!(f, "Desconhecido"),
        }
    }
}
