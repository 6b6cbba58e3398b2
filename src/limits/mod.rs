//! # Módulo de Limites de Execução
//!
//! O modo DAG despacha todos os steps prontos de uma vez; este módulo
//! define o teto de steps em voo simultâneo. O limite preserva a
//! equidade: todo step pronto eventualmente executa, apenas espera uma
//! vaga no pool.
//!
//! | Limite       | Padrão | Variável de ambiente      |
//! |--------------|--------|---------------------------|
//! | max_parallel | 10     | CASERUNNER_MAX_PARALLEL   |

use serde::{Deserialize, Serialize};

/// Número máximo de steps executando em paralelo no modo DAG.
pub const DEFAULT_MAX_PARALLEL: usize = 10;

/// Limites aplicados a uma execução.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLimits {
    /// Teto de steps simultâneos. Zero significa "sem teto efetivo"
    /// (o scheduler usa o número de steps do caso).
    pub max_parallel: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }
}

impl ExecutionLimits {
    /// Carrega limites das variáveis de ambiente, caindo nos padrões
    /// quando ausentes ou inválidas.
    pub fn from_env() -> Self {
        let mut limits = Self::default();
        if let Ok(raw) = std::env::var("CASERUNNER_MAX_PARALLEL") {
            if let Ok(value) = raw.parse::<usize>() {
                limits.max_parallel = value;
            }
        }
        limits
    }
}
