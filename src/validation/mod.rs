//! # Módulo de Validação do Caso de Teste
//!
//! Valida um caso de teste **antes** de qualquer step executar. A
//! validação é *fail-fast*: a primeira violação interrompe tudo, nenhum
//! step roda e nenhum evento chega ao reporter.
//!
//! ## Verificações, nesta ordem:
//!
//! 1. **Ids únicos**: nenhum id de step se repete (o erro nomeia todos
//!    os duplicados).
//! 2. **Dependências existem**: todo id em `depends_on` nomeia algum
//!    step do caso.
//! 3. **Ordem das dependências**: uma dependência precisa apontar para
//!    um step declarado **antes**. Essa regra é mais forte que
//!    aciclicidade, então nenhum detector de ciclos é necessário.
//! 4. **Sintaxe do guard**: `if`, depois de trim e case-fold, precisa
//!    ser `always()`, `success()` ou `failure()`.
//!
//! Passar por aqui é pré-condição para o scheduler executar o caso.

use std::collections::HashMap;

use thiserror::Error;

use crate::errors::ErrorCode;
use crate::protocol::{Condition, TestCase};

// ============================================================================
// TIPOS DE ERRO
// ============================================================================

/// Erros de validação de um caso de teste.
///
/// Cada variante carrega contexto suficiente para o autor do documento
/// corrigir o problema sem abrir o runner.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Dois ou mais steps compartilham o mesmo id.
    #[error("ids de step duplicados: {}", ids.join(", "))]
    DuplicateStepIds { ids: Vec<String> },

    /// `depends_on` referencia um step que não existe no caso.
    #[error("step '{step_id}': dependência '{dependency}' não existe no caso de teste")]
    UnknownDependency { step_id: String, dependency: String },

    /// `depends_on` referencia um step declarado depois deste.
    #[error("step '{step_id}': dependência '{dependency}' precisa ser declarada antes do step que a referencia")]
    ForwardDependency { step_id: String, dependency: String },

    /// Guard fora do conjunto `always()` / `success()` / `failure()`.
    #[error("step '{step_id}': condição '{condition}' inválida (use always(), success() ou failure())")]
    InvalidCondition { step_id: String, condition: String },
}

impl ValidationError {
    /// Código estruturado correspondente, para logs e integrações.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::DuplicateStepIds { .. } => ErrorCode::DUPLICATE_STEP_ID,
            Self::UnknownDependency { .. } => ErrorCode::UNKNOWN_DEPENDENCY,
            Self::ForwardDependency { .. } => ErrorCode::FORWARD_DEPENDENCY,
            Self::InvalidCondition { .. } => ErrorCode::INVALID_CONDITION,
        }
    }
}

// ============================================================================
// VALIDAÇÃO
// ============================================================================

/// Valida o caso de teste completo, parando na primeira violação.
pub fn validate_test_case(test_case: &TestCase) -> Result<(), ValidationError> {
    check_unique_ids(test_case)?;
    check_dependencies_exist(test_case)?;
    check_dependency_ordering(test_case)?;
    check_conditions(test_case)?;
    Ok(())
}

/// 1. Ids únicos. O erro lista todos os ids duplicados, na ordem em que
/// aparecem, para o autor corrigir de uma vez.
fn check_unique_ids(test_case: &TestCase) -> Result<(), ValidationError> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for step in &test_case.steps {
        *seen.entry(step.id.as_str()).or_default() += 1;
    }

    let mut duplicated = Vec::new();
    for step in &test_case.steps {
        if seen.get(step.id.as_str()).is_some_and(|count| *count > 1)
            && !duplicated.contains(&step.id)
        {
            duplicated.push(step.id.clone());
        }
    }

    if duplicated.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::DuplicateStepIds { ids: duplicated })
    }
}

/// 2. Toda dependência nomeia algum step do caso.
fn check_dependencies_exist(test_case: &TestCase) -> Result<(), ValidationError> {
    for step in &test_case.steps {
        for dependency in &step.depends_on {
            if !test_case.steps.iter().any(|s| &s.id == dependency) {
                return Err(ValidationError::UnknownDependency {
                    step_id: step.id.clone(),
                    dependency: dependency.clone(),
                });
            }
        }
    }
    Ok(())
}

/// 3. Dependências apontam apenas para trás na sequência declarada.
fn check_dependency_ordering(test_case: &TestCase) -> Result<(), ValidationError> {
    let position: HashMap<&str, usize> = test_case
        .steps
        .iter()
        .enumerate()
        .map(|(index, step)| (step.id.as_str(), index))
        .collect();

    for (index, step) in test_case.steps.iter().enumerate() {
        for dependency in &step.depends_on {
            // a existência já foi garantida no passo anterior
            if let Some(dep_index) = position.get(dependency.as_str()) {
                if *dep_index >= index {
                    return Err(ValidationError::ForwardDependency {
                        step_id: step.id.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// 4. Guards pertencem ao conjunto permitido.
fn check_conditions(test_case: &TestCase) -> Result<(), ValidationError> {
    for step in &test_case.steps {
        if let Some(raw) = &step.condition {
            if Condition::parse(raw).is_none() {
                return Err(ValidationError::InvalidCondition {
                    step_id: step.id.clone(),
                    condition: raw.clone(),
                });
            }
        }
    }
    Ok(())
}

// ============================================================================
// TESTES
// ============================================================================
