//! # Módulo de Assertions - Comparação de Forma Esperada vs. Obtida
//!
//! Compara uma **forma esperada** declarativa com um **valor obtido**,
//! produzindo um registro por campo verificado. O avaliador percorre a
//! forma esperada recursivamente e reporta **todas** as divergências,
//! não apenas a primeira.
//!
//! ## Regras de comparação:
//!
//! - **Escalar esperado**: resolve placeholders `{expr}` e a forma curta
//!   `"[var]"` (que produz o valor tipado da variável), depois compara
//!   por igualdade estrita.
//! - **Mapa esperado**: cada chave esperada é comparada recursivamente;
//!   chaves presentes apenas no valor obtido são ignoradas.
//! - **Sequência esperada**: comparação posicional, exceto quando a
//!   sequência tem exatamente um elemento reservado:
//!
//! | Token               | Passa quando o obtido é                    |
//! |---------------------|--------------------------------------------|
//! | `shouldNotBeNull`   | presente e não nulo                        |
//! | `shouldBeNull`      | nulo ou ausente                            |
//! | `shouldBeEmpty`     | string vazia ou sequência vazia            |
//! | `shouldNotBeEmpty`  | string não vazia ou sequência não vazia    |
//!
//! ## Exemplo:
//!
//! ```yaml
//! expected:
//!   status: 201
//!   body:
//!     id: ["shouldNotBeNull"]
//!     name: "[cria.output.body.name]"
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::errors::ErrorCode;
use crate::resolver;

// ============================================================================
// REGISTRO DE ASSERTION
// ============================================================================

/// Resultado da verificação de um campo.
///
/// `field` é o caminho pontilhado a partir da raiz da forma esperada
/// (`""` na raiz, `body.id`, `items[2]`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionResult {
    /// Caminho do campo verificado.
    pub field: String,

    /// Valor esperado, já com variáveis resolvidas.
    pub expected: Value,

    /// Valor obtido (null quando o campo está ausente).
    pub actual: Value,

    /// Se a verificação passou.
    pub passed: bool,

    /// Diagnóstico em caso de falha, com o código estruturado.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Um conjunto de assertions passa somente se todos os registros passaram.
pub fn all_passed(results: &[AssertionResult]) -> bool {
    results.iter().all(|r| r.passed)
}

// ============================================================================
// AVALIAÇÃO
// ============================================================================

/// Avalia a forma esperada contra o valor obtido.
///
/// `actual = None` representa um valor ausente, que é distinto de nulo
/// para os tokens reservados.
pub fn evaluate(
    expected: &Value,
    actual: Option<&Value>,
    context: &ExecutionContext,
) -> Vec<AssertionResult> {
    let mut results = Vec::new();
    compare("", expected, actual, context, &mut results);
    results
}

fn compare(
    path: &str,
    expected: &Value,
    actual: Option<&Value>,
    context: &ExecutionContext,
    out: &mut Vec<AssertionResult>,
) {
    match expected {
        Value::Object(expected_map) => match actual {
            Some(Value::Object(actual_map)) => {
                for (key, child_expected) in expected_map {
                    let child_path = if path.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", path, key)
                    };
                    compare(&child_path, child_expected, actual_map.get(key), context, out);
                }
            }
            _ => out.push(failure(
                path,
                expected.clone(),
                actual,
                format!("[{}] esperado um mapa", ErrorCode::ASSERTION_NOT_MAPPING),
            )),
        },

        Value::Array(expected_items) => {
            // sequência de um único token reservado vira uma verificação
            // de presença/vazio sobre o valor obtido
            if expected_items.len() == 1 {
                if let Some(token) = expected_items[0].as_str() {
                    if let Some(result) = eval_reserved_token(path, token, actual) {
                        out.push(result);
                        return;
                    }
                }
            }

            match actual {
                Some(Value::Array(actual_items)) => {
                    let len = expected_items.len().max(actual_items.len());
                    for i in 0..len {
                        let child_path = format!("{}[{}]", path, i);
                        match expected_items.get(i) {
                            Some(child_expected) => compare(
                                &child_path,
                                child_expected,
                                actual_items.get(i),
                                context,
                                out,
                            ),
                            // obtido mais longo que o esperado: cada elemento
                            // excedente é comparado contra "ausente"
                            None => out.push(failure(
                                &child_path,
                                Value::Null,
                                actual_items.get(i),
                                format!(
                                    "[{}] elemento inesperado na posição {}",
                                    ErrorCode::ASSERTION_MISMATCH,
                                    i
                                ),
                            )),
                        }
                    }
                }
                _ => out.push(failure(
                    path,
                    expected.clone(),
                    actual,
                    format!("[{}] esperada uma sequência", ErrorCode::ASSERTION_NOT_SEQUENCE),
                )),
            }
        }

        primitive => {
            let resolved = resolve_expected(primitive, context);
            match actual {
                None => out.push(failure(
                    path,
                    resolved,
                    None,
                    format!("[{}] campo ausente", ErrorCode::ASSERTION_FIELD_MISSING),
                )),
                Some(actual_value) => {
                    let passed = *actual_value == resolved;
                    let message = (!passed).then(|| {
                        format!(
                            "[{}] esperado {}, obtido {}",
                            ErrorCode::ASSERTION_MISMATCH,
                            resolved,
                            actual_value
                        )
                    });
                    out.push(AssertionResult {
                        field: path.to_string(),
                        expected: resolved,
                        actual: actual_value.clone(),
                        passed,
                        message,
                    });
                }
            }
        }
    }
}

// ============================================================================
// RESOLUÇÃO DO ESPERADO
// ============================================================================

/// Resolve variáveis num valor esperado escalar.
///
/// A forma curta `"[caminho]"` produz o valor **tipado** da variável
/// (mesmo caminho que o resolver usaria para `{caminho}`); qualquer
/// outra string passa pela substituição normal de placeholders. Se o
/// caminho da forma curta não resolver, a string fica como está.
fn resolve_expected(expected: &Value, context: &ExecutionContext) -> Value {
    if let Value::String(s) = expected {
        if s.len() >= 2 && s.starts_with('[') && s.ends_with(']') {
            if let Some(value) = resolver::lookup_path(&s[1..s.len() - 1], context) {
                return value;
            }
        }
        return Value::String(resolver::resolve_str(s, context));
    }
    expected.clone()
}

// ============================================================================
// TOKENS RESERVADOS
// ============================================================================

fn eval_reserved_token(
    path: &str,
    token: &str,
    actual: Option<&Value>,
) -> Option<AssertionResult> {
    let passed = match token {
        "shouldNotBeNull" => matches!(actual, Some(v) if !v.is_null()),
        "shouldBeNull" => actual.map_or(true, Value::is_null),
        "shouldBeEmpty" => match actual {
            Some(Value::String(s)) => s.is_empty(),
            Some(Value::Array(items)) => items.is_empty(),
            _ => false,
        },
        "shouldNotBeEmpty" => match actual {
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            _ => false,
        },
        _ => return None,
    };

    let message = (!passed).then(|| {
        format!("[{}] {} não satisfeito", ErrorCode::ASSERTION_TOKEN, token)
    });

    Some(AssertionResult {
        field: path.to_string(),
        expected: Value::String(token.to_string()),
        actual: actual.cloned().unwrap_or(Value::Null),
        passed,
        message,
    })
}

fn failure(
    path: &str,
    expected: Value,
    actual: Option<&Value>,
    message: String,
) -> AssertionResult {
    AssertionResult {
        field: path.to_string(),
        expected,
        actual: actual.cloned().unwrap_or(Value::Null),
        passed: false,
        message: Some(message),
    }
}

// ============================================================================
// TESTES
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ActionResult;
    use serde_json::json;

    fn ctx() -> ExecutionContext {
        let mut ctx = ExecutionContext::new(Some("case-1".to_string()), "caso");
        ctx.record("s", ActionResult::ok(json!({"x": 42, "nome": "ana"})));
        ctx
    }

    #[test]
    fn test_primitive_equality() {
        let results = evaluate(&json!(200), Some(&json!(200)), &ctx());
        assert_eq!(results.len(), 1);
        assert!(results[0].passed);
        assert_eq!(results[0].field, "");
    }

    #[test]
    fn test_primitive_mismatch_carries_code() {
        let results = evaluate(&json!(200), Some(&json!(404)), &ctx());
        assert!(!results[0].passed);
        assert!(results[0].message.as_ref().unwrap().contains("E3001"));
    }

    #[test]
    fn test_mapping_ignores_extra_actual_keys() {
        let expected = json!({"a": 1});
        let actual = json!({"a": 1, "b": 2, "c": 3});
        let results = evaluate(&expected, Some(&actual), &ctx());
        assert_eq!(results.len(), 1);
        assert!(all_passed(&results));
    }

    #[test]
    fn test_mapping_reports_every_divergence() {
        let expected = json!({"a": 1, "b": 2, "c": 3});
        let actual = json!({"a": 1, "b": 99});
        let results = evaluate(&expected, Some(&actual), &ctx());

        assert_eq!(results.len(), 3);
        let by_field = |f: &str| results.iter().find(|r| r.field == f).unwrap();
        assert!(by_field("a").passed);
        assert!(!by_field("b").passed);
        assert!(!by_field("c").passed); // ausente
        assert!(by_field("c").message.as_ref().unwrap().contains("E3004"));
    }

    #[test]
    fn test_mapping_against_non_mapping_fails_at_path() {
        let expected = json!({"a": {"b": 1}});
        let actual = json!({"a": "nao sou mapa"});
        let results = evaluate(&expected, Some(&actual), &ctx());

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].field, "a");
        assert!(results[0].message.as_ref().unwrap().contains("E3002"));
    }

    #[test]
    fn test_should_not_be_null() {
        let expected = json!(["shouldNotBeNull"]);
        assert!(all_passed(&evaluate(&expected, Some(&json!(0)), &ctx())));
        assert!(all_passed(&evaluate(&expected, Some(&json!("")), &ctx())));
        assert!(!all_passed(&evaluate(&expected, Some(&json!(null)), &ctx())));
        assert!(!all_passed(&evaluate(&expected, None, &ctx())));
    }

    #[test]
    fn test_should_be_null_accepts_absent() {
        let expected = json!(["shouldBeNull"]);
        assert!(all_passed(&evaluate(&expected, Some(&json!(null)), &ctx())));
        assert!(all_passed(&evaluate(&expected, None, &ctx())));
        assert!(!all_passed(&evaluate(&expected, Some(&json!(1)), &ctx())));
    }

    #[test]
    fn test_empty_tokens() {
        assert!(all_passed(&evaluate(
            &json!(["shouldBeEmpty"]),
            Some(&json!("")),
            &ctx()
        )));
        assert!(all_passed(&evaluate(
            &json!(["shouldBeEmpty"]),
            Some(&json!([])),
            &ctx()
        )));
        assert!(!all_passed(&evaluate(
            &json!(["shouldBeEmpty"]),
            Some(&json!("x")),
            &ctx()
        )));
        assert!(all_passed(&evaluate(
            &json!(["shouldNotBeEmpty"]),
            Some(&json!([1])),
            &ctx()
        )));
        // número não é string nem sequência
        assert!(!all_passed(&evaluate(
            &json!(["shouldNotBeEmpty"]),
            Some(&json!(5)),
            &ctx()
        )));
    }

    #[test]
    fn test_positional_sequence_comparison() {
        let expected = json!([1, 2, 3]);
        let actual = json!([1, 9]);
        let results = evaluate(&expected, Some(&actual), &ctx());

        assert_eq!(results.len(), 3);
        assert!(results[0].passed); // [0]
        assert!(!results[1].passed); // [1]: 2 vs 9
        assert!(!results[2].passed); // [2]: ausente
        assert_eq!(results[2].field, "[2]");
    }

    #[test]
    fn test_longer_actual_sequence_fails_per_extra_element() {
        let expected = json!([1]);
        let actual = json!([1, 2, 3]);
        let results = evaluate(&expected, Some(&actual), &ctx());

        assert_eq!(results.len(), 3);
        assert!(results[0].passed);
        assert!(!results[1].passed);
        assert!(!results[2].passed);
    }

    #[test]
    fn test_sequence_against_non_sequence() {
        let results = evaluate(&json!([1, 2]), Some(&json!("texto")), &ctx());
        assert_eq!(results.len(), 1);
        assert!(results[0].message.as_ref().unwrap().contains("E3003"));
    }

    #[test]
    fn test_variable_short_form_resolves_typed_value() {
        // "[s.output.x]" deve produzir o mesmo valor que o resolver
        // produziria para {s.output.x}, mas tipado
        let context = ctx();
        let expected = json!("[s.output.x]");
        let results = evaluate(&expected, Some(&json!(42)), &context);
        assert!(all_passed(&results));
        assert_eq!(results[0].expected, json!(42));
    }

    #[test]
    fn test_placeholder_in_expected_string() {
        let context = ctx();
        let expected = json!("nome: {s.output.nome}");
        let results = evaluate(&expected, Some(&json!("nome: ana")), &context);
        assert!(all_passed(&results));
    }

    #[test]
    fn test_unresolvable_short_form_stays_literal() {
        let context = ctx();
        let expected = json!("[nao.existe]");
        let results = evaluate(&expected, Some(&json!("[nao.existe]")), &context);
        assert!(all_passed(&results));
    }

    #[test]
    fn test_nested_paths_in_records() {
        let expected = json!({"body": {"user": {"id": ["shouldNotBeNull"]}}});
        let actual = json!({"body": {"user": {"id": null}}});
        let results = evaluate(&expected, Some(&actual), &ctx());

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].field, "body.user.id");
        assert!(!results[0].passed);
        assert!(results[0].message.as_ref().unwrap().contains("E3005"));
    }
}
