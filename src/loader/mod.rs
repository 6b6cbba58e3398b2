// Module: Loader
// Reads a YAML test-case document into the in-memory model: checks the
// `kind: TestCase` discriminator and assigns `#<index>` ids to steps that
// declare none.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::errors::ErrorCode;
use crate::protocol::{TestCase, TEST_CASE_KIND};

pub fn load_test_case<P: AsRef<Path>>(path: P) -> Result<TestCase> {
    let content = fs::read_to_string(&path).with_context(|| {
        format!(
            "[{}] falha ao ler o caso de teste {:?}",
            ErrorCode::DOCUMENT_NOT_FOUND,
            path.as_ref()
        )
    })?;
    parse_test_case(&content)
        .with_context(|| format!("caso de teste inválido em {:?}", path.as_ref()))
}

pub fn parse_test_case(content: &str) -> Result<TestCase> {
    let mut case: TestCase = serde_yaml::from_str(content).with_context(|| {
        format!(
            "[{}] documento YAML não corresponde ao formato",
            ErrorCode::INVALID_DOCUMENT
        )
    })?;
    if case.kind != TEST_CASE_KIND {
        bail!(
            "[{}] documento com kind '{}'; esperado '{}'",
            ErrorCode::INVALID_DOCUMENT,
            case.kind,
            TEST_CASE_KIND
        );
    }
    case.assign_missing_ids();
    Ok(case)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r##"
kind: TestCase
version: "1"
name: Fluxo básico
step:
  - name: primeiro
    kind: noop
  - id: segundo
    name: segundo
    kind: echo
    if: always()
    depends_on: ["#1"]
    params:
      msg: "{#1}"
"##;

    #[test]
    fn test_parse_assigns_missing_ids() {
        let case = parse_test_case(DOC).unwrap();
        assert_eq!(case.name, "Fluxo básico");
        assert_eq!(case.steps.len(), 2);
        assert_eq!(case.steps[0].id, "#1");
        assert_eq!(case.steps[1].id, "segundo");
        assert_eq!(case.steps[1].depends_on, vec!["#1".to_string()]);
    }

    #[test]
    fn test_wrong_kind_is_rejected() {
        let doc = DOC.replace("kind: TestCase", "kind: Suite");
        let err = parse_test_case(&doc).unwrap_err();
        assert!(err.to_string().contains("Suite"));
    }

    #[test]
    fn test_missing_required_fields_fail_the_parse() {
        assert!(parse_test_case("kind: TestCase\nversion: \"1\"\n").is_err());
    }
}
