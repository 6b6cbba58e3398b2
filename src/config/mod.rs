//! # Módulo de Configuração
//!
//! Acesso a configuração por chave pontilhada (`http.timeout_ms`), com
//! projeção de variáveis de ambiente: `get("http.timeout_ms")` consulta
//! primeiro `HTTP_TIMEOUT_MS` e só então o mapa carregado do arquivo.
//!
//! O engine em si nunca consulta configuração; quem usa são os
//! construtores de ações (ex: timeout padrão do cliente HTTP) e a CLI.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context as _, Result};
use serde_json::Value;

/// Mapa de configuração achatado em chaves pontilhadas.
#[derive(Debug, Clone, Default)]
pub struct Config {
    values: HashMap<String, Value>,
}

impl Config {
    /// Configuração vazia: somente a projeção de ambiente responde.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Carrega um arquivo YAML e achata mapas aninhados em chaves
    /// pontilhadas (`{http: {timeout_ms: 5000}}` vira `http.timeout_ms`).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("falha ao ler configuração {:?}", path.as_ref()))?;
        let root: Value = serde_yaml::from_str(&content)
            .with_context(|| format!("configuração YAML inválida em {:?}", path.as_ref()))?;

        let mut values = HashMap::new();
        flatten("", &root, &mut values);
        Ok(Self { values })
    }

    /// Busca uma chave: ambiente primeiro (maiúsculas, `.` vira `_`),
    /// depois o mapa carregado.
    pub fn get(&self, key: &str) -> Option<Value> {
        let env_key = key.to_uppercase().replace('.', "_");
        if let Ok(raw) = std::env::var(&env_key) {
            return Some(Value::String(raw));
        }
        self.values.get(key).cloned()
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

fn flatten(prefix: &str, value: &Value, out: &mut HashMap<String, Value>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_key = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten(&child_key, child, out);
            }
        }
        other => {
            if !prefix.is_empty() {
                out.insert(prefix.to_string(), other.clone());
            }
        }
    }
}
