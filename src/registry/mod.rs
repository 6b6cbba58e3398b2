// Module: Registry
// The Action contract and the process-wide kind -> Action map. The map is
// populated during initialization and only read while test cases execute.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::context::ExecutionContext;
use crate::protocol::{ActionResult, Step};

/// Contract for a step action. Implementations may block on I/O and run
/// concurrently in DAG mode, so they must be reentrant (or keep all state
/// per call). Timeouts are the action's own business.
///
/// O trait requer Send + Sync para suportar execução paralela com
/// tokio::spawn.
#[async_trait]
pub trait Action: Send + Sync {
    /// Executes the resolved step. `context` is a read-only snapshot taken
    /// right before dispatch; dependency results are guaranteed present.
    ///
    /// Returning `Err` is equivalent to returning
    /// `{success: false, output: {error, stack}}` -- the scheduler wraps it.
    async fn run(&self, step: &Step, context: &ExecutionContext) -> Result<ActionResult>;
}

/// Process-wide mapping from action kind to implementation.
#[derive(Default, Clone)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an action under a kind. Re-registering a kind replaces the
    /// previous action; aliases are just multiple registrations of the same
    /// `Arc`.
    pub fn register(&mut self, kind: impl Into<String>, action: Arc<dyn Action>) {
        self.actions.insert(kind.into(), action);
    }

    pub fn get(&self, kind: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(kind).cloned()
    }

    /// Registered kinds, sorted for stable diagnostics.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.actions.keys().cloned().collect();
        kinds.sort();
        kinds
    }
}
