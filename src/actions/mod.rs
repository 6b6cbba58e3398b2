// Module: Actions
// Bundled Action implementations (echo/noop/fail stubs, wait, http, assert)
// and the registry wiring for all of them.

pub mod assert;
pub mod http;
pub mod stub;
pub mod wait;

use std::sync::Arc;

use crate::config::Config;
use crate::registry::{Action, ActionRegistry};

/// Builds the registry with every bundled action, wiring configuration into
/// the constructors that take it. Called once during process startup.
pub fn builtin_registry(config: &Config) -> ActionRegistry {
    let mut registry = ActionRegistry::new();

    registry.register("echo", Arc::new(stub::EchoAction));
    let noop: Arc<dyn Action> = Arc::new(stub::NoopAction);
    registry.register("noop", Arc::clone(&noop));
    registry.register("nop", noop);
    registry.register("fail", Arc::new(stub::FailAction));

    let wait: Arc<dyn Action> = Arc::new(wait::WaitAction::new());
    registry.register("wait", Arc::clone(&wait));
    registry.register("sleep", wait);

    registry.register("http", Arc::new(http::HttpAction::new(config)));
    registry.register("assert", Arc::new(assert::AssertAction));

    registry
}
