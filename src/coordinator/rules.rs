//! Rule compilation, loading and the reload sequence.

use std::sync::Arc;

use super::Shared;
use super::state::{Phase, State};
use crate::compiler::loader_classpath;
use crate::engine::Generation;
use crate::loader;
use crate::logger::{status_error, status_success};
use crate::log;

impl Shared {
    /// Recompile every rule source; records and returns success.
    pub(super) fn compile_rules(&self, state: &mut State) -> bool {
        state.rules_ok = match self.compiler.compile_rules() {
            Ok(outcome) => outcome.succeeded(),
            Err(e) => {
                log!("error"; "rules compilation failed: {:#}", anyhow::Error::from(e));
                false
            }
        };
        state.rules_ok
    }

    /// Load the compiled rules into a fresh generation and activate it.
    ///
    /// Returns the number of execution contexts.
    pub(super) fn load_instances(&self, state: &mut State) -> usize {
        let classpath = loader_classpath(&self.config);
        let report = loader::load(
            &classpath,
            self.config.rule_classes_dir(),
            &self.config.namespace.rules,
            true,
        );

        state.generation += 1;
        let generation = Arc::new(Generation::build(state.generation, report.instances));
        let contexts = generation.contexts().len();
        log!(
            "load";
            "{} type(s), {} instance(s), {} skipped, {} failed",
            report.types.len(),
            generation.instances().len(),
            report.skipped.len(),
            report.failed.len()
        );
        self.engine.activate(generation);
        contexts
    }

    /// Full reload: compile all rules, reset the engine, load a new
    /// generation and restart the event subscription.
    pub(super) fn reload_rules(&self, state: &mut State) {
        let resume = match state.phase {
            Phase::Reloading => Phase::Watching,
            phase => phase,
        };
        state.phase = Phase::Reloading;
        log!("reload"; "reloading rules from {}", self.config.rules_dir().display());

        let compiled = self.compile_rules(state);
        self.engine.reset();
        self.subscriber.stop();
        let contexts = self.load_instances(state);
        self.subscriber.start();

        if compiled {
            status_success(&format!(
                "generation {}: {} rule(s) active",
                state.generation, contexts
            ));
        } else {
            status_error(
                "rules failed to compile",
                &format!("generation {}: {} rule(s) active", state.generation, contexts),
            );
        }
        state.phase = resume;
    }
}
