//! The host boundary: everything the engine needs from the embedding
//! application at evaluation time.

use crate::value::Who;
use ahash::AHashMap;

/// Runtime state an expression evaluates against.
///
/// All variables are stored as strings; numeric reads parse on demand. The
/// engine is single-threaded by construction (see the crate docs), so no
/// interior locking is required of implementations.
pub trait Context {
    /// Read a named value from one of the two bound actors.
    fn actor_var(&self, who: Who, key: &str) -> Option<String>;
    fn set_actor_var(&mut self, who: Who, key: &str, value: String);

    /// The process-wide persistent store.
    fn global_var(&self, key: &str) -> Option<String>;
    fn set_global_var(&mut self, key: &str, value: String);

    /// The per-evaluation transient map, rebuilt by the caller for each
    /// independent entry point.
    fn context_var(&self, key: &str) -> Option<String>;
    fn set_context_var(&mut self, key: &str, value: String);
}

/// Straightforward in-memory [`Context`].
///
/// Hosts with richer actor models implement [`Context`] directly; this one
/// covers tests and simple embeddings.
#[derive(Debug, Clone, Default)]
pub struct ScriptContext {
    alpha: AHashMap<String, String>,
    beta: AHashMap<String, String>,
    globals: AHashMap<String, String>,
    transient: AHashMap<String, String>,
}

impl ScriptContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn actor(&self, who: Who) -> &AHashMap<String, String> {
        match who {
            Who::Alpha => &self.alpha,
            Who::Beta => &self.beta,
        }
    }

    fn actor_mut(&mut self, who: Who) -> &mut AHashMap<String, String> {
        match who {
            Who::Alpha => &mut self.alpha,
            Who::Beta => &mut self.beta,
        }
    }

    /// Clear the transient map between independent evaluations.
    pub fn reset_transient(&mut self) {
        self.transient.clear();
    }
}

impl Context for ScriptContext {
    fn actor_var(&self, who: Who, key: &str) -> Option<String> {
        self.actor(who).get(key).cloned()
    }

    fn set_actor_var(&mut self, who: Who, key: &str, value: String) {
        self.actor_mut(who).insert(key.to_string(), value);
    }

    fn global_var(&self, key: &str) -> Option<String> {
        self.globals.get(key).cloned()
    }

    fn set_global_var(&mut self, key: &str, value: String) {
        self.globals.insert(key.to_string(), value);
    }

    fn context_var(&self, key: &str) -> Option<String> {
        self.transient.get(key).cloned()
    }

    fn set_context_var(&mut self, key: &str, value: String) {
        self.transient.insert(key.to_string(), value);
    }
}
