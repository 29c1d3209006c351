// ABOUTME: Lexically scoped, thread-safe environment backing the evaluator and host API

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use crate::error::HostError;
use crate::value::Value;

struct Scope {
    bindings: RwLock<HashMap<String, Value>>,
    types: RwLock<HashMap<String, String>>,
    parent: Option<Env>,
}

/// A lexically scoped environment.
///
/// Cloning an `Env` is cheap and shares the underlying scope chain (it is a
/// thin `Arc` handle), which is what lets a host hold one `Env` while
/// multiple threads call `execute` against it and another thread calls
/// `interrupt`. Bindings live behind `RwLock` rather than the teacher's
/// `RefCell` for the same reason: this type must be `Send + Sync`.
#[derive(Clone)]
pub struct Env {
    scope: Arc<Scope>,
    interrupted: Arc<AtomicBool>,
}

impl Env {
    /// Creates a new root environment with its own interruption flag.
    pub fn new() -> Self {
        Env {
            scope: Arc::new(Scope {
                bindings: RwLock::new(HashMap::new()),
                types: RwLock::new(HashMap::new()),
                parent: None,
            }),
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Creates a child scope sharing this environment's interruption flag.
    pub fn child(&self) -> Self {
        Env {
            scope: Arc::new(Scope {
                bindings: RwLock::new(HashMap::new()),
                types: RwLock::new(HashMap::new()),
                parent: Some(self.clone()),
            }),
            interrupted: self.interrupted.clone(),
        }
    }

    /// Binds a name in this scope for the host embedding API. Returns an
    /// error if the name is already bound in this scope (not a parent one) —
    /// use `bind` for the language's own "always bind" `var`/parameter
    /// semantics, which don't go through this check.
    pub fn define(&self, name: impl Into<String>, value: Value) -> Result<(), HostError> {
        let name = name.into();
        let mut bindings = self.scope.bindings.write().unwrap();
        if bindings.contains_key(&name) {
            return Err(HostError::AlreadyDefined(name));
        }
        bindings.insert(name, value);
        Ok(())
    }

    /// Binds (or rebinds) a name in this scope unconditionally. Backs the
    /// evaluator's `var` declarations, function parameters, and loop
    /// variables, which spec §4.5 says "always bind" regardless of any
    /// existing binding in the same scope.
    pub(crate) fn bind(&self, name: impl Into<String>, value: Value) {
        self.scope.bindings.write().unwrap().insert(name.into(), value);
    }

    /// Registers a host type name so `make(TypeName)` and member dispatch can
    /// recognize it. Returns an error if the name is already registered in
    /// this scope.
    pub fn define_type(&self, name: impl Into<String>) -> Result<(), HostError> {
        let name = name.into();
        let mut types = self.scope.types.write().unwrap();
        if types.contains_key(&name) {
            return Err(HostError::TypeAlreadyDefined(name));
        }
        types.insert(name.clone(), name);
        Ok(())
    }

    pub fn is_type_defined(&self, name: &str) -> bool {
        if self.scope.types.read().unwrap().contains_key(name) {
            return true;
        }
        match &self.scope.parent {
            Some(parent) => parent.is_type_defined(name),
            None => false,
        }
    }

    /// Looks up a binding, walking up the parent chain.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(v) = self.scope.bindings.read().unwrap().get(name).cloned() {
            return Some(v);
        }
        match &self.scope.parent {
            Some(parent) => parent.get(name),
            None => None,
        }
    }

    /// Assigns to an existing binding, walking up the parent chain to find
    /// where it was defined. Returns an error if no such binding exists
    /// anywhere in the chain.
    pub fn set(&self, name: &str, value: Value) -> Result<(), HostError> {
        {
            let mut bindings = self.scope.bindings.write().unwrap();
            if bindings.contains_key(name) {
                bindings.insert(name.to_string(), value);
                return Ok(());
            }
        }
        match &self.scope.parent {
            Some(parent) => parent.set(name, value),
            None => Err(HostError::NotFound(name.to_string())),
        }
    }

    /// Cooperative interruption: marks this environment (and every scope
    /// sharing its root) as interrupted. Polled by the evaluator before each
    /// statement and loop iteration.
    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    pub fn clear_interrupt(&self) {
        self.interrupted.store(false, Ordering::SeqCst);
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    /// Drops all bindings in this scope. A destroyed environment's children
    /// (if any closures captured it) still observe empty lookups afterward.
    pub fn destroy(&self) {
        self.scope.bindings.write().unwrap().clear();
        self.scope.types.write().unwrap().clear();
    }
}

impl Default for Env {
    fn default() -> Self {
        Env::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_get() {
        let env = Env::new();
        env.define("x", Value::Int32(1)).unwrap();
        assert_eq!(env.get("x"), Some(Value::Int32(1)));
    }

    #[test]
    fn test_define_rejects_duplicate_in_same_scope() {
        let env = Env::new();
        env.define("x", Value::Int32(1)).unwrap();
        assert!(env.define("x", Value::Int32(2)).is_err());
        assert_eq!(env.get("x"), Some(Value::Int32(1)));
    }

    #[test]
    fn test_bind_overwrites_unconditionally() {
        let env = Env::new();
        env.bind("x", Value::Int32(1));
        env.bind("x", Value::Int32(2));
        assert_eq!(env.get("x"), Some(Value::Int32(2)));
    }

    #[test]
    fn test_get_missing_returns_none() {
        let env = Env::new();
        assert_eq!(env.get("missing"), None);
    }

    #[test]
    fn test_child_sees_parent_bindings() {
        let parent = Env::new();
        parent.define("x", Value::Int32(1)).unwrap();
        let child = parent.child();
        assert_eq!(child.get("x"), Some(Value::Int32(1)));
    }

    #[test]
    fn test_shadowing_in_child_does_not_affect_parent() {
        let parent = Env::new();
        parent.define("x", Value::Int32(1)).unwrap();
        let child = parent.child();
        child.define("x", Value::Int32(2)).unwrap();
        assert_eq!(child.get("x"), Some(Value::Int32(2)));
        assert_eq!(parent.get("x"), Some(Value::Int32(1)));
    }

    #[test]
    fn test_set_updates_in_defining_scope() {
        let parent = Env::new();
        parent.define("x", Value::Int32(1)).unwrap();
        let child = parent.child();
        child.set("x", Value::Int32(9)).unwrap();
        assert_eq!(parent.get("x"), Some(Value::Int32(9)));
    }

    #[test]
    fn test_set_undefined_is_error() {
        let env = Env::new();
        assert!(env.set("nope", Value::Nil).is_err());
    }

    #[test]
    fn test_multi_level_scope_chain() {
        let root = Env::new();
        root.define("a", Value::Int32(1)).unwrap();
        let mid = root.child();
        mid.define("b", Value::Int32(2)).unwrap();
        let leaf = mid.child();
        leaf.define("c", Value::Int32(3)).unwrap();
        assert_eq!(leaf.get("a"), Some(Value::Int32(1)));
        assert_eq!(leaf.get("b"), Some(Value::Int32(2)));
        assert_eq!(leaf.get("c"), Some(Value::Int32(3)));
    }

    #[test]
    fn test_interrupt_flag_shared_across_children() {
        let root = Env::new();
        let child = root.child();
        assert!(!child.is_interrupted());
        root.interrupt();
        assert!(child.is_interrupted());
        child.clear_interrupt();
        assert!(!root.is_interrupted());
    }

    #[test]
    fn test_define_type_rejects_duplicate() {
        let env = Env::new();
        env.define_type("Counter").unwrap();
        assert!(env.define_type("Counter").is_err());
    }

    #[test]
    fn test_is_type_defined_walks_parent_chain() {
        let root = Env::new();
        root.define_type("Counter").unwrap();
        let child = root.child();
        assert!(child.is_type_defined("Counter"));
        assert!(!child.is_type_defined("Missing"));
    }

    #[test]
    fn test_destroy_clears_bindings() {
        let env = Env::new();
        env.define("x", Value::Int32(1)).unwrap();
        env.destroy();
        assert_eq!(env.get("x"), None);
    }

    #[test]
    fn test_concurrent_interrupt_from_another_thread() {
        let root = Env::new();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let env = root.clone();
                std::thread::spawn(move || {
                    while !env.is_interrupted() {
                        std::hint::spin_loop();
                    }
                })
            })
            .collect();
        root.interrupt();
        for h in handles {
            h.join().unwrap();
        }
    }
}
