// ABOUTME: The embeddable host API: define bindings, run scripts, interrupt them from another thread

use std::sync::Arc;

use crate::ast::Program;
use crate::env::Env as Scope;
use crate::error::{HostError, ParseError, RuntimeError};
use crate::eval;
use crate::parser;
use crate::value::{HostFn, HostFunc, Value};

/// A handle a host program embeds: defines bindings and host types, then
/// parses and executes scripts against them.
///
/// Cloning an `Env` shares the same scope chain and interruption flag, so a
/// host can hand clones to multiple worker threads and call `interrupt` from
/// any of them — `execute` on every clone observes it.
#[derive(Clone)]
pub struct Env {
    scope: Scope,
}

impl Env {
    pub fn new() -> Self {
        Env { scope: Scope::new() }
    }

    /// Binds a name to a value visible to scripts executed against this
    /// environment. Fails if the name is already bound in this environment.
    pub fn define(&self, name: impl Into<String>, value: Value) -> Result<(), HostError> {
        self.scope.define(name, value)
    }

    /// Binds a name to a Rust closure callable from script code. Fails if the
    /// name is already bound in this environment.
    pub fn define_func(
        &self,
        name: impl Into<String>,
        arity: Option<usize>,
        func: impl Fn(&[Value]) -> Result<Value, RuntimeError> + Send + Sync + 'static,
    ) -> Result<(), HostError> {
        let name = name.into();
        self.scope.define(
            name.clone(),
            Value::HostFunc(Arc::new(HostFunc {
                name,
                arity,
                func: Box::new(func) as Box<HostFn>,
            })),
        )
    }

    /// Registers a host type so `make(Name)` is recognized by scripts.
    pub fn define_type(&self, name: impl Into<String>) -> Result<(), HostError> {
        self.scope.define_type(name)
    }

    /// Looks up a binding by name, as currently visible from the root scope.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.scope.get(name)
    }

    /// Parses and evaluates a script against this environment, returning the
    /// value of its trailing expression (or `Nil`).
    ///
    /// Runs in a fresh child scope of the root so that top-level `var`
    /// declarations from one call never collide with another concurrent
    /// `execute` call sharing this `Env` — both still see the same
    /// host-defined bindings and the same interruption flag.
    pub fn execute(&self, src: &str) -> Result<Value, HostError> {
        let program = parser::parse(src)?;
        self.execute_program(&program)
    }

    /// Runs an already-parsed program against a fresh child scope of this
    /// environment.
    pub fn execute_program(&self, program: &Program) -> Result<Value, HostError> {
        let call_scope = self.scope.child();
        eval::eval_program(program, &call_scope).map_err(HostError::from)
    }

    /// Signals every in-flight `execute` call sharing this environment (on
    /// any thread) to stop at the next statement or loop check.
    pub fn interrupt(&self) {
        self.scope.interrupt();
    }

    pub fn clear_interrupt(&self) {
        self.scope.clear_interrupt();
    }

    pub fn is_interrupted(&self) -> bool {
        self.scope.is_interrupted()
    }

    /// Drops every binding defined directly on this environment.
    pub fn destroy(&self) {
        self.scope.destroy();
    }
}

impl Default for Env {
    fn default() -> Self {
        Env::new()
    }
}

/// Parses source text into a program without evaluating it.
pub fn parse(src: &str) -> Result<Program, ParseError> {
    parser::parse(src)
}

/// Parses and evaluates source text against a fresh, throwaway environment.
/// Convenience wrapper for one-off scripts with no host bindings.
pub fn run(src: &str) -> Result<Value, HostError> {
    let env = Env::new();
    env.execute(src)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_define_and_execute_reads_binding() {
        let env = Env::new();
        env.define("x", Value::Int64(10)).unwrap();
        let result = env.execute("x + 5;").unwrap();
        assert_eq!(result, Value::Int64(15));
    }

    #[test]
    fn test_define_func_is_callable_from_script() {
        let env = Env::new();
        env.define_func("double", Some(1), |args| match &args[0] {
            Value::Int64(n) => Ok(Value::Int64(n * 2)),
            other => Err(RuntimeError::InvalidOperation(format!(
                "expected int64, got {}",
                other.type_name()
            ))),
        })
        .unwrap();
        assert_eq!(env.execute("double(21);").unwrap(), Value::Int64(42));
    }

    #[test]
    fn test_host_func_arity_mismatch() {
        let env = Env::new();
        env.define_func("noop", Some(1), |_args| Ok(Value::Nil)).unwrap();
        assert!(env.execute("noop();").is_err());
    }

    #[test]
    fn test_define_rejects_duplicate_name() {
        let env = Env::new();
        env.define("x", Value::Int32(1)).unwrap();
        assert!(env.define("x", Value::Int32(2)).is_err());
    }

    #[test]
    fn test_run_standalone() {
        assert_eq!(run("1 + 1;").unwrap(), Value::Int64(2));
    }

    #[test]
    fn test_destroy_clears_environment() {
        let env = Env::new();
        env.define("x", Value::Int32(1)).unwrap();
        env.destroy();
        assert!(env.get("x").is_none());
    }

    #[test]
    fn test_define_type_and_make() {
        let env = Env::new();
        env.define_type("Counter").unwrap();
        assert!(env.execute("make(Counter);").is_ok());
        assert!(env.execute("make(Missing);").is_err());
    }

    #[test]
    fn test_interrupt_from_another_thread_stops_long_running_execute() {
        let env = Env::new();
        let started = Arc::new(Barrier::new(2));
        let stopped = Arc::new(AtomicBool::new(false));

        let worker_env = env.clone();
        let worker_started = started.clone();
        let worker_stopped = stopped.clone();
        let worker = thread::spawn(move || {
            worker_started.wait();
            let result = worker_env.execute("for var i = 0; i < 1; i = 0 { }");
            worker_stopped.store(true, Ordering::SeqCst);
            result
        });

        started.wait();
        env.interrupt();
        let result = worker.join().unwrap();
        assert!(result.is_err());
        assert!(stopped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_hundred_concurrent_executes_observe_interrupt() {
        let env = Env::new();
        let handles: Vec<_> = (0..100)
            .map(|_| {
                let env = env.clone();
                thread::spawn(move || env.execute("for var i = 0; i < 1; i = 0 { }"))
            })
            .collect();
        env.interrupt();
        for h in handles {
            assert!(h.join().unwrap().is_err());
        }
    }
}
