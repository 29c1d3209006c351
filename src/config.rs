// ABOUTME: Crate-level constants and the debug-trace macro gated on ANKO_DEBUG

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const WELCOME_MESSAGE: &str = "ember - an embeddable scripting language";
pub const WELCOME_SUBTITLE: &str = "type an expression, or .exit to quit";

pub const HELP_TEXT: &str = "\
Usage: ember [SCRIPT]

With no SCRIPT, starts an interactive REPL.

Options:
  -h, --help       print this message
  -V, --version    print the version

Set ANKO_DEBUG=1 to print each statement's control-flow signal as it runs.";

/// Whether `ANKO_DEBUG` is set to a truthy value. Checked fresh every call
/// rather than cached, since tests toggle it at runtime.
pub fn debug_enabled() -> bool {
    matches!(std::env::var("ANKO_DEBUG").as_deref(), Ok("1") | Ok("true"))
}

/// Prints a diagnostic line to stderr when `ANKO_DEBUG` is set, otherwise a
/// no-op. Mirrors the env-var-gated `eprintln!` debugging the teacher's
/// evaluator relies on rather than pulling in a logging crate for a single
/// opt-in trace knob.
#[macro_export]
macro_rules! debug_trace {
    ($($arg:tt)*) => {
        if $crate::config::debug_enabled() {
            eprintln!("[ANKO_DEBUG] {}", format!($($arg)*));
        }
    };
}
