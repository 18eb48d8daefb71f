use std::{cell::RefCell, ffi::OsStr};

/// Variable holding the `tracing` filter directives.
pub const LOG_VAR: &str = "LC3VM_LOG";
/// Set to `1` to force minimal output.
pub const MINIMAL_VAR: &str = "LC3VM_MINIMAL";

const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Clone, Debug)]
struct Env {
    minimal: bool,
    log_filter: String,
}

thread_local! {
    /// Must only be mutated within `set_env`
    static ENV: RefCell<Option<Env>> = const { RefCell::new(None) };
}

pub fn init() {
    let value = Env {
        minimal: var_is(MINIMAL_VAR, "1"),
        log_filter: std::env::var(LOG_VAR).unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
    };
    set_env(value);
}

pub fn is_minimal() -> bool {
    with_env(|env| env.minimal)
}

pub fn log_filter() -> String {
    with_env(|env| env.log_filter.clone())
}

fn set_env(value: Env) {
    ENV.with(|env| {
        let mut env = env.borrow_mut();
        assert!(
            env.is_none(),
            "tried to initialize environment state multiple times"
        );
        *env = Some(value);
    });
}

fn with_env<F, R>(callback: F) -> R
where
    F: Fn(&Env) -> R,
{
    ENV.with(|env| {
        let env = env.borrow();
        let env = env.as_ref().unwrap_or_else(|| {
            panic!("tried to access environment state before initialization");
        });
        callback(env)
    })
}

fn var_is(name: impl AsRef<OsStr>, value: impl AsRef<str>) -> bool {
    std::env::var(name.as_ref()).is_ok_and(|v| v == value.as_ref())
}
