//! Shared test utilities for integration tests
//!
//! Fresh stores in temporary directories, plus serialized access to the
//! process environment for config tests.

use macroenv::EnvironmentStore;
use std::sync::Mutex;
use tempfile::TempDir;

/// Door used across tests.
pub const DOOR: &str = "bl/door/01";

/// Global mutex to serialize HOME and MACROENV_* access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Open a store backed by a file inside `dir`.
pub fn open_store(dir: &TempDir) -> EnvironmentStore {
    EnvironmentStore::open(dir.path().join("env.db")).unwrap()
}

/// Run `f` with HOME pointing into `test_dir` and the given variables set.
/// Everything is restored afterwards.
pub fn with_isolated_env<F, R>(test_dir: &TempDir, vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    let test_home = test_dir.path().join("home");
    std::fs::create_dir_all(&test_home).unwrap();

    let mut saved: Vec<(String, Option<String>)> =
        vec![("HOME".to_string(), std::env::var("HOME").ok())];
    std::env::set_var("HOME", &test_home);
    for (name, value) in vars {
        saved.push((name.to_string(), std::env::var(name).ok()));
        std::env::set_var(name, value);
    }

    let result = f();

    for (name, value) in saved.into_iter().rev() {
        match value {
            Some(v) => std::env::set_var(&name, v),
            None => std::env::remove_var(&name),
        }
    }
    result
}
