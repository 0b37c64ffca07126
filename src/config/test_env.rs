use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

use super::env_overrides::OVERRIDE_VARS;

static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

/// Process environment pinned for one test: every override variable is
/// cleared, then `vars` are set. Everything is restored on drop.
pub(crate) struct ScopedEnv {
    saved: Vec<(&'static str, Option<String>)>,
    _lock: MutexGuard<'static, ()>,
}

impl ScopedEnv {
    pub(crate) fn with(vars: &[(&'static str, &str)]) -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
        let saved = OVERRIDE_VARS
            .iter()
            .map(|key| (*key, std::env::var(key).ok()))
            .collect();
        // SAFETY: ENV_LOCK serializes every test that touches these variables.
        unsafe {
            for key in OVERRIDE_VARS {
                std::env::remove_var(key);
            }
            for (key, value) in vars {
                std::env::set_var(key, value);
            }
        }
        Self { saved, _lock: lock }
    }

    pub(crate) fn clean() -> Self {
        Self::with(&[])
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        // SAFETY: the lock field is dropped after this body runs.
        unsafe {
            for (key, previous) in &self.saved {
                match previous {
                    Some(value) => std::env::set_var(key, value),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
}
