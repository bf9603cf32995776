//! The process-wide engine instance.
//!
//! Most pages bind one document for their whole lifetime. [`bootstrap`]
//! installs that engine once; [`with_engine`] runs code against it under a
//! lock. Watchers and signal slots already run inside that lock, so they must
//! use the handle they are given instead of calling [`with_engine`] again.

use parking_lot::Mutex;
use tripled_core::logging::targets;

use crate::config::BindingConfig;
use crate::engine::Engine;
use crate::error::{Error, Result};

/// Global engine (installed by [`bootstrap`] or [`install`]).
static GLOBAL_ENGINE: Mutex<Option<Engine>> = Mutex::new(None);

/// Parse, normalize and scan `markup`, then install the result as the global
/// engine.
///
/// Fails with [`Error::AlreadyInitialized`] if an engine is installed.
#[tracing::instrument(skip_all, target = "tripled::global", level = "debug")]
pub fn bootstrap(markup: &str, config: BindingConfig) -> Result<()> {
    if is_initialized() {
        return Err(Error::AlreadyInitialized);
    }
    install(Engine::from_markup(markup, config)?)
}

/// Install an already built engine as the global engine.
pub fn install(engine: Engine) -> Result<()> {
    let mut guard = GLOBAL_ENGINE.lock();
    if guard.is_some() {
        return Err(Error::AlreadyInitialized);
    }
    tracing::debug!(
        target: targets::GLOBAL,
        collections = engine.collections().len(),
        models = engine.models().len(),
        "engine installed"
    );
    *guard = Some(engine);
    Ok(())
}

/// Whether a global engine is installed.
pub fn is_initialized() -> bool {
    GLOBAL_ENGINE.lock().is_some()
}

/// Run `f` with the global engine.
///
/// Returns [`Error::NotInitialized`] if no engine is installed.
pub fn with_engine<R>(f: impl FnOnce(&mut Engine) -> R) -> Result<R> {
    let mut guard = GLOBAL_ENGINE.lock();
    let engine = guard.as_mut().ok_or(Error::NotInitialized)?;
    Ok(f(engine))
}

/// Remove the global engine and return it.
///
/// Its models, collections, query context and watchers go with it; the next
/// [`bootstrap`] starts from scratch.
pub fn teardown() -> Option<Engine> {
    let engine = GLOBAL_ENGINE.lock().take();
    if engine.is_some() {
        tracing::debug!(target: targets::GLOBAL, "engine torn down");
    }
    engine
}
