//! Panic isolation for extension code.
//!
//! Constructors and initialization hooks of an extension run inside
//! `catch_unwind`. A panicking extension degrades to "absent" or
//! "uninitialized" instead of taking the controller down.
//!
//! `catch_unwind` only catches unwinding panics; an extension built with
//! `panic = "abort"` still aborts the process.

use std::any::Any;
use std::panic::{UnwindSafe, catch_unwind};

/// Extension-specific error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PluginError {
    /// Extension panicked during execution
    #[error("Extension panicked: {0}")]
    Panic(String),

    /// Initialization hook reported a failure
    #[error("Extension initialization failed: {0}")]
    InitializationFailed(String),

    /// Extension version does not match the controller
    #[error("Extension version incompatible: {0}")]
    VersionIncompatible(String),
}

/// Call an extension function that returns a plain value.
///
/// A panic is converted into [`PluginError::Panic`].
pub fn call_plugin_safely_value<F, T>(plugin_fn: F) -> Result<T, PluginError>
where
    F: FnOnce() -> T + UnwindSafe,
{
    match catch_unwind(plugin_fn) {
        Ok(result) => Ok(result),
        Err(panic_info) => {
            let msg = extract_panic_message(&panic_info);
            tracing::error!(message = %msg, "Extension panicked");
            Err(PluginError::Panic(msg))
        }
    }
}

/// Call an extension function returning `Result`, keeping its error type.
///
/// Panics are converted with `panic_to_error`.
pub fn call_plugin_preserving_error<F, T, E, PC>(plugin_fn: F, panic_to_error: PC) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E> + UnwindSafe,
    PC: FnOnce(String) -> E,
{
    match catch_unwind(plugin_fn) {
        Ok(result) => result,
        Err(panic_info) => {
            let msg = extract_panic_message(&panic_info);
            tracing::error!(message = %msg, "Extension panicked");
            Err(panic_to_error(msg))
        }
    }
}

/// Extract a human-readable message from a panic payload.
fn extract_panic_message(panic_info: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic (non-string payload)".to_string()
    }
}
