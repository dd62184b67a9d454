//! Extension Registration Macros
//!
//! Wraps the `inventory::submit!` boilerplate for registering a
//! [`FingerPrintControlManager`](crate::plugin::FingerPrintControlManager)
//! implementation.
//!
//! # Example
//!
//! ```ignore
//! use fingerprint_control::register_fingerprint_manager;
//!
//! fn create_manager() -> Arc<dyn FingerPrintControlManager> {
//!     Arc::new(MyManager::new())
//! }
//!
//! register_fingerprint_manager!("my-manager", create_manager);
//! ```

/// Register a fingerprint control manager with the controller.
///
/// # Arguments
///
/// * `$id` - Implementation identifier, used in discovery logs
/// * `$factory_fn` - `fn() -> Arc<dyn FingerPrintControlManager>`
#[macro_export]
macro_rules! register_fingerprint_manager {
    ($id:expr, $factory_fn:expr) => {
        ::inventory::submit! {
            $crate::plugin::registry::ManagerConstructor::new($id, $factory_fn)
        }
    };
}
