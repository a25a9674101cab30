//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

/// Initialize the logging system
///
/// Applications embedding the crate normally install their own logger; this
/// is a convenience for examples and tests.
pub fn init() {
    let _ = env_logger::try_init();
}
