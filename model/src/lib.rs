//! Data model for frames connected to the framous server.

pub mod frame;
pub mod registry;

pub use frame::{Frame, FrameId, FrameInfo};
pub use registry::{validate_name, Registry, RegistryError, MAX_NAME_LEN};

use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber.
///
/// The filter is taken from `RUST_LOG`, defaulting to `info`. It is safe to call this more than
/// once; only the first call has any effect.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
    {
        tracing::debug!("logging initialized");
    }
}
