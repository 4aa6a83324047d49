//! Built-in checks.

mod apertures;

pub use apertures::ApertureReachability;

use crate::engine::CheckRegistry;

/// Registers every built-in check with the registry.
pub fn register_builtin_checks(registry: &mut CheckRegistry) {
    registry.register(Box::new(ApertureReachability));
}
