//! # Global engine configuration.
//!
//! [`Config`] defines the engine's behavior: event bus capacity and the
//! per-machine history depth cap.
//!
//! # Example
//! ```
//! use opflow::Config;
//!
//! let mut cfg = Config::default();
//! cfg.bus_capacity = 256;
//! cfg.history_limit = 32;
//!
//! assert_eq!(cfg.history_limit, 32);
//! ```

/// Global configuration for the engine.
///
/// Controls the event bus channel and how much transition history each
/// machine retains for introspection.
#[derive(Clone, Debug)]
pub struct Config {
    /// Capacity of the event bus channel.
    pub bus_capacity: usize,
    /// Maximum number of history entries retained per machine
    /// (0 = history recording disabled even when the feature is set).
    pub history_limit: usize,
}

impl Default for Config {
    /// Provides a default configuration:
    /// - `bus_capacity = 1024`
    /// - `history_limit = 64`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            history_limit: 64,
        }
    }
}
