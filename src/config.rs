//! Engine configuration.

/// Configuration for the schedule engine.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    pub verbosity: u8,
    /// Whether computed schedules are memoized by input content hash.
    pub cache_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            cache_enabled: true,
        }
    }
}
