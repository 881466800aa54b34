use std::time::Duration;

/// Engine tuning knobs. Injected at construction; `Default` matches the
/// production service.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Attempts per remote confirmation (first try included).
    pub max_attempts: u32,
    /// Base backoff delay; attempt n waits `base_delay * 2^(n-2)`.
    pub base_delay: Duration,
    /// Grace period after coming online before the queue drains, to let
    /// the network stabilize.
    pub reconnect_delay: Duration,
    /// Replay passes a queued operation survives before it is abandoned.
    pub max_queue_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            reconnect_delay: Duration::from_millis(1000),
            max_queue_attempts: 3,
        }
    }
}
