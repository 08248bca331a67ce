use std::time::Duration;

/// Tunables for channel behavior.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// How long a dispatched request may stay unanswered before it is
    /// abandoned and the caller gets a timeout. Default: 30 seconds.
    pub request_timeout: Duration,
    /// How often the correlation table is swept for entries whose deadline
    /// has passed. Default: 5 seconds.
    pub sweep_interval: Duration,
    /// Buffer capacity of the raw notification tap on the control channel.
    pub raw_tap_capacity: usize,
    /// Buffer capacity of the binary frame stream on the stream channel.
    pub frame_capacity: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            sweep_interval: Duration::from_secs(5),
            raw_tap_capacity: 64,
            frame_capacity: 64,
        }
    }
}
