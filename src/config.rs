//! Pipeline configuration.
//!
//! All tunables live here with defaults that match the protocol notes in the
//! project docs. Values are design parameters, not wire contracts: producers
//! and consumers only need to agree on the frame format itself.
//!
//! Configuration can be built fluently or resolved from the environment:
//!
//! ```
//! use satscope::config::PipelineConfig;
//! use std::time::Duration;
//!
//! let config = PipelineConfig::new("127.0.0.1:9900")
//!     .with_queue_capacity(512)
//!     .with_layout_interval(Duration::from_millis(80));
//! assert_eq!(config.queue_capacity, 512);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunables for the whole ingestion/layout pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Producer address, `host:port`.
    pub producer_addr: String,

    /// Capacity of the bounded queue between connection I/O and the event
    /// processor.
    pub queue_capacity: usize,
    /// How long a structural push may stall before a throughput warning is
    /// emitted to the lifecycle hub.
    pub structural_stall_warning: Duration,

    /// Interval of the synthetic decay tick, driven by the event processor's
    /// own clock.
    pub decay_interval: Duration,
    /// Per-tick multiplicative heat decay factor, in (0, 1).
    pub heat_decay: f32,
    /// Per-tick multiplicative edge-weight decay factor, in (0, 1).
    pub weight_decay: f32,
    /// Floor edge weights decay toward but never cross.
    pub weight_floor: f32,
    /// Saturation value a touch sets a node's heat to.
    pub heat_max: f32,
    /// Edge weight increment for a clause co-occurrence.
    pub clause_increment: f32,
    /// Edge weight increment for a conflict co-occurrence.
    pub conflict_increment: f32,

    /// Layout scheduler tick interval.
    pub layout_interval: Duration,
    /// Budget for one layout oracle invocation.
    pub layout_timeout: Duration,

    /// Reconnection backoff base delay.
    pub backoff_base: Duration,
    /// Reconnection backoff cap.
    pub backoff_cap: Duration,

    /// Size of the socket read buffer.
    pub read_buffer_size: usize,
    /// Upper bound on a single frame's payload length; anything larger is a
    /// protocol error.
    pub max_frame_len: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            producer_addr: "127.0.0.1:9900".to_string(),
            queue_capacity: 1024,
            structural_stall_warning: Duration::from_millis(250),
            decay_interval: Duration::from_millis(250),
            heat_decay: 0.92,
            weight_decay: 0.995,
            weight_floor: 1.0,
            heat_max: 1.0,
            clause_increment: 1.0,
            conflict_increment: 3.0,
            layout_interval: Duration::from_millis(100),
            layout_timeout: Duration::from_millis(500),
            backoff_base: Duration::from_millis(200),
            backoff_cap: Duration::from_secs(5),
            read_buffer_size: 8 * 1024,
            max_frame_len: 1024 * 1024,
        }
    }
}

impl PipelineConfig {
    pub fn new(producer_addr: impl Into<String>) -> Self {
        Self {
            producer_addr: producer_addr.into(),
            ..Default::default()
        }
    }

    /// Resolve a config from the environment. `.env` files are honored via
    /// dotenvy; unset variables fall back to the defaults.
    ///
    /// Recognized variables: `SATSCOPE_PRODUCER_ADDR`,
    /// `SATSCOPE_QUEUE_CAPACITY`, `SATSCOPE_DECAY_INTERVAL_MS`,
    /// `SATSCOPE_LAYOUT_INTERVAL_MS`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        if let Ok(addr) = std::env::var("SATSCOPE_PRODUCER_ADDR") {
            config.producer_addr = addr;
        }
        if let Some(cap) = env_parse::<usize>("SATSCOPE_QUEUE_CAPACITY") {
            config.queue_capacity = cap;
        }
        if let Some(ms) = env_parse::<u64>("SATSCOPE_DECAY_INTERVAL_MS") {
            config.decay_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse::<u64>("SATSCOPE_LAYOUT_INTERVAL_MS") {
            config.layout_interval = Duration::from_millis(ms);
        }
        config
    }

    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    #[must_use]
    pub fn with_decay_interval(mut self, interval: Duration) -> Self {
        self.decay_interval = interval;
        self
    }

    #[must_use]
    pub fn with_layout_interval(mut self, interval: Duration) -> Self {
        self.layout_interval = interval;
        self
    }

    #[must_use]
    pub fn with_layout_timeout(mut self, timeout: Duration) -> Self {
        self.layout_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, base: Duration, cap: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_cap = cap;
        self
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
