//! Rolling-window circuit breaker.
//!
//! The breaker keeps success and failure counts over a rolling window split
//! into buckets. Once the window holds at least `request_volume_threshold`
//! calls and the error percentage reaches `error_threshold_percentage`, the
//! circuit opens and rejects calls until `sleep_window` has elapsed. It then
//! admits a limited number of probes (half-open); a successful probe closes
//! the circuit, a failed one opens it again.

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::{info, warn};

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed, requests are allowed
    Closed,
    /// Circuit is open, requests are rejected
    Open,
    /// Circuit is half-open, probe requests are allowed to test recovery
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
            Self::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Length of the rolling statistics window
    pub rolling_window: Duration,
    /// Number of buckets the window is split into
    pub buckets: u32,
    /// Minimum calls in the window before the error rate is considered
    pub request_volume_threshold: u32,
    /// Error percentage (0-100) at or above which the circuit opens
    pub error_threshold_percentage: u8,
    /// Time to stay open before admitting probes
    pub sleep_window: Duration,
    /// Maximum concurrent probes while half-open
    pub half_open_max_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            rolling_window: Duration::from_secs(10),
            buckets: 10,
            request_volume_threshold: 20,
            error_threshold_percentage: 50,
            sleep_window: Duration::from_secs(5),
            half_open_max_requests: 1,
        }
    }
}

impl CircuitBreakerConfig {
    /// Set the rolling window length.
    #[must_use]
    pub const fn with_rolling_window(mut self, window: Duration) -> Self {
        self.rolling_window = window;
        self
    }

    /// Set the minimum call volume before tripping.
    #[must_use]
    pub const fn with_request_volume_threshold(mut self, threshold: u32) -> Self {
        self.request_volume_threshold = threshold;
        self
    }

    /// Set the error percentage threshold. Values above 100 are clamped.
    #[must_use]
    pub fn with_error_threshold_percentage(mut self, percentage: u8) -> Self {
        self.error_threshold_percentage = percentage.min(100);
        self
    }

    /// Set the open-state cooldown.
    #[must_use]
    pub const fn with_sleep_window(mut self, window: Duration) -> Self {
        self.sleep_window = window;
        self
    }

    /// Set the number of half-open probes.
    #[must_use]
    pub const fn with_half_open_max_requests(mut self, probes: u32) -> Self {
        self.half_open_max_requests = probes;
        self
    }

    fn bucket_width(&self) -> Duration {
        let buckets = self.buckets.max(1);
        (self.rolling_window / buckets).max(Duration::from_millis(1))
    }
}

/// Call statistics over the current rolling window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HealthSnapshot {
    /// Calls recorded in the window
    pub total: u32,
    /// Failed calls recorded in the window
    pub failures: u32,
}

impl HealthSnapshot {
    /// Failure share of the window, in percent.
    #[must_use]
    pub fn error_percentage(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        let pct = u64::from(self.failures) * 100 / u64::from(self.total);
        u8::try_from(pct).unwrap_or(100)
    }
}

#[derive(Debug)]
struct Bucket {
    started: Instant,
    successes: u32,
    failures: u32,
}

#[derive(Debug)]
struct RollingWindow {
    span: Duration,
    width: Duration,
    buckets: VecDeque<Bucket>,
}

impl RollingWindow {
    fn new(config: &CircuitBreakerConfig) -> Self {
        Self {
            span: config.rolling_window,
            width: config.bucket_width(),
            buckets: VecDeque::new(),
        }
    }

    fn evict(&mut self, now: Instant) {
        while let Some(front) = self.buckets.front() {
            if now.saturating_duration_since(front.started) >= self.span {
                self.buckets.pop_front();
            } else {
                break;
            }
        }
    }

    fn current(&mut self, now: Instant) -> &mut Bucket {
        self.evict(now);
        let stale = self
            .buckets
            .back()
            .is_none_or(|b| now.saturating_duration_since(b.started) >= self.width);
        if stale {
            self.buckets.push_back(Bucket {
                started: now,
                successes: 0,
                failures: 0,
            });
        }
        let last = self.buckets.len() - 1;
        &mut self.buckets[last]
    }

    fn snapshot(&mut self, now: Instant) -> HealthSnapshot {
        self.evict(now);
        self.buckets.iter().fold(HealthSnapshot::default(), |acc, b| HealthSnapshot {
            total: acc.total + b.successes + b.failures,
            failures: acc.failures + b.failures,
        })
    }

    fn clear(&mut self) {
        self.buckets.clear();
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    opened_at: Option<Instant>,
    probes_in_flight: u32,
    probe_started: Option<Instant>,
    window: RollingWindow,
}

/// Circuit breaker guarding a single named operation.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration.
    #[must_use]
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let window = RollingWindow::new(&config);
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                opened_at: None,
                probes_in_flight: 0,
                probe_started: None,
                window,
            }),
        }
    }

    /// Create a circuit breaker with default configuration.
    #[must_use]
    pub fn with_defaults(name: impl Into<String>) -> Self {
        Self::new(name, CircuitBreakerConfig::default())
    }

    /// The operation name this breaker guards.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check if a request is allowed.
    ///
    /// Returns `false` when the call must be short-circuited.
    pub async fn allow_request(&self) -> bool {
        let mut inner = self.inner.lock().await;
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let cooled = inner
                    .opened_at
                    .is_some_and(|at| at.elapsed() >= self.config.sleep_window);
                if cooled {
                    inner.state = CircuitState::HalfOpen;
                    inner.probes_in_flight = 1;
                    inner.probe_started = Some(Instant::now());
                    info!(circuit = %self.name, "circuit half-open, admitting probe");
                }
                cooled
            }
            CircuitState::HalfOpen => {
                // A probe whose caller went away never reports back.
                let abandoned = inner
                    .probe_started
                    .is_some_and(|at| at.elapsed() >= self.config.sleep_window);
                if abandoned {
                    inner.probes_in_flight = 0;
                }
                if inner.probes_in_flight < self.config.half_open_max_requests {
                    inner.probes_in_flight += 1;
                    inner.probe_started = Some(Instant::now());
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful call.
    pub async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Closed;
                inner.opened_at = None;
                inner.probes_in_flight = 0;
                inner.probe_started = None;
                inner.window.clear();
                info!(circuit = %self.name, "circuit closed after successful probe");
            }
            CircuitState::Closed | CircuitState::Open => {
                inner.window.current(now).successes += 1;
            }
        }
    }

    /// Record a failed call.
    pub async fn record_failure(&self) {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(now);
                inner.probes_in_flight = 0;
                inner.probe_started = None;
                warn!(circuit = %self.name, "probe failed, circuit re-opened");
            }
            CircuitState::Closed => {
                inner.window.current(now).failures += 1;
                let health = inner.window.snapshot(now);
                if health.total >= self.config.request_volume_threshold
                    && health.error_percentage() >= self.config.error_threshold_percentage
                {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(now);
                    warn!(
                        circuit = %self.name,
                        calls = health.total,
                        failures = health.failures,
                        error_percentage = health.error_percentage(),
                        "circuit opened",
                    );
                }
            }
            CircuitState::Open => {
                inner.window.current(now).failures += 1;
            }
        }
    }

    /// Get the current circuit state.
    pub async fn state(&self) -> CircuitState {
        self.inner.lock().await.state
    }

    /// Statistics for the current rolling window.
    pub async fn health(&self) -> HealthSnapshot {
        self.inner.lock().await.window.snapshot(Instant::now())
    }

    /// Reset the circuit breaker to closed state.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.state = CircuitState::Closed;
        inner.opened_at = None;
        inner.probes_in_flight = 0;
        inner.probe_started = None;
        inner.window.clear();
    }
}

impl fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
