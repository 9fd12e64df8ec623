//! Time plugin, the [`Clock`] service and invocation [`Stopwatch`]es.
//!
//! Every execution record is stamped and measured through a [`Clock`] instead
//! of `Instant::now()`, so a [`MockClock`] can pin durations in tests.
//!
//! # Example
//!
//! ```
//! use afterhook_core_plugins::{Clock, TimePlugin};
//! use afterhook_system::server::Server;
//!
//! let mut server = Server::new();
//! server.add_plugins(TimePlugin::default());
//! server.finish();
//!
//! let clock = server.get_service::<Clock>().unwrap();
//! let stopwatch = clock.stopwatch();
//! let _ = (stopwatch.started_at(), stopwatch.elapsed());
//! ```

use afterhook_system::plugin::Plugin;
use afterhook_system::server::Server;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

/// Where a [`Clock`] reads time from.
///
/// `now` drives durations; `wall_now` only stamps records.
pub trait ClockProvider: Send + Sync + 'static {
    /// Monotonic time.
    fn now(&self) -> Instant;

    /// Wall-clock time. Defaults to the system clock.
    fn wall_now(&self) -> SystemTime {
        SystemTime::now()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct SystemClock;

impl ClockProvider for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Shared time source for invocation timing.
#[derive(Clone)]
pub struct Clock {
    provider: Arc<dyn ClockProvider>,
}

impl Clock {
    /// Clock backed by the operating system.
    #[must_use]
    pub fn system() -> Self {
        Self::with_provider(Arc::new(SystemClock))
    }

    /// Clock backed by a custom provider.
    #[must_use]
    pub fn with_provider(provider: Arc<dyn ClockProvider>) -> Self {
        Self { provider }
    }

    /// Current monotonic instant.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.provider.now()
    }

    /// Current wall-clock time.
    #[must_use]
    pub fn wall_now(&self) -> SystemTime {
        self.provider.wall_now()
    }

    /// Time since `earlier`, or zero if `earlier` lies ahead of the clock.
    #[must_use]
    pub fn elapsed_since(&self, earlier: Instant) -> Duration {
        self.now().saturating_duration_since(earlier)
    }

    /// Starts timing one invocation.
    #[must_use]
    pub fn stopwatch(&self) -> Stopwatch {
        Stopwatch {
            started_at: self.wall_now(),
            started: self.now(),
            clock: self.clone(),
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

impl core::fmt::Debug for Clock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Clock").finish_non_exhaustive()
    }
}

/// Start stamp of one invocation, read against the clock that made it.
#[derive(Debug, Clone)]
pub struct Stopwatch {
    started_at: SystemTime,
    started: Instant,
    clock: Clock,
}

impl Stopwatch {
    /// Wall-clock time the stopwatch was started.
    #[must_use]
    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    /// Time elapsed since the stopwatch was started.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed_since(self.started)
    }
}

/// Registers the [`Clock`] service.
///
/// | Service | Description |
/// |---------|-------------|
/// | [`Clock`] | Stamps and measures invocations |
///
/// ```ignore
/// let mock = Arc::new(MockClock::new(Instant::now()));
/// server.add_plugins(TimePlugin::with_clock(mock.clone()));
/// server.finish();
///
/// // Every intercepted call now takes exactly as long as the test says
/// mock.advance(Duration::from_millis(250));
/// ```
#[derive(Clone, Default)]
pub struct TimePlugin {
    provider: Option<Arc<dyn ClockProvider>>,
}

impl TimePlugin {
    /// Uses the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a custom provider.
    #[must_use]
    pub fn with_clock(provider: Arc<dyn ClockProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }
}

impl Plugin for TimePlugin {
    fn build(&self, server: &mut Server) {
        let clock = self
            .provider
            .clone()
            .map_or_else(Clock::system, Clock::with_provider);
        server.insert_service(clock);
    }
}

/// Provider that only moves when a test moves it.
///
/// Wall time starts at the Unix epoch and advances with the monotonic instant.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockClock {
    state: parking_lot::RwLock<(Instant, SystemTime)>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockClock {
    /// Mock clock reading `start`.
    #[must_use]
    pub fn new(start: Instant) -> Self {
        Self {
            state: parking_lot::RwLock::new((start, SystemTime::UNIX_EPOCH)),
        }
    }

    /// Overrides the reported wall-clock time.
    #[must_use]
    pub fn with_wall(self, wall: SystemTime) -> Self {
        self.state.write().1 = wall;
        self
    }

    /// Moves both readings forward.
    pub fn advance(&self, by: Duration) {
        let mut state = self.state.write();
        state.0 += by;
        state.1 += by;
    }

    /// Jumps the monotonic reading to `instant`.
    pub fn set(&self, instant: Instant) {
        self.state.write().0 = instant;
    }

    /// Current monotonic reading.
    #[must_use]
    pub fn current(&self) -> Instant {
        self.state.read().0
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl ClockProvider for MockClock {
    fn now(&self) -> Instant {
        self.current()
    }

    fn wall_now(&self) -> SystemTime {
        self.state.read().1
    }
}
