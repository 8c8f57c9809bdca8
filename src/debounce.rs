//! A simple-as-possible key debouncer to reduce undesired duplicate keypress
//! events.

use crate::time::{Duration, Instant};

/// Default minimum spacing between two accepted keypresses.
pub const DEFAULT_INTERVAL: Duration = Duration::millis(200);

/// `Debounce` is a single, key-agnostic "eager" gate (the first edge is
/// accepted immediately).
///
/// # Algorithm
/// Mechanical switches bounce, producing several edges for one press. The
/// gate remembers the instant of the last accepted keypress and refuses any
/// other keypress until `interval` has elapsed. The gate is shared by all
/// keys: if two different keys go down inside one window only the first is
/// accepted, which rules out chording.
#[derive(Clone, Debug)]
pub struct Debounce {
    interval: Duration,
    last_accepted: Option<Instant>,
}

impl Default for Debounce {
    fn default() -> Self {
        Self::with_interval(DEFAULT_INTERVAL)
    }
}

impl Debounce {
    /// Create a `Debounce` with a custom minimum interval.
    pub fn with_interval(interval: Duration) -> Self {
        Self { interval, last_accepted: None }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a keypress observed at `now` would be accepted.
    ///
    /// An instant earlier than the last accepted one is treated as inside
    /// the window.
    pub fn is_open(&self, now: Instant) -> bool {
        match self.last_accepted {
            None => true,
            Some(last) => now
                .checked_duration_since(last)
                .is_some_and(|elapsed| elapsed >= self.interval),
        }
    }

    /// Ask to accept a keypress observed at `now`.
    ///
    /// Returns `true` at most once per interval and records `now` as the last
    /// accepted instant when it does.
    pub fn permit(&mut self, now: Instant) -> bool {
        let open = self.is_open(now);
        if open {
            self.last_accepted = Some(now);
        }
        open
    }
}
