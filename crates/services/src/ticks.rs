//! Periodic registrations that pace a session countdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use prep_core::time::ManualClock;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// A registration delivering one tick per elapsed second.
///
/// `disarm` is idempotent and releases whatever the registration holds.
#[async_trait]
pub trait TickSource: Send {
    fn arm(&mut self);

    fn disarm(&mut self);

    fn is_armed(&self) -> bool;

    /// Waits for the next tick. Returns `false` at once when disarmed.
    async fn next_tick(&mut self) -> bool;
}

// ─── Interval ticks ────────────────────────────────────────────────────────────

/// Ticks driven by `tokio::time::Interval`.
///
/// `period` is the wall-clock length of one countdown second. The interval
/// is created on the first `next_tick` after arming, so arming needs no
/// runtime.
#[derive(Debug)]
pub struct IntervalTicks {
    period: Duration,
    armed: bool,
    interval: Option<Interval>,
}

impl IntervalTicks {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period: if period.is_zero() {
                Duration::from_secs(1)
            } else {
                period
            },
            armed: false,
            interval: None,
        }
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Default for IntervalTicks {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl TickSource for IntervalTicks {
    fn arm(&mut self) {
        self.armed = true;
    }

    fn disarm(&mut self) {
        self.armed = false;
        self.interval = None;
    }

    fn is_armed(&self) -> bool {
        self.armed
    }

    async fn next_tick(&mut self) -> bool {
        if !self.armed {
            return false;
        }
        let period = self.period;
        let interval = self.interval.get_or_insert_with(|| {
            // First tick one full period from now, not immediately.
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
            interval
        });
        interval.tick().await;
        true
    }
}

// ─── Manual ticks ──────────────────────────────────────────────────────────────

/// Observer for a `ManualTicks` registration that stays valid after the source
/// moved into a controller.
#[derive(Debug, Clone, Default)]
pub struct TickProbe {
    armed: Arc<AtomicBool>,
    delivered: Arc<AtomicU64>,
}

impl TickProbe {
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::SeqCst)
    }
}

/// Fake clock: every `next_tick` while armed is one elapsed second.
#[derive(Debug, Default)]
pub struct ManualTicks {
    probe: TickProbe,
    clock: Option<ManualClock>,
}

impl ManualTicks {
    #[must_use]
    pub fn new() -> (Self, TickProbe) {
        let ticks = Self::default();
        let probe = ticks.probe.clone();
        (ticks, probe)
    }

    /// Also advance `clock` by one second per delivered tick.
    #[must_use]
    pub fn with_clock(mut self, clock: ManualClock) -> Self {
        self.clock = Some(clock);
        self
    }
}

#[async_trait]
impl TickSource for ManualTicks {
    fn arm(&mut self) {
        self.probe.armed.store(true, Ordering::SeqCst);
    }

    fn disarm(&mut self) {
        self.probe.armed.store(false, Ordering::SeqCst);
    }

    fn is_armed(&self) -> bool {
        self.probe.is_armed()
    }

    async fn next_tick(&mut self) -> bool {
        if !self.is_armed() {
            return false;
        }
        if let Some(clock) = &self.clock {
            clock.advance(chrono::Duration::seconds(1));
        }
        self.probe.delivered.fetch_add(1, Ordering::SeqCst);
        true
    }
}
