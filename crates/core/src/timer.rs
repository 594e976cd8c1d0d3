//! Countdown bookkeeping for timed sessions.
//!
//! `Countdown` never looks at a wall clock. Something else (a tick source) calls
//! [`Countdown::tick`] once per elapsed second; the countdown only tracks how many
//! seconds remain and whether it is allowed to move.

/// State of a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Expired,
    Cancelled,
}

/// Emitted by [`Countdown::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Tick { remaining_secs: u32 },
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    duration_secs: u32,
    remaining_secs: u32,
    state: TimerState,
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Countdown {
    #[must_use]
    pub fn new() -> Self {
        Self {
            duration_secs: 0,
            remaining_secs: 0,
            state: TimerState::Idle,
        }
    }

    /// Start counting down from `duration_secs`. Only an idle countdown starts.
    pub fn start(&mut self, duration_secs: u32) -> bool {
        if self.state != TimerState::Idle {
            return false;
        }
        self.duration_secs = duration_secs;
        self.remaining_secs = duration_secs;
        self.state = TimerState::Running;
        true
    }

    pub fn pause(&mut self) -> bool {
        if self.state != TimerState::Running {
            return false;
        }
        self.state = TimerState::Paused;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.state != TimerState::Paused {
            return false;
        }
        self.state = TimerState::Running;
        true
    }

    /// Stop for good. Calling it again, or after expiry, changes nothing.
    pub fn cancel(&mut self) {
        if matches!(
            self.state,
            TimerState::Idle | TimerState::Running | TimerState::Paused
        ) {
            self.state = TimerState::Cancelled;
        }
    }

    /// Account for one elapsed second.
    ///
    /// Returns `None` unless running. Reaching zero yields `Expired` exactly once.
    pub fn tick(&mut self) -> Option<TimerEvent> {
        if self.state != TimerState::Running {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.state = TimerState::Expired;
            return Some(TimerEvent::Expired);
        }
        Some(TimerEvent::Tick {
            remaining_secs: self.remaining_secs,
        })
    }

    #[must_use]
    pub fn state(&self) -> TimerState {
        self.state
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub fn elapsed_secs(&self) -> u32 {
        self.duration_secs.saturating_sub(self.remaining_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_down_and_expires_once() {
        let mut timer = Countdown::new();
        assert!(timer.start(3));
        assert_eq!(timer.tick(), Some(TimerEvent::Tick { remaining_secs: 2 }));
        assert_eq!(timer.tick(), Some(TimerEvent::Tick { remaining_secs: 1 }));
        assert_eq!(timer.tick(), Some(TimerEvent::Expired));
        assert_eq!(timer.tick(), None);
        assert_eq!(timer.remaining_secs(), 0);
        assert_eq!(timer.elapsed_secs(), 3);
        assert_eq!(timer.state(), TimerState::Expired);
    }

    #[test]
    fn remaining_is_non_increasing() {
        let mut timer = Countdown::new();
        timer.start(10);
        let mut last = timer.remaining_secs();
        for step in 0..25 {
            if step % 4 == 0 {
                timer.pause();
            } else if step % 4 == 1 {
                timer.resume();
            }
            timer.tick();
            assert!(timer.remaining_secs() <= last);
            last = timer.remaining_secs();
        }
        assert_eq!(last, 0);
    }

    #[test]
    fn pause_keeps_remaining_time() {
        let mut timer = Countdown::new();
        timer.start(5);
        timer.tick();
        assert!(timer.pause());
        assert_eq!(timer.tick(), None);
        assert_eq!(timer.remaining_secs(), 4);
        assert!(!timer.pause());
        assert!(timer.resume());
        assert_eq!(timer.tick(), Some(TimerEvent::Tick { remaining_secs: 3 }));
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut timer = Countdown::new();
        timer.start(5);
        timer.cancel();
        timer.cancel();
        assert_eq!(timer.state(), TimerState::Cancelled);
        assert_eq!(timer.tick(), None);
        assert!(!timer.resume());
        assert!(!timer.start(5));
    }

    #[test]
    fn cancel_after_expiry_keeps_expired_state() {
        let mut timer = Countdown::new();
        timer.start(1);
        assert_eq!(timer.tick(), Some(TimerEvent::Expired));
        timer.cancel();
        assert_eq!(timer.state(), TimerState::Expired);
    }

    #[test]
    fn zero_duration_expires_on_first_tick() {
        let mut timer = Countdown::new();
        timer.start(0);
        assert_eq!(timer.tick(), Some(TimerEvent::Expired));
    }
}
