use std::time::{Duration, Instant};

/// An 8-bit countdown. Only opcodes load it; ticks only ever run it down to zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CountdownTimer(u8);

impl CountdownTimer {
    pub fn get(&self) -> u8 {
        self.0
    }

    pub fn set(&mut self, value: u8) {
        self.0 = value;
    }

    pub fn is_running(&self) -> bool {
        self.0 > 0
    }

    /// one 60 Hz tick
    pub fn tick(&mut self) {
        self.0 = self.0.saturating_sub(1);
    }
}

/// The delay and sound timers, ticked together.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Timers {
    pub delay: CountdownTimer,
    pub sound: CountdownTimer,
}

impl Timers {
    pub fn tick(&mut self) {
        self.delay.tick();
        self.sound.tick();
    }
}

/// Fixed-rate deadline source for the scheduler. Fires at most once per poll;
/// if it has fallen more than a whole period behind it drops the missed ticks
/// and resynchronises on `now`, rather than firing a burst.
#[derive(Debug, Clone, Copy)]
pub struct Ticker {
    period: Duration,
    next: Instant,
}

impl Ticker {
    pub fn new(period: Duration, start: Instant) -> Self {
        Ticker {
            period,
            next: start + period,
        }
    }

    pub fn from_hz(hz: u32, start: Instant) -> Self {
        Self::new(Duration::from_secs(1) / hz.max(1), start)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn deadline(&self) -> Instant {
        self.next
    }

    /// true if a tick is due at `now`, in which case the next deadline is armed
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next {
            return false;
        }
        self.next += self.period;
        if self.next <= now {
            self.next = now + self.period;
        }
        true
    }
}
