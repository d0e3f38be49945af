//! Session clocks.
//!
//! The countdown and elapsed counters here are plain values advanced by
//! tick events. Wall time only enters through `Metronome`, which turns a
//! sleeping thread into tick messages, and through `Clock`, which stamps
//! completion records.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Result of one rest countdown tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestTick {
    Remaining(u32),
    Expired,
}

/// One-second rest countdown rules
pub struct RestTimer;

impl RestTimer {
    /// Advance the countdown by one second
    ///
    /// Expires when the countdown is at zero after the tick, including a
    /// countdown already brought to zero by an adjustment.
    pub fn tick(remaining: u32) -> RestTick {
        match remaining.saturating_sub(1) {
            0 => RestTick::Expired,
            left => RestTick::Remaining(left),
        }
    }

    /// Apply a manual adjustment, never going below zero
    pub fn adjust(remaining: u32, delta_seconds: i32) -> u32 {
        let adjusted = i64::from(remaining) + i64::from(delta_seconds);
        adjusted.clamp(0, i64::from(u32::MAX)) as u32
    }
}

/// Monotonic whole-second counter for the session
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ElapsedClock {
    seconds: u64,
}

impl ElapsedClock {
    pub fn tick(&mut self) {
        self.seconds += 1;
    }

    pub fn seconds(&self) -> u64 {
        self.seconds
    }
}

/// Render seconds as `mm:ss`
///
/// Minutes keep growing past 59 rather than rolling into hours.
pub fn format_clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Source of wall-clock timestamps
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// The real clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to
#[cfg(test)]
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Arc<std::sync::Mutex<DateTime<Utc>>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(std::sync::Mutex::new(start)),
        }
    }

    pub fn advance(&self, seconds: i64) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = *now + chrono::Duration::seconds(seconds);
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A repeating timer that sends a message every period
///
/// Stops when dropped, when `stop` is called, or when the receiving end
/// of the channel is gone.
pub struct Metronome {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Metronome {
    pub fn spawn<T, F>(tx: Sender<T>, period: Duration, make_message: F) -> Self
    where
        T: Send + 'static,
        F: Fn() -> T + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::spawn(move || loop {
            thread::sleep(period);
            if stop_flag.load(Ordering::SeqCst) {
                break;
            }
            if tx.send(make_message()).is_err() {
                break;
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stop ticking
    ///
    /// A tick already in the channel, or one sent while the thread was
    /// between its flag check and its send, may still be delivered.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        // The thread exits on its next wake-up; no need to wait for it
        self.handle.take();
    }
}

impl Drop for Metronome {
    fn drop(&mut self) {
        self.stop();
    }
}
