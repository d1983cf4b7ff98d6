//!
//! A utility to print progress information for procedures that take an unknown
//! number of steps. In particular, avoids writing too many progress
//! indications.
//!

use std::cell::RefCell;
use std::time::Duration;
use std::time::Instant;

/// A time-based progress tracker that invokes its message callback at most
/// once per interval.
pub struct TimeProgress<T> {
    interval: Duration,
    last_update: RefCell<Instant>,
    message: Box<dyn Fn(T)>,
}

impl<T> TimeProgress<T> {
    /// Create a new time-based progress tracker with a given interval in seconds.
    pub fn new(message: impl Fn(T) + 'static, interval_seconds: u64) -> TimeProgress<T> {
        TimeProgress {
            message: Box::new(message),
            interval: Duration::from_secs(interval_seconds),
            last_update: RefCell::new(Instant::now()),
        }
    }

    /// Reports progress, invoking the message callback when enough time has
    /// passed since the previous report.
    pub fn print(&self, object: T) {
        let now = Instant::now();
        let should_print = {
            let last = *self.last_update.borrow();
            now.duration_since(last) >= self.interval
        };
        if should_print {
            (self.message)(object);
            *self.last_update.borrow_mut() = now;
        }
    }
}
