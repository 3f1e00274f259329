//! Progress reporting helpers.

use std::sync::atomic::{AtomicU8, Ordering};

/// Callback receiving a completion percentage in `0..=100`.
pub type ProgressFn = dyn Fn(u8) + Send + Sync;

/// Wraps a progress callback so it only ever sees non-decreasing values.
pub struct ProgressReporter<'a> {
    sink: &'a ProgressFn,
    last: AtomicU8,
}

impl<'a> ProgressReporter<'a> {
    pub fn new(sink: &'a ProgressFn) -> Self {
        Self {
            sink,
            last: AtomicU8::new(0),
        }
    }

    /// Report a checkpoint. Values above 100 are clamped; values below the
    /// last reported one are dropped.
    pub fn report(&self, percent: u8) {
        let percent = percent.min(100);
        let previous = self.last.fetch_max(percent, Ordering::SeqCst);
        if percent >= previous {
            (self.sink)(percent);
        }
    }

    /// Report 100.
    pub fn finish(&self) {
        self.report(100);
    }

    /// Highest value reported so far.
    pub fn last(&self) -> u8 {
        self.last.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_reporter_drops_regressions() {
        let seen: &'static Mutex<Vec<u8>> = Box::leak(Box::new(Mutex::new(Vec::new())));
        let sink = |p: u8| seen.lock().unwrap().push(p);
        let reporter = ProgressReporter::new(&sink);

        reporter.report(10);
        reporter.report(50);
        reporter.report(30);
        reporter.report(50);
        reporter.report(250);

        assert_eq!(*seen.lock().unwrap(), vec![10, 50, 50, 100]);
        assert_eq!(reporter.last(), 100);
    }
}
