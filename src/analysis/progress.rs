//! Progress reporting and cancellation for long analyses.
//!
//! The sampler reports once per processed day. A callback returning
//! `false` cancels the run before the next day starts.

/// Progress information passed to callbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// Steps completed so far.
    pub current: u64,
    /// Total number of steps.
    pub total: u64,
    /// Human-readable description of the last step.
    pub message: String,
}

impl Progress {
    /// Create a new progress report.
    pub fn new(current: u64, total: u64, message: impl Into<String>) -> Self {
        Self {
            current,
            total,
            message: message.into(),
        }
    }

    /// Progress as a fraction (0.0 to 1.0).
    #[inline]
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            let fraction = self.current as f64 / self.total as f64;
            fraction.min(1.0)
        }
    }

    /// Progress as a whole percentage (0 to 100).
    #[inline]
    #[must_use]
    pub fn percent(&self) -> u32 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let percent = (self.fraction() * 100.0).round() as u32;
        percent
    }

    /// `true` once every step is done.
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.current >= self.total
    }
}

/// Receives progress; returns `true` to continue, `false` to cancel.
pub type ProgressCallback<'a> = &'a mut dyn FnMut(&Progress) -> bool;

/// A callback that never cancels.
#[must_use]
pub fn keep_going(_: &Progress) -> bool {
    true
}
