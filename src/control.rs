use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation flag. Clones share the same flag, so a caller can keep
/// one handle and give another to the running pass.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Cancellation and progress side channel handed to each pass.
///
/// Progress is purely observational: the callback receives fractions in `[0, 1]`
/// that never decrease within one `PassControl`.
pub struct PassControl<'a> {
    cancel: CancelFlag,
    on_progress: Option<Box<dyn FnMut(f64) + 'a>>,
    last_fraction: f64,
}

impl<'a> PassControl<'a> {
    pub fn new(cancel: CancelFlag) -> Self {
        Self {
            cancel,
            on_progress: None,
            last_fraction: 0.0,
        }
    }

    pub fn with_progress(mut self, callback: impl FnMut(f64) + 'a) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Reports `done` out of `total` units of work.
    pub fn progress(&mut self, done: usize, total: usize) {
        let fraction = if total == 0 {
            1.0
        } else {
            (done as f64 / total as f64).clamp(0.0, 1.0)
        };
        self.report(fraction);
    }

    /// Reports an absolute fraction; values below the last reported one are raised.
    pub fn report(&mut self, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0).max(self.last_fraction);
        self.last_fraction = fraction;
        if let Some(callback) = self.on_progress.as_mut() {
            callback(fraction);
        }
    }

    /// Control for stage `index` of `count` equal stages: same cancel flag, with its
    /// progress mapped onto this control's range for that stage.
    pub fn stage(&mut self, index: usize, count: usize) -> PassControl<'_> {
        let cancel = self.cancel.clone();
        let count = count.max(1) as f64;
        PassControl::new(cancel)
            .with_progress(move |f| self.report((index as f64 + f) / count))
    }
}

impl Default for PassControl<'_> {
    fn default() -> Self {
        Self::new(CancelFlag::new())
    }
}
