// src/progress.rs

//! Out-of-band build status reporting.
//!
//! The compile pipeline publishes short human-readable status lines to a
//! [`StatusSink`] and clears the status (`None`) when it finishes. Publishing
//! is fire-and-forget: a failing sink is logged and never affects the build.
#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;

/// Receives build status for one target.
///
/// # Examples
///
/// ```
/// use papersync::progress::StatusSink;
/// use std::sync::Mutex;
///
/// // A sink that just stores the last status.
/// struct LastStatus(Mutex<Option<String>>);
///
/// impl StatusSink for LastStatus {
///     fn publish(&self, status: Option<&str>) -> anyhow::Result<()> {
///         *self.0.lock().unwrap() = status.map(str::to_string);
///         Ok(())
///     }
/// }
///
/// let sink = LastStatus(Mutex::new(None));
/// sink.publish(Some("Starting...")).unwrap();
/// assert_eq!(sink.0.lock().unwrap().as_deref(), Some("Starting..."));
/// sink.publish(None).unwrap();
/// assert!(sink.0.lock().unwrap().is_none());
/// ```
pub trait StatusSink: Send + Sync {
    /// Publishes `status`; `None` clears it.
    fn publish(&self, status: Option<&str>) -> anyhow::Result<()>;
}

/// A `StatusSink` that does nothing.
///
/// Used when the caller does not track progress.
pub struct NoOpProgress;

impl StatusSink for NoOpProgress {
    fn publish(&self, _status: Option<&str>) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Best-effort handle to a [`StatusSink`].
#[derive(Clone)]
pub struct Progress {
    sink: Arc<dyn StatusSink>,
}

impl Progress {
    pub fn new(sink: Arc<dyn StatusSink>) -> Self {
        Self { sink }
    }

    /// Publishes a status line, logging (not returning) any failure.
    pub fn set(&self, status: &str) {
        if let Err(e) = self.sink.publish(Some(status)) {
            log::warn!("Failed to publish progress '{}': {:#}", status, e);
        }
    }

    /// Clears the status, logging (not returning) any failure.
    pub fn clear(&self) {
        if let Err(e) = self.sink.publish(None) {
            log::warn!("Failed to clear progress: {:#}", e);
        }
    }

    /// Returns a guard that clears the status when dropped.
    ///
    /// Dropping happens on every exit path of the owning scope: normal return,
    /// `?` propagation, panic unwinding and cancellation of an enclosing future.
    pub fn clear_on_drop(&self) -> ClearOnDrop {
        ClearOnDrop {
            progress: self.clone(),
        }
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new(Arc::new(NoOpProgress))
    }
}

/// Clears the status of a [`Progress`] when dropped.
#[must_use = "the status is cleared as soon as the guard is dropped"]
pub struct ClearOnDrop {
    progress: Progress,
}

impl Drop for ClearOnDrop {
    fn drop(&mut self) {
        self.progress.clear();
    }
}

/// A terminal spinner using the `indicatif` crate.
#[cfg(feature = "progress")]
#[derive(Clone)]
pub struct IndicatifProgress {
    bar: ProgressBar,
}

#[cfg(feature = "progress")]
impl IndicatifProgress {
    /// Creates a new spinner with a default style.
    pub fn new() -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(120));
        Self { bar: pb }
    }
}

#[cfg(feature = "progress")]
impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "progress")]
impl StatusSink for IndicatifProgress {
    fn publish(&self, status: Option<&str>) -> anyhow::Result<()> {
        match status {
            Some(msg) => self.bar.set_message(msg.to_string()),
            None => self.bar.finish_and_clear(),
        }
        Ok(())
    }
}
