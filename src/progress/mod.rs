//! Live progress display.
//!
//! A [`Progress`] hands out one [`Indicator`] per suite. The scheduler bumps
//! the indicator once per executed step and finishes it with a pass/fail
//! label when the suite completes.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::DetailsLevel;
use crate::util::right_pad;

#[cfg(feature = "progress")]
mod bar;
#[cfg(feature = "progress")]
pub use bar::BarProgress;

/// Width labels are padded to.
pub const LABEL_WIDTH: usize = 47;

/// Source of per-suite indicators.
pub trait Progress: Send + Sync {
    /// Create an indicator expecting `len` increments.
    fn indicator(&self, label: &str, len: u64) -> Box<dyn Indicator>;

    /// Begin drawing. Indicators created before this stay invisible.
    fn start(&self) {}

    /// Stop drawing once every suite is done.
    fn stop(&self) {}
}

/// Progress of one suite.
pub trait Indicator: Send {
    fn increment(&mut self);

    fn set_label(&mut self, label: &str);

    /// Mark the suite as done.
    fn finish(&mut self, label: &str, elapsed: Duration);
}

/// Label shown while a suite runs.
pub fn running_label(package: &str) -> String {
    right_pad(&format!("⚙ {package}"), LABEL_WIDTH)
}

/// Label shown once a suite is done.
pub fn finished_label(package: &str, success: bool) -> String {
    let mark = if success { "✅" } else { "❌" };
    right_pad(&format!("{mark} {package}"), LABEL_WIDTH)
}

/// Progress display matching a detail level.
///
/// Medium and high detail draw bars when the `progress` feature is enabled,
/// low detail prints one line per finished suite.
pub fn for_details(details: DetailsLevel) -> Arc<dyn Progress> {
    match details {
        DetailsLevel::Low => Arc::new(LineProgress::stderr()),
        #[cfg(feature = "progress")]
        _ => Arc::new(BarProgress::new(details)),
        #[cfg(not(feature = "progress"))]
        _ => Arc::new(LineProgress::stderr()),
    }
}

/// Draws nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

struct NoIndicator;

impl Progress for NoProgress {
    fn indicator(&self, _label: &str, _len: u64) -> Box<dyn Indicator> {
        Box::new(NoIndicator)
    }
}

impl Indicator for NoIndicator {
    fn increment(&mut self) {}

    fn set_label(&mut self, _label: &str) {}

    fn finish(&mut self, _label: &str, _elapsed: Duration) {}
}

type SharedWriter = Arc<Mutex<dyn Write + Send>>;

/// Prints one line per finished suite.
#[derive(Clone)]
pub struct LineProgress {
    out: SharedWriter,
}

impl LineProgress {
    /// Print to `out`.
    pub fn new<W: Write + Send + 'static>(out: W) -> Self {
        Self {
            out: Arc::new(Mutex::new(out)),
        }
    }

    /// Print to standard error.
    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

struct LineIndicator {
    out: SharedWriter,
    steps: u64,
}

impl Progress for LineProgress {
    fn indicator(&self, _label: &str, _len: u64) -> Box<dyn Indicator> {
        Box::new(LineIndicator {
            out: Arc::clone(&self.out),
            steps: 0,
        })
    }
}

impl Indicator for LineIndicator {
    fn increment(&mut self) {
        self.steps += 1;
    }

    fn set_label(&mut self, _label: &str) {}

    fn finish(&mut self, label: &str, elapsed: Duration) {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        // Progress output is best effort.
        let _ = writeln!(out, "{label} {:.2}s", elapsed.as_secs_f64());
        let _ = out.flush();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Writer collecting everything into a shared buffer.
    #[derive(Clone, Default)]
    pub(crate) struct Buffer(pub Arc<Mutex<Vec<u8>>>);

    impl Buffer {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_labels_are_padded() {
        let label = running_label("tests/a.yml");
        assert!(label.starts_with("⚙ tests/a.yml"));
        assert_eq!(label.chars().count(), LABEL_WIDTH);

        assert!(finished_label("a.yml", true).starts_with("✅ a.yml"));
        assert!(finished_label("a.yml", false).starts_with("❌ a.yml"));
    }

    #[test]
    fn test_line_progress_prints_on_finish() {
        let buffer = Buffer::default();
        let progress = LineProgress::new(buffer.clone());
        let mut indicator = progress.indicator("a", 2);
        indicator.increment();
        indicator.increment();
        assert_eq!(buffer.contents(), "");

        indicator.finish("✅ a.yml", Duration::from_millis(1500));
        assert_eq!(buffer.contents(), "✅ a.yml 1.50s\n");
    }

    #[test]
    fn test_no_progress_is_silent() {
        let progress = NoProgress;
        progress.start();
        let mut indicator = progress.indicator("x", 1);
        indicator.increment();
        indicator.set_label("y");
        indicator.finish("z", Duration::ZERO);
        progress.stop();
    }
}
