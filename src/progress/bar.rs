use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

use super::{Indicator, Progress};
use crate::config::DetailsLevel;

/// One progress bar per suite, drawn together on standard error.
///
/// Bars are created hidden so every suite can get its bar before drawing
/// starts.
pub struct BarProgress {
    multi: MultiProgress,
    style: ProgressStyle,
}

impl BarProgress {
    pub fn new(details: DetailsLevel) -> Self {
        let template = match details {
            DetailsLevel::High => "{msg} [{bar:40.cyan/blue}] {pos}/{len} {elapsed_precise}",
            _ => "{msg} [{bar:40.cyan/blue}]",
        };
        let style = ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");

        Self {
            multi: MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
            style,
        }
    }
}

impl Progress for BarProgress {
    fn indicator(&self, label: &str, len: u64) -> Box<dyn Indicator> {
        let pb = self.multi.add(ProgressBar::new(len));
        pb.set_style(self.style.clone());
        pb.set_message(label.to_string());
        Box::new(BarIndicator { pb })
    }

    fn start(&self) {
        self.multi.set_draw_target(ProgressDrawTarget::stderr());
    }

    fn stop(&self) {
        // Finished bars stay on screen; only stop redrawing.
        self.multi.set_draw_target(ProgressDrawTarget::hidden());
    }
}

struct BarIndicator {
    pb: ProgressBar,
}

impl Indicator for BarIndicator {
    fn increment(&mut self) {
        self.pb.inc(1);
    }

    fn set_label(&mut self, label: &str) {
        self.pb.set_message(label.to_string());
    }

    fn finish(&mut self, label: &str, elapsed: Duration) {
        self.pb
            .finish_with_message(format!("{label} {:.2}s", elapsed.as_secs_f64()));
    }
}
