//! Terminal progress bars for running jobs.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use shelfzip_tracker::ProgressDisplay;

const BAR_TEMPLATE: &str = "  {msg:<16} [{bar:30}] {pos:>3}%";

/// One progress bar inside a shared [`MultiProgress`].
pub struct BarDisplay {
    bar: ProgressBar,
}

impl BarDisplay {
    pub fn new(bars: &MultiProgress, label: impl Into<String>) -> Self {
        let bar = bars.add(ProgressBar::new(100));
        bar.set_style(
            ProgressStyle::with_template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_message(label.into());
        Self { bar }
    }
}

impl ProgressDisplay for BarDisplay {
    fn begin(&self) {
        self.bar.set_position(0);
        self.bar.tick();
    }

    fn set_percent(&self, percent: u8) {
        self.bar.set_position(u64::from(percent));
    }

    fn restore(&self) {
        self.bar.finish_and_clear();
    }
}
