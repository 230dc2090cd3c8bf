//! Terminal progress bars for sync runs.

use std::sync::{Mutex, MutexGuard};

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use packmirror::sync::ProgressSink;

const BAR_TEMPLATE: &str = "{msg:>24} ({pos}/{len}) [{bar:40.green/dim}] {percent}% {elapsed}";

/// Renders one progress bar per fetch phase.
pub struct IndicatifProgress {
    multi: MultiProgress,
    current: Mutex<Option<ProgressBar>>,
    style: ProgressStyle,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        let style = ProgressStyle::with_template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");
        Self {
            multi: MultiProgress::with_draw_target(ProgressDrawTarget::stderr()),
            current: Mutex::new(None),
            style,
        }
    }

    fn current(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for IndicatifProgress {
    fn start(&self, label: &str, total: u64) {
        let bar = self.multi.add(ProgressBar::new(total));
        bar.set_style(self.style.clone());
        bar.set_message(shorten(label, 24));
        if let Some(previous) = self.current().replace(bar) {
            previous.finish_and_clear();
        }
    }

    fn advance(&self) {
        if let Some(bar) = self.current().as_ref() {
            bar.inc(1);
        }
    }

    fn end(&self) {
        if let Some(bar) = self.current().take() {
            bar.finish_and_clear();
        }
    }

    fn report(&self, message: &str) {
        // Printing fails only when stderr is gone.
        let _ = self.multi.println(message);
    }
}

/// Keep the tail of long labels, which carries the distinguishing part.
fn shorten(label: &str, width: usize) -> String {
    let count = label.chars().count();
    if count <= width {
        return label.to_string();
    }
    let tail: String = label.chars().skip(count - (width - 1)).collect();
    format!("…{}", tail)
}
