//! Progress bar driven by core events.

use std::io::{self, IsTerminal};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use tikfleet_core::{FleetEvent, ReportSink, TracingSink};

/// Forwards every event to [`TracingSink`] and advances one bar per router.
///
/// The bar ticks on the last event a router produces: collected or
/// unreachable during inventory, `MutationFinished` during a protected
/// apply. Hidden when stderr is not a terminal or with `--quiet`.
pub struct ProgressSink {
    bar: ProgressBar,
}

impl ProgressSink {
    pub fn new(total: usize, message: &str, quiet: bool) -> Self {
        let bar = ProgressBar::new(u64::try_from(total).unwrap_or(u64::MAX));
        if quiet || !io::stderr().is_terminal() {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        if let Ok(style) =
            ProgressStyle::with_template("{spinner} {msg} [{bar:30}] {pos}/{len} ({elapsed})")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.set_message(message.to_owned());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Advance by one router outside the event stream (provisioning).
    pub fn tick(&self) {
        self.bar.inc(1);
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ReportSink for ProgressSink {
    fn emit(&self, event: FleetEvent) {
        let done = matches!(
            event,
            FleetEvent::DeviceCollected { .. }
                | FleetEvent::DeviceUnreachable { .. }
                | FleetEvent::MutationFinished { .. }
        );
        // Keep log lines from tearing the bar.
        self.bar.suspend(|| TracingSink.emit(event));
        if done {
            self.bar.inc(1);
        }
    }
}
