use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Interval between ticks.
pub const TICK: Duration = Duration::from_millis(500);
/// Percentage added per tick.
pub const STEP: u64 = 10;
/// The ticker never goes past this on its own; only a finished request reaches 100.
pub const CAP: u64 = 90;

/// Next percentage after one tick.
pub fn next_percent(current: u64) -> u64 {
    current.saturating_add(STEP).min(CAP)
}

/// A cosmetic progress bar shown while a request is in flight.
///
/// The percentage is not fed by the model; it simply advances every
/// [`TICK`] until it reaches [`CAP`] and waits there.
pub struct ProgressTicker {
    bar: ProgressBar,
    ticker: JoinHandle<()>,
}

impl ProgressTicker {
    /// Start ticking. Must be called from within a tokio runtime.
    pub fn start(message: impl Into<String>, visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(100)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg} [{bar:30}] {pos}%")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        bar.set_message(message.into());
        bar.enable_steady_tick(Duration::from_millis(100));

        let ticking = bar.clone();
        let ticker = tokio::spawn(async move {
            let mut interval = tokio::time::interval(TICK);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                let next = next_percent(ticking.position());
                ticking.set_position(next);
                if next >= CAP {
                    break;
                }
            }
        });

        Self { bar, ticker }
    }

    /// Current percentage.
    pub fn percent(&self) -> u64 {
        self.bar.position()
    }

    /// Stop ticking and clear the bar. Jumps to 100 first when `success` is set.
    pub fn finish(self, success: bool) {
        self.ticker.abort();
        if success {
            self.bar.set_position(100);
        }
        self.bar.finish_and_clear();
    }
}
