use crate::cloner::CloneProgress;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

const CLONE_TEMPLATE: &str =
    "{spinner:.green} {prefix:>8.bold} [{bar:30.cyan/blue}] {pos:>3}% {msg} ({elapsed})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {msg} ({elapsed})";
const TICK: Duration = Duration::from_millis(120);

/// Terminal progress for clones. Every bar is hidden when disabled.
pub struct ProgressManager {
    multi_progress: MultiProgress,
    enabled: bool,
}

impl ProgressManager {
    pub fn new(enabled: bool) -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            enabled,
        }
    }

    /// Percentage bar fed by libgit2 transfer callbacks.
    pub fn create_clone_progress(&self, label: &str) -> ProgressBar {
        let style = ProgressStyle::with_template(CLONE_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        let pb = self.attach(ProgressBar::new(100), style, "connecting");
        pb.set_prefix(label.to_string());
        pb
    }

    /// Indeterminate spinner for the external git client.
    pub fn create_spinner(&self, message: &str) -> ProgressBar {
        let style = ProgressStyle::with_template(SPINNER_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("◐◓◑◒●");
        self.attach(ProgressBar::new_spinner(), style, message)
    }

    pub fn clear(&self) {
        if self.enabled {
            self.multi_progress.clear().ok();
        }
    }

    fn attach(&self, bar: ProgressBar, style: ProgressStyle, message: &str) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = self.multi_progress.add(bar);
        pb.set_style(style);
        pb.set_message(message.to_string());
        pb.enable_steady_tick(TICK);
        pb
    }
}

pub fn update_clone_progress(pb: &ProgressBar, progress: &CloneProgress) {
    let (percent, message) = describe_transfer(progress);
    pb.set_position(percent);
    pb.set_message(message);
}

/// Percentage of objects received and a one-line status for the bar.
fn describe_transfer(progress: &CloneProgress) -> (u64, String) {
    if progress.total_objects == 0 {
        return (0, "waiting for object count".to_string());
    }

    let percent = u64::from(progress.received_objects) * 100 / u64::from(progress.total_objects);
    let receiving = progress.received_objects < progress.total_objects;

    let message = if receiving || progress.total_deltas == 0 {
        format!(
            "{}/{} objects, {} KiB",
            progress.received_objects,
            progress.total_objects,
            progress.received_bytes / 1024
        )
    } else {
        format!(
            "deltas {}/{}",
            progress.indexed_deltas, progress.total_deltas
        )
    };

    (percent, message)
}

pub fn finish_progress_with_summary(pb: &ProgressBar, message: &str, duration: Duration) {
    pb.finish_with_message(format!("{} in {}", message, format_duration(duration)));
}

/// Compact elapsed time: `850ms`, `4.2s`, `2m05s`.
pub(crate) fn format_duration(duration: Duration) -> String {
    match duration.as_millis() {
        millis @ 0..=999 => format!("{}ms", millis),
        1_000..=59_999 => format!("{:.1}s", duration.as_secs_f64()),
        _ => {
            let secs = duration.as_secs();
            format!("{}m{:02}s", secs / 60, secs % 60)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(received: u32, total: u32, indexed: u32, deltas: u32) -> CloneProgress {
        CloneProgress {
            total_objects: total,
            received_objects: received,
            local_objects: 0,
            total_deltas: deltas,
            indexed_deltas: indexed,
            received_bytes: 2048,
        }
    }

    #[test]
    fn test_disabled_progress_bars() {
        let manager = ProgressManager::new(false);

        assert!(manager.create_clone_progress("geoip").is_hidden());
        assert!(manager.create_spinner("test").is_hidden());
        manager.clear();
    }

    #[test]
    fn test_transfer_descriptions() {
        assert_eq!(
            describe_transfer(&progress(0, 0, 0, 0)),
            (0, "waiting for object count".to_string())
        );
        assert_eq!(
            describe_transfer(&progress(30, 120, 0, 0)),
            (25, "30/120 objects, 2 KiB".to_string())
        );
        assert_eq!(
            describe_transfer(&progress(120, 120, 7, 40)),
            (100, "deltas 7/40".to_string())
        );
    }

    #[test]
    fn test_bar_receives_position_and_message() {
        let pb = ProgressBar::hidden();
        update_clone_progress(&pb, &progress(60, 80, 0, 0));

        assert_eq!(pb.position(), 75);
        assert_eq!(pb.message(), "60/80 objects, 2 KiB");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(850)), "850ms");
        assert_eq!(format_duration(Duration::from_millis(4_200)), "4.2s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m05s");
        assert_eq!(format_duration(Duration::from_secs(7_260)), "121m00s");
    }
}
