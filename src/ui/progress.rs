use indicatif::{HumanBytes, ProgressBar, ProgressStyle};

use crate::models::DownloadStatus;

const BAR_TEMPLATE: &str = "{msg} [{bar:30.cyan/blue}] {percent:>3}% {prefix}";

/// Progress bar driven by [`DownloadStatus`] snapshots.
///
/// Clears itself when dropped.
pub struct DownloadBar {
    progress_bar: ProgressBar,
}

impl DownloadBar {
    pub fn new(model: &str) -> Self {
        let progress_bar = ProgressBar::new(1000);
        progress_bar.set_style(
            ProgressStyle::with_template(BAR_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        progress_bar.set_message(format!("Downloading {model}"));
        Self { progress_bar }
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn update(&self, status: &DownloadStatus) {
        self.progress_bar
            .set_position((status.progress.clamp(0.0, 1.0) * 1000.0) as u64);
        let mut prefix = format!(
            "{}/{} files, {} / {}",
            status.completed_files,
            status.discovered_files,
            HumanBytes(status.completed_bytes),
            HumanBytes(status.total_bytes),
        );
        if let Some(speed) = status.bytes_per_second {
            prefix.push_str(&format!(" ({}/s)", HumanBytes(speed.max(0.0) as u64)));
        }
        self.progress_bar.set_prefix(prefix);
    }

    pub fn finish(&self, message: &str) {
        self.progress_bar.finish_with_message(message.to_string());
    }
}

impl Drop for DownloadBar {
    fn drop(&mut self) {
        self.progress_bar.finish_and_clear();
    }
}
