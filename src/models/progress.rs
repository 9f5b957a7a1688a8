//! Download progress aggregation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// One progress report for a single file (or daemon layer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Identity of the file; repeated reports for the same id update one entry.
    pub file_id: String,
    pub completed: u64,
    pub total: u64,
}

/// Callback a loader reports progress through.
pub type ProgressSink = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Observable state of the current model download.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadStatus {
    pub is_downloading: bool,
    pub downloading_model_name: Option<String>,
    /// Fraction in `0.0..=1.0` over all files discovered so far.
    pub progress: f64,
    pub discovered_files: usize,
    pub completed_files: usize,
    pub completed_bytes: u64,
    pub total_bytes: u64,
    pub bytes_per_second: Option<f64>,
}

const PUBLISH_INTERVAL: Duration = Duration::from_millis(200);
const PUBLISH_STEP: f64 = 0.01;

#[derive(Debug, Clone, Copy)]
struct FileProgress {
    completed: u64,
    total: u64,
}

/// Folds per-file reports into aggregate progress and a throughput estimate.
#[derive(Debug)]
pub struct DownloadTracker {
    files: HashMap<String, FileProgress>,
    started: Instant,
    /// Bytes already present when each file was first seen (resumed downloads).
    baseline_bytes: u64,
    last_publish: Option<Instant>,
    last_published_progress: f64,
}

impl DownloadTracker {
    pub fn new(started: Instant) -> Self {
        Self {
            files: HashMap::new(),
            started,
            baseline_bytes: 0,
            last_publish: None,
            last_published_progress: 0.0,
        }
    }

    /// Records an event and returns `true` if it introduced a new file.
    pub fn record(&mut self, event: &ProgressEvent) -> bool {
        let progress = FileProgress {
            completed: event.completed,
            total: event.total.max(event.completed),
        };
        match self.files.insert(event.file_id.clone(), progress) {
            Some(_) => false,
            None => {
                self.baseline_bytes += event.completed;
                true
            }
        }
    }

    pub fn discovered_files(&self) -> usize {
        self.files.len()
    }

    pub fn completed_files(&self) -> usize {
        self.files
            .values()
            .filter(|f| f.total > 0 && f.completed >= f.total)
            .count()
    }

    pub fn completed_bytes(&self) -> u64 {
        self.files.values().map(|f| f.completed).sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.files.values().map(|f| f.total).sum()
    }

    pub fn fraction(&self) -> f64 {
        let total = self.total_bytes();
        if total == 0 {
            return 0.0;
        }
        (self.completed_bytes() as f64 / total as f64).clamp(0.0, 1.0)
    }

    /// Bytes per second transferred since tracking started, excluding resumed bytes.
    pub fn bytes_per_second(&self, now: Instant) -> Option<f64> {
        let elapsed = now.saturating_duration_since(self.started).as_secs_f64();
        if elapsed <= f64::EPSILON {
            return None;
        }
        let transferred = self.completed_bytes().saturating_sub(self.baseline_bytes);
        Some(transferred as f64 / elapsed)
    }

    /// Decides whether a status update is worth publishing.
    ///
    /// Updates are coalesced: new files and completion always publish, otherwise
    /// progress must move by a percent or the publish interval must elapse.
    pub fn should_publish(&mut self, now: Instant, new_file: bool) -> bool {
        let progress = self.fraction();
        let due = self
            .last_publish
            .is_none_or(|last| now.saturating_duration_since(last) >= PUBLISH_INTERVAL);
        let moved = (progress - self.last_published_progress).abs() >= PUBLISH_STEP;
        let finished = progress >= 1.0 && self.last_published_progress < 1.0;

        if new_file || due || moved || finished {
            self.last_publish = Some(now);
            self.last_published_progress = progress;
            true
        } else {
            false
        }
    }

    pub fn status(&self, model_name: &str, now: Instant) -> DownloadStatus {
        DownloadStatus {
            is_downloading: true,
            downloading_model_name: Some(model_name.to_string()),
            progress: self.fraction(),
            discovered_files: self.discovered_files(),
            completed_files: self.completed_files(),
            completed_bytes: self.completed_bytes(),
            total_bytes: self.total_bytes(),
            bytes_per_second: self.bytes_per_second(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(file: &str, completed: u64, total: u64) -> ProgressEvent {
        ProgressEvent {
            file_id: file.to_string(),
            completed,
            total,
        }
    }

    #[test]
    fn test_repeated_reports_count_file_once() {
        let mut tracker = DownloadTracker::new(Instant::now());
        assert!(tracker.record(&event("model.safetensors", 0, 100)));
        assert!(!tracker.record(&event("model.safetensors", 50, 100)));
        assert!(!tracker.record(&event("model.safetensors", 100, 100)));
        assert!(tracker.record(&event("config.json", 10, 10)));

        assert_eq!(tracker.discovered_files(), 2);
        assert_eq!(tracker.completed_files(), 2);
        assert!((tracker.fraction() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fraction_over_discovered_files() {
        let mut tracker = DownloadTracker::new(Instant::now());
        tracker.record(&event("a", 25, 100));
        tracker.record(&event("b", 25, 100));
        assert!((tracker.fraction() - 0.25).abs() < f64::EPSILON);
        assert_eq!(tracker.completed_files(), 0);
    }

    #[test]
    fn test_speed_excludes_resumed_bytes() {
        let start = Instant::now();
        let mut tracker = DownloadTracker::new(start);
        tracker.record(&event("a", 1_000, 3_000));
        tracker.record(&event("a", 3_000, 3_000));

        let speed = tracker
            .bytes_per_second(start + Duration::from_secs(2))
            .unwrap_or_default();
        assert!((speed - 1_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_publish_is_coalesced() {
        let start = Instant::now();
        let mut tracker = DownloadTracker::new(start);
        let new_file = tracker.record(&event("a", 0, 10_000));
        assert!(tracker.should_publish(start, new_file));

        tracker.record(&event("a", 10, 10_000));
        assert!(!tracker.should_publish(start + Duration::from_millis(10), false));

        tracker.record(&event("a", 500, 10_000));
        assert!(tracker.should_publish(start + Duration::from_millis(20), false));

        tracker.record(&event("a", 510, 10_000));
        assert!(tracker.should_publish(start + Duration::from_millis(400), false));
    }
}
