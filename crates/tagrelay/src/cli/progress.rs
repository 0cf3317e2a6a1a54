//! Terminal progress bars for uploads.

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tagrelay::{ProgressSink, UploadPhase, UploadProgress};

const TEMPLATE: &str = "{prefix:24!} {msg:14} [{bar:30}] {bytes}/{total_bytes}";

/// One progress bar per file, stacked.
pub struct BarProgress {
    multi: MultiProgress,
    bars: Mutex<HashMap<PathBuf, ProgressBar>>,
}

impl Default for BarProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl BarProgress {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn with_bar(&self, path: &Path, f: impl FnOnce(&ProgressBar)) {
        let mut bars = self.bars.lock().unwrap_or_else(PoisonError::into_inner);
        let bar = bars.entry(path.to_path_buf()).or_insert_with(|| {
            let style = ProgressStyle::with_template(TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> ");
            let bar = self.multi.add(ProgressBar::new(0).with_style(style));
            bar.set_prefix(
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            );
            bar
        });
        f(bar);
    }
}

impl ProgressSink for BarProgress {
    fn on_progress(&self, path: &Path, progress: UploadProgress) {
        self.with_bar(path, |bar| {
            bar.set_length(progress.total);
            bar.set_position(progress.bytes_sent);
        });
    }

    fn on_phase(&self, path: &Path, phase: UploadPhase) {
        self.with_bar(path, |bar| match phase {
            UploadPhase::RequestingUrl => {
                bar.reset();
                bar.set_message("requesting url");
            }
            UploadPhase::Uploading => bar.set_message("uploading"),
            UploadPhase::CreatingPost => bar.set_message("creating post"),
            UploadPhase::Done => bar.finish_with_message("done"),
            UploadPhase::Failed => bar.abandon_with_message("failed"),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bars_are_created_per_file() {
        let progress = BarProgress::default();
        assert!(progress.bars.lock().unwrap().is_empty());

        progress.on_phase(Path::new("videos/a.mp4"), UploadPhase::RequestingUrl);
        progress.on_progress(
            Path::new("videos/b.mp4"),
            UploadProgress { bytes_sent: 5, total: 12 },
        );
        progress.on_progress(
            Path::new("videos/b.mp4"),
            UploadProgress { bytes_sent: 12, total: 12 },
        );

        let bars = progress.bars.lock().unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[Path::new("videos/b.mp4")].position(), 12);
    }
}
