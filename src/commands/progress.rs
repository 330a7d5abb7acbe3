//! Progress bars for bulk transfers

use indicatif::{ProgressBar, ProgressStyle};
use rntag_core::tag::TransferProgress;

/// Progress reporter using indicatif progress bars
pub struct IndicatifProgress {
    current_bar: Option<ProgressBar>,
    phase: &'static str,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        Self {
            current_bar: None,
            phase: "",
        }
    }

    fn create_bar(&mut self, total: u64, phase: &'static str) {
        self.phase = phase;
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message(phase);
        self.current_bar = Some(pb);
    }

    fn set_position(&self, bytes: usize) {
        if let Some(pb) = &self.current_bar {
            pb.set_position(bytes as u64);
        }
    }
}

impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferProgress for IndicatifProgress {
    fn reading(&mut self, total_bytes: usize) {
        self.create_bar(total_bytes as u64, "Reading");
    }

    fn read_progress(&mut self, bytes_read: usize) {
        self.set_position(bytes_read);
    }

    fn writing(&mut self, total_bytes: usize) {
        self.create_bar(total_bytes as u64, "Writing");
    }

    fn write_progress(&mut self, bytes_written: usize) {
        self.set_position(bytes_written);
    }

    fn complete(&mut self) {
        if let Some(pb) = self.current_bar.take() {
            pb.finish_with_message(format!("{} complete", self.phase));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_has_no_bar() {
        let mut progress = IndicatifProgress::default();
        assert!(progress.current_bar.is_none());
        progress.read_progress(16);
        progress.complete();
        assert!(progress.current_bar.is_none());
    }

    #[test]
    fn test_complete_clears_bar() {
        let mut progress = IndicatifProgress::default();
        progress.writing(64);
        assert_eq!(progress.phase, "Writing");
        progress.write_progress(32);
        progress.complete();
        assert!(progress.current_bar.is_none());
    }
}
