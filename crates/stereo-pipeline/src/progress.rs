//! Job registry and phase-weighted progress
//!
//! One status record per job key, overwritten in place as the job moves
//! through its phases. Overall percent is a fixed-weight composition:
//! extraction owns [0, 10), top-view tracking [10, 50), bottom-view
//! tracking [50, 90) and rendering [90, 100].

use crate::error::{PipelineError, PipelineResult};
use dashmap::DashMap;
use stereo_core::{JobState, JobStatus};

/// Pipeline phase, carrying its slice of the overall percent range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Extraction,
    TrackTop,
    TrackBottom,
    Render,
}

impl Phase {
    pub fn base(self) -> u8 {
        match self {
            Phase::Extraction => 0,
            Phase::TrackTop => 10,
            Phase::TrackBottom => 50,
            Phase::Render => 90,
        }
    }

    pub fn share(self) -> u8 {
        match self {
            Phase::Extraction => 10,
            Phase::TrackTop | Phase::TrackBottom => 40,
            Phase::Render => 10,
        }
    }

    /// Overall percent for `current` of `total` units into this phase.
    /// Never reaches the next phase's base before the phase is finished.
    pub fn percent(self, current: usize, total: usize) -> u8 {
        if total == 0 {
            return self.base();
        }
        let fraction = (current.min(total) as f64) / (total as f64);
        let offset = (fraction * self.share() as f64).floor() as u8;
        (self.base() + offset).min(self.base() + self.share())
    }
}

/// Concurrent map of job key (source filename) to its live status.
#[derive(Default)]
pub struct JobRegistry {
    jobs: DashMap<String, JobStatus>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a key for a new job. Fails when a job with this key is
    /// still running; a terminal record is overwritten.
    pub fn try_start(&self, key: &str) -> PipelineResult<()> {
        let mut rejected = false;
        self.jobs
            .entry(key.to_string())
            .and_modify(|status| {
                if status.is_running() {
                    rejected = true;
                } else {
                    *status = JobStatus::starting();
                }
            })
            .or_insert_with(JobStatus::starting);
        if rejected {
            return Err(PipelineError::JobAlreadyRunning(key.to_string()));
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<JobStatus> {
        self.jobs.get(key).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    fn update(&self, key: &str, f: impl FnOnce(&mut JobStatus)) {
        if let Some(mut status) = self.jobs.get_mut(key) {
            f(&mut status);
        }
    }

    /// Record phase progress with a human-readable message.
    pub fn set_progress(
        &self,
        key: &str,
        phase: Phase,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) {
        let percent = phase.percent(current, total);
        self.update(key, |status| {
            status.status = JobState::Processing;
            status.message = message.into();
            status.current_frame = current;
            status.total_frames = total;
            status.percent = percent;
        });
    }

    pub fn set_message(&self, key: &str, message: impl Into<String>) {
        self.update(key, |status| {
            status.status = JobState::Processing;
            status.message = message.into();
        });
    }

    /// Mark a job finished with its result URL. Percent snaps to 100.
    pub fn complete(&self, key: &str, result_url: impl Into<String>, message: impl Into<String>) {
        self.update(key, |status| {
            status.status = JobState::Completed;
            status.message = message.into();
            status.percent = 100;
            status.current_frame = status.total_frames;
            status.result_url = Some(result_url.into());
            status.error = None;
        });
    }

    /// Mark a job failed. The record keeps the last progress fields.
    pub fn fail(&self, key: &str, error: impl Into<String>) {
        let error = error.into();
        self.update(key, |status| {
            status.status = JobState::Error;
            status.message = format!("Error during segmentation: {error}");
            status.error = Some(error);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_ranges_do_not_overlap() {
        assert_eq!(Phase::Extraction.percent(0, 100), 0);
        assert_eq!(Phase::Extraction.percent(100, 100), 10);
        assert_eq!(Phase::TrackTop.percent(0, 100), 10);
        assert_eq!(Phase::TrackTop.percent(100, 100), 50);
        assert_eq!(Phase::TrackBottom.percent(100, 100), 90);
        assert_eq!(Phase::Render.percent(100, 100), 100);
    }

    #[test]
    fn test_phase_percent_is_monotonic() {
        let mut last = 0;
        for frame in 0..=250 {
            let p = Phase::TrackTop.percent(frame, 250);
            assert!(p >= last);
            assert!((10..=50).contains(&p));
            last = p;
        }
    }

    #[test]
    fn test_phase_percent_zero_total() {
        assert_eq!(Phase::Render.percent(5, 0), 90);
    }

    #[test]
    fn test_registry_rejects_running_duplicate() {
        let registry = JobRegistry::new();
        registry.try_start("match.mp4").unwrap();
        assert!(matches!(
            registry.try_start("match.mp4"),
            Err(PipelineError::JobAlreadyRunning(_))
        ));
    }

    #[test]
    fn test_registry_allows_restart_after_terminal() {
        let registry = JobRegistry::new();
        registry.try_start("match.mp4").unwrap();
        registry.fail("match.mp4", "tracker exploded");
        registry.try_start("match.mp4").unwrap();

        let status = registry.get("match.mp4").unwrap();
        assert_eq!(status.status, JobState::Starting);
        assert!(status.error.is_none());
    }

    #[test]
    fn test_complete_snaps_to_hundred() {
        let registry = JobRegistry::new();
        registry.try_start("match.mp4").unwrap();
        registry.set_progress(
            "match.mp4",
            Phase::Render,
            7,
            10,
            "Rendering final video...",
        );
        registry.complete("match.mp4", "/video/match_segmented.mp4", "Done");

        let status = registry.get("match.mp4").unwrap();
        assert_eq!(status.percent, 100);
        assert_eq!(status.current_frame, status.total_frames);
        assert_eq!(
            status.result_url.as_deref(),
            Some("/video/match_segmented.mp4")
        );
    }

    #[test]
    fn test_fail_preserves_progress_fields() {
        let registry = JobRegistry::new();
        registry.try_start("match.mp4").unwrap();
        registry.set_progress("match.mp4", Phase::TrackTop, 30, 100, "Tracking top view");
        registry.fail("match.mp4", "propagation failed");

        let status = registry.get("match.mp4").unwrap();
        assert_eq!(status.status, JobState::Error);
        assert_eq!(status.current_frame, 30);
        assert!(status.message.contains("propagation failed"));
    }
}
