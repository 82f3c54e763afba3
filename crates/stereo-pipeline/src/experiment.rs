//! Experiment log side channel
//!
//! Best-effort audit trail of pipeline activity. Failures here are logged
//! and never fail the job.

use async_trait::async_trait;
use parking_lot::Mutex;
use stereo_core::events::{TimelineEvent, VideoRef};
use tracing::warn;

/// Append-only experiment sink.
#[async_trait]
pub trait ExperimentLog: Send + Sync {
    async fn append(&self, filename: &str, event: TimelineEvent) -> anyhow::Result<()>;
    async fn attach_video(&self, filename: &str, video: VideoRef) -> anyhow::Result<()>;
}

/// Fire-and-forget append that downgrades errors to a warning.
pub async fn record(log: Option<&dyn ExperimentLog>, filename: &str, event: TimelineEvent) {
    if let Some(log) = log {
        if let Err(err) = log.append(filename, event).await {
            warn!(filename, error = %err, "experiment log append failed");
        }
    }
}

/// In-memory experiment log used by tests and simulation mode.
#[derive(Default)]
pub struct InMemoryExperimentLog {
    events: Mutex<Vec<(String, TimelineEvent)>>,
    videos: Mutex<Vec<(String, VideoRef)>>,
}

impl InMemoryExperimentLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events_for(&self, filename: &str) -> Vec<TimelineEvent> {
        self.events
            .lock()
            .iter()
            .filter(|(f, _)| f == filename)
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn videos_for(&self, filename: &str) -> Vec<VideoRef> {
        self.videos
            .lock()
            .iter()
            .filter(|(f, _)| f == filename)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

#[async_trait]
impl ExperimentLog for InMemoryExperimentLog {
    async fn append(&self, filename: &str, event: TimelineEvent) -> anyhow::Result<()> {
        self.events.lock().push((filename.to_string(), event));
        Ok(())
    }

    async fn attach_video(&self, filename: &str, video: VideoRef) -> anyhow::Result<()> {
        self.videos.lock().push((filename.to_string(), video));
        Ok(())
    }
}
