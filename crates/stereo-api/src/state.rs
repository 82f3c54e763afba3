//! Application state management

use crate::config::ApiConfig;
use std::sync::Arc;
use stereo_core::BBox;
use stereo_cv::sim::{synthetic_clip, MemoryVideoIo, ScanningDetector, StubTracker};
use stereo_cv::MemoryStoreProvider;
use stereo_pipeline::{InMemoryExperimentLog, PipelineConfig, SegmentationPipeline};
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: ApiConfig,
    /// Segmentation pipeline and job registry
    pub pipeline: Arc<SegmentationPipeline>,
    /// In-memory video store, present in simulation mode
    pub sim_io: Option<MemoryVideoIo>,
}

impl AppState {
    /// Create new application state with all components
    pub fn new(config: ApiConfig) -> anyhow::Result<Self> {
        let pipeline_config = PipelineConfig {
            uploads_dir: config.uploads_dir.clone(),
            outputs_dir: config.outputs_dir.clone(),
            cv: stereo_cv::CvConfig::default(),
        };

        let (pipeline, sim_io) = if config.simulation_mode {
            info!("Simulation mode: in-memory videos and stub models");
            Self::build_simulated(pipeline_config)
        } else {
            Self::build_real(pipeline_config)?
        };

        Ok(Self {
            config,
            pipeline: Arc::new(pipeline),
            sim_io,
        })
    }

    fn build_simulated(config: PipelineConfig) -> (SegmentationPipeline, Option<MemoryVideoIo>) {
        let io = MemoryVideoIo::new();
        let pipeline = SegmentationPipeline::new(
            config,
            Arc::new(io.clone()),
            Some(Arc::new(ScanningDetector::new())),
            Some(Arc::new(StubTracker::new())),
            Arc::new(MemoryStoreProvider),
        )
        .with_experiment_log(Arc::new(InMemoryExperimentLog::new()));
        (pipeline, Some(io))
    }

    #[cfg(feature = "opencv")]
    fn build_real(
        config: PipelineConfig,
    ) -> anyhow::Result<(SegmentationPipeline, Option<MemoryVideoIo>)> {
        use stereo_cv::frame::DiskStoreProvider;
        use stereo_cv::video::OpenCvVideoIo;

        // Detector and tracker models are served out of process; until
        // they are wired in the service runs degraded and rejects full
        // jobs with a 503.
        warn!("no segmentation models configured, running in degraded mode");
        let pipeline = SegmentationPipeline::new(
            config,
            Arc::new(OpenCvVideoIo),
            None,
            None,
            Arc::new(DiskStoreProvider::new("temp_frames")),
        )
        .with_experiment_log(Arc::new(InMemoryExperimentLog::new()));
        Ok((pipeline, None))
    }

    #[cfg(not(feature = "opencv"))]
    fn build_real(
        config: PipelineConfig,
    ) -> anyhow::Result<(SegmentationPipeline, Option<MemoryVideoIo>)> {
        warn!("built without the opencv feature, falling back to simulation mode");
        Ok(Self::build_simulated(config))
    }

    pub fn models_available(&self) -> bool {
        self.pipeline.models_available()
    }

    /// In simulation mode an upload lands a synthetic stereo clip in the
    /// in-memory store so the rest of the API has something to chew on.
    pub fn seed_simulated(&self, filename: &str) {
        if let Some(io) = &self.sim_io {
            let players = [
                BBox::new(80.0, 60.0, 110.0, 120.0),
                BBox::new(260.0, 80.0, 290.0, 140.0),
                BBox::new(440.0, 70.0, 470.0, 130.0),
                BBox::new(120.0, 420.0, 150.0, 480.0),
                BBox::new(300.0, 440.0, 330.0, 500.0),
                BBox::new(480.0, 430.0, 510.0, 490.0),
            ];
            let path = self.config.uploads_dir.join(filename);
            io.insert_video(path, 30.0, synthetic_clip(640, 720, 60, &players));
            info!(filename, "seeded simulated stereo clip");
        }
    }
}
