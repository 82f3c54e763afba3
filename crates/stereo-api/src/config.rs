//! API server configuration

use serde::Deserialize;
use std::path::PathBuf;

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// REST API port
    pub api_port: u16,
    /// Directory uploaded videos are stored in
    pub uploads_dir: PathBuf,
    /// Directory processed videos are written to
    pub outputs_dir: PathBuf,
    /// Enable CORS for all origins (development)
    pub cors_permissive: bool,
    /// Simulation mode (in-memory videos and stub models)
    pub simulation_mode: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_port: 8000,
            uploads_dir: PathBuf::from("uploads"),
            outputs_dir: PathBuf::from("outputs"),
            cors_permissive: true,
            simulation_mode: true,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_port = std::env::var("API_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8000);

        let uploads_dir = std::env::var("UPLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));

        let outputs_dir = std::env::var("OUTPUTS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("outputs"));

        let cors_permissive = std::env::var("CORS_PERMISSIVE")
            .map(|s| s == "true" || s == "1")
            .unwrap_or(true);

        let simulation_mode = std::env::var("SIMULATION_MODE")
            .map(|s| s == "true" || s == "1")
            .unwrap_or(true);

        Self {
            api_port,
            uploads_dir,
            outputs_dir,
            cors_permissive,
            simulation_mode,
        }
    }
}
