use facewatch_core::SessionConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Daemon configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Analytics server hosting `/upload` and the confirmed-name endpoints.
    pub server_url: String,
    /// Snapshot URL polled for frames.
    pub frame_url: String,
    /// Detector service base URL (`/detect`, `/describe`).
    pub detector_url: String,
    /// Path to the JSON gallery snapshot.
    pub gallery_path: PathBuf,
    /// Period of the per-frame tick (default: 500 ms).
    pub tick_interval: Duration,
    pub upload_interval_secs: u64,
    pub recognition_interval_secs: u64,
    /// Euclidean distance below which a face matches a gallery entry.
    pub match_threshold: f32,
    /// Per-axis pixel movement tolerated between recognition cycles.
    pub movement_threshold: f32,
    /// Still cycles required before an unknown face is registered.
    pub still_threshold: u32,
    /// Observations per rolling attribute window.
    pub window_size: usize,
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration from `FACEWATCH_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                let home = var("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("facewatch");

        let gallery_path = var("FACEWATCH_GALLERY_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("gallery.json"));

        Self {
            server_url: var("FACEWATCH_SERVER_URL")
                .unwrap_or_else(|| "http://localhost:8000".to_string()),
            frame_url: var("FACEWATCH_FRAME_URL")
                .unwrap_or_else(|| "http://localhost:8080/snapshot.jpg".to_string()),
            detector_url: var("FACEWATCH_DETECTOR_URL")
                .unwrap_or_else(|| "http://localhost:8001".to_string()),
            gallery_path,
            tick_interval: Duration::from_millis(parse_or(&var, "FACEWATCH_TICK_MS", 500u64).max(1)),
            upload_interval_secs: parse_or(&var, "FACEWATCH_UPLOAD_INTERVAL_SECS", 1),
            recognition_interval_secs: parse_or(&var, "FACEWATCH_RECOGNITION_INTERVAL_SECS", 10),
            match_threshold: parse_or(&var, "FACEWATCH_MATCH_THRESHOLD", 0.6),
            movement_threshold: parse_or(&var, "FACEWATCH_MOVEMENT_THRESHOLD", 50.0),
            still_threshold: parse_or(&var, "FACEWATCH_STILL_THRESHOLD", 3),
            window_size: parse_or(&var, "FACEWATCH_WINDOW_SIZE", 10),
            http_timeout: Duration::from_secs(parse_or(&var, "FACEWATCH_HTTP_TIMEOUT_SECS", 5)),
        }
    }

    /// Session tunables. Zero intervals fall back to one second.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            window_size: self.window_size,
            match_threshold: self.match_threshold,
            movement_threshold: self.movement_threshold,
            still_threshold: self.still_threshold,
            upload_interval: Duration::from_secs(self.upload_interval_secs.max(1)),
            recognition_interval: Duration::from_secs(self.recognition_interval_secs.max(1)),
        }
    }
}

/// Unparsable values fall back to the default.
fn parse_or<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    var(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}
