use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("quality table is empty")]
    EmptyQualityTable,
    #[error("quality tier {label:?} has invalid threshold {threshold}")]
    InvalidThreshold { label: String, threshold: f64 },
    #[error("quality tier {label:?} is not below the previous tier's threshold")]
    UnorderedTiers { label: String },
    #[error("last quality tier must have threshold 0, got {threshold}")]
    MissingFloorTier { threshold: f64 },
    #[error("safety margin must be in (0, 1], got {0}")]
    InvalidSafetyMargin(f64),
    #[error("peak hour {0} is outside 0-23")]
    InvalidHour(u32),
    #[error(
        "peak window {start_hour}-{end_hour} crosses midnight, which the inclusive hour range cannot express"
    )]
    WrappingPeakWindow { start_hour: u32, end_hour: u32 },
    #[error("estimated stream bandwidth must be finite and non-negative, got {0}")]
    InvalidStreamEstimate(f64),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServerError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server answered with status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    #[error("speed probe could not start: {0}")]
    Launch(String),
    #[error("speed probe timed out after {0} s")]
    Timeout(u64),
    #[error("speed probe failed: {0}")]
    Failed(String),
    #[error("speed probe output unusable: {0}")]
    Output(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RunError {
    #[error("cannot reach media server: {0}")]
    Connectivity(ServerError),
    #[error("upload measurement failed, cannot adjust quality: {0}")]
    Probe(ProbeError),
    #[error("failed to update quality to {target_kbps} kbps: {error}")]
    Apply {
        target_kbps: u32,
        error: ServerError,
    },
}
