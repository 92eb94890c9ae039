use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    ConfigError, DEFAULT_STREAM_ESTIMATE_MBPS, DecisionEngine, PeakWindow, PolicyClock,
    QualityTable, SafetyMargin,
};

/// Everything the decision side of a run needs, loaded once per process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub quality_table: QualityTable,
    pub peak_window: PeakWindow,
    pub peak_margin: SafetyMargin,
    pub off_peak_margin: SafetyMargin,
    /// Skip the speed probe entirely when nothing is streaming.
    pub skip_when_idle: bool,
    /// Settle time before reading the preference back after a write.
    pub verify_delay_ms: u64,
    /// Assumed usage of a remote stream that reports no bandwidth at all.
    pub stream_estimate_mbps: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            quality_table: QualityTable::default(),
            peak_window: PeakWindow::default(),
            peak_margin: SafetyMargin::PEAK_DEFAULT,
            off_peak_margin: SafetyMargin::OFF_PEAK_DEFAULT,
            skip_when_idle: true,
            verify_delay_ms: 1_000,
            stream_estimate_mbps: DEFAULT_STREAM_ESTIMATE_MBPS,
        }
    }
}

impl PolicyConfig {
    /// Checks the invariants serde cannot enforce on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.peak_window.validate()?;
        if !self.stream_estimate_mbps.is_finite() || self.stream_estimate_mbps < 0.0 {
            return Err(ConfigError::InvalidStreamEstimate(self.stream_estimate_mbps));
        }
        Ok(())
    }

    pub fn engine(&self) -> DecisionEngine {
        DecisionEngine::new(self.quality_table.clone())
    }

    pub fn clock(&self) -> PolicyClock {
        PolicyClock::new(self.peak_window, self.peak_margin, self.off_peak_margin)
    }

    pub fn verify_delay(&self) -> Duration {
        Duration::from_millis(self.verify_delay_ms)
    }
}
