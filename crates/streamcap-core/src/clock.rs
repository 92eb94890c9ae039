use chrono::Timelike;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ConfigError;

/// Fraction of measured upload considered safe to hand out to streams.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SafetyMargin(f64);

impl SafetyMargin {
    pub const PEAK_DEFAULT: Self = Self(0.50);
    pub const OFF_PEAK_DEFAULT: Self = Self(0.65);

    pub fn new(fraction: f64) -> Result<Self, ConfigError> {
        if fraction > 0.0 && fraction <= 1.0 {
            Ok(Self(fraction))
        } else {
            Err(ConfigError::InvalidSafetyMargin(fraction))
        }
    }

    pub fn fraction(self) -> f64 {
        self.0
    }

    pub fn percent(self) -> u32 {
        (self.0 * 100.0).round() as u32
    }
}

impl TryFrom<f64> for SafetyMargin {
    type Error = ConfigError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SafetyMargin> for f64 {
    fn from(margin: SafetyMargin) -> Self {
        margin.0
    }
}

/// Same-day hour range, inclusive of both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl Default for PeakWindow {
    fn default() -> Self {
        Self {
            start_hour: 17,
            end_hour: 23,
        }
    }
}

impl PeakWindow {
    pub fn new(start_hour: u32, end_hour: u32) -> Result<Self, ConfigError> {
        let window = Self {
            start_hour,
            end_hour,
        };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for hour in [self.start_hour, self.end_hour] {
            if hour > 23 {
                return Err(ConfigError::InvalidHour(hour));
            }
        }
        if self.start_hour > self.end_hour {
            return Err(ConfigError::WrappingPeakWindow {
                start_hour: self.start_hour,
                end_hour: self.end_hour,
            });
        }
        Ok(())
    }

    pub fn contains(&self, hour: u32) -> bool {
        self.start_hour <= hour && hour <= self.end_hour
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyClock {
    window: PeakWindow,
    peak: SafetyMargin,
    off_peak: SafetyMargin,
}

impl PolicyClock {
    pub fn new(window: PeakWindow, peak: SafetyMargin, off_peak: SafetyMargin) -> Self {
        Self {
            window,
            peak,
            off_peak,
        }
    }

    pub fn margin_for(&self, hour: u32) -> SafetyMargin {
        if self.window.contains(hour) {
            info!("peak hours - using {}% safety margin", self.peak.percent());
            self.peak
        } else {
            info!("off-peak - using {}% safety margin", self.off_peak.percent());
            self.off_peak
        }
    }
}

pub trait HourSource {
    fn current_hour(&self) -> u32;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl HourSource for LocalClock {
    fn current_hour(&self) -> u32 {
        chrono::Local::now().hour()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedHour(pub u32);

impl HourSource for FixedHour {
    fn current_hour(&self) -> u32 {
        self.0
    }
}
