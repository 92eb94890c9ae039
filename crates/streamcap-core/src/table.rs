use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityTier {
    pub min_upload_mbps: f64,
    pub capacity_kbps: u32,
    pub label: String,
}

impl QualityTier {
    pub fn new(min_upload_mbps: f64, capacity_kbps: u32, label: impl Into<String>) -> Self {
        Self {
            min_upload_mbps,
            capacity_kbps,
            label: label.into(),
        }
    }
}

/// Tiers ordered by strictly descending threshold, terminated by a
/// zero-threshold floor. Construction enforces the ordering, so lookups
/// never fail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<QualityTier>", into = "Vec<QualityTier>")]
pub struct QualityTable {
    upper: Vec<QualityTier>,
    floor: QualityTier,
}

impl QualityTable {
    pub fn new(tiers: Vec<QualityTier>) -> Result<Self, ConfigError> {
        let mut previous: Option<f64> = None;
        for tier in &tiers {
            if !tier.min_upload_mbps.is_finite() || tier.min_upload_mbps < 0.0 {
                return Err(ConfigError::InvalidThreshold {
                    label: tier.label.clone(),
                    threshold: tier.min_upload_mbps,
                });
            }
            if let Some(prev) = previous {
                if tier.min_upload_mbps >= prev {
                    return Err(ConfigError::UnorderedTiers {
                        label: tier.label.clone(),
                    });
                }
            }
            previous = Some(tier.min_upload_mbps);
        }

        let mut upper = tiers;
        let floor = upper.pop().ok_or(ConfigError::EmptyQualityTable)?;
        if floor.min_upload_mbps != 0.0 {
            return Err(ConfigError::MissingFloorTier {
                threshold: floor.min_upload_mbps,
            });
        }
        Ok(Self { upper, floor })
    }

    /// Highest-capacity tier whose threshold is at most `bandwidth_mbps`.
    /// Anything below every threshold (NaN and negatives included) lands
    /// on the floor.
    pub fn lookup(&self, bandwidth_mbps: f64) -> &QualityTier {
        self.upper
            .iter()
            .find(|tier| bandwidth_mbps >= tier.min_upload_mbps)
            .unwrap_or(&self.floor)
    }

    pub fn floor(&self) -> &QualityTier {
        &self.floor
    }

    pub fn tiers(&self) -> impl Iterator<Item = &QualityTier> {
        self.upper.iter().chain(std::iter::once(&self.floor))
    }

    pub fn label_for(&self, capacity_kbps: u32) -> Cow<'_, str> {
        self.tiers()
            .find(|tier| tier.capacity_kbps == capacity_kbps)
            .map(|tier| Cow::Borrowed(tier.label.as_str()))
            .unwrap_or_else(|| Cow::Owned(format!("{capacity_kbps} kbps")))
    }
}

impl Default for QualityTable {
    fn default() -> Self {
        Self {
            upper: vec![
                QualityTier::new(25.0, 20_000, "20 Mbps 1080p"),
                QualityTier::new(18.0, 12_000, "12 Mbps 1080p"),
                QualityTier::new(13.0, 10_000, "10 Mbps 1080p"),
                QualityTier::new(10.0, 8_000, "8 Mbps 1080p"),
                QualityTier::new(7.0, 4_000, "4 Mbps 720p"),
            ],
            floor: QualityTier::new(0.0, 3_000, "3 Mbps 720p"),
        }
    }
}

impl TryFrom<Vec<QualityTier>> for QualityTable {
    type Error = ConfigError;

    fn try_from(tiers: Vec<QualityTier>) -> Result<Self, Self::Error> {
        Self::new(tiers)
    }
}

impl From<QualityTable> for Vec<QualityTier> {
    fn from(table: QualityTable) -> Self {
        let mut tiers = table.upper;
        tiers.push(table.floor);
        tiers
    }
}
