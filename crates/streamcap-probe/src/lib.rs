#![forbid(unsafe_code)]

mod http;
mod speedtest;

use serde::{Deserialize, Serialize};
use streamcap_core::{ProbeError, SpeedProbe};

pub use http::{HttpUpload, HttpUploadConfig, throughput_mbps};
pub use speedtest::{SpeedtestCli, SpeedtestCliConfig, parse_speedtest_json};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeConfig {
    Speedtest(SpeedtestCliConfig),
    Http(HttpUploadConfig),
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self::Speedtest(SpeedtestCliConfig::default())
    }
}

impl ProbeConfig {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Speedtest(_) => "speedtest",
            Self::Http(_) => "http",
        }
    }
}

#[derive(Debug)]
pub enum Probe {
    Speedtest(SpeedtestCli),
    Http(HttpUpload),
}

impl Probe {
    pub fn from_config(config: &ProbeConfig) -> Result<Self, ProbeError> {
        Ok(match config {
            ProbeConfig::Speedtest(cli) => Self::Speedtest(SpeedtestCli::new(cli.clone())),
            ProbeConfig::Http(http) => Self::Http(HttpUpload::new(http.clone())?),
        })
    }
}

impl SpeedProbe for Probe {
    async fn measure_upload_mbps(&self) -> Result<f64, ProbeError> {
        match self {
            Self::Speedtest(probe) => probe.measure_upload_mbps().await,
            Self::Http(probe) => probe.measure_upload_mbps().await,
        }
    }
}

/// Rejects readings no decision should be based on.
fn checked_mbps(mbps: f64) -> Result<f64, ProbeError> {
    if mbps.is_finite() && mbps > 0.0 {
        Ok(mbps)
    } else {
        Err(ProbeError::Output(format!("implausible upload speed {mbps}")))
    }
}
