use std::{process::Stdio, time::Duration};

use serde::{Deserialize, Serialize};
use streamcap_core::ProbeError;
use tokio::process::Command;
use tracing::info;

use crate::checked_mbps;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedtestCliConfig {
    pub program: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for SpeedtestCliConfig {
    fn default() -> Self {
        Self {
            program: "speedtest-cli".to_string(),
            args: vec!["--json".to_string(), "--no-download".to_string()],
            timeout_secs: 120,
        }
    }
}

/// Runs an external speed test and reads the upload figure from its JSON
/// report.
#[derive(Debug, Clone)]
pub struct SpeedtestCli {
    config: SpeedtestCliConfig,
}

impl SpeedtestCli {
    pub fn new(config: SpeedtestCliConfig) -> Self {
        Self { config }
    }

    pub async fn measure_upload_mbps(&self) -> Result<f64, ProbeError> {
        info!("testing upload speed (this may take 30-60 seconds)...");
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(
            Duration::from_secs(self.config.timeout_secs),
            cmd.output(),
        )
        .await
        .map_err(|_| ProbeError::Timeout(self.config.timeout_secs))?
        .map_err(|err| ProbeError::Launch(format!("{}: {err}", self.config.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProbeError::Failed(format!(
                "{} exited with {}: {}",
                self.config.program,
                output.status,
                stderr.trim()
            )));
        }

        let mbps = parse_speedtest_json(&output.stdout)?;
        info!("upload speed: {mbps:.2} Mbps");
        Ok(mbps)
    }
}

#[derive(Debug, Deserialize)]
struct SpeedtestReport {
    upload: UploadField,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UploadField {
    /// `speedtest-cli --json`: bits per second.
    BitsPerSecond(f64),
    /// Ookla `speedtest --format=json`: bytes per second.
    Ookla { bandwidth: f64 },
}

/// Upload speed in Mbps from either speedtest-cli or Ookla JSON output.
pub fn parse_speedtest_json(stdout: &[u8]) -> Result<f64, ProbeError> {
    let report: SpeedtestReport =
        serde_json::from_slice(stdout).map_err(|err| ProbeError::Output(err.to_string()))?;
    let bits_per_second = match report.upload {
        UploadField::BitsPerSecond(bps) => bps,
        UploadField::Ookla { bandwidth } => bandwidth * 8.0,
    };
    checked_mbps(bits_per_second / 1_000_000.0)
}
