use std::time::{Duration, Instant};

use bytes::Bytes;
use rand::RngCore;
use reqwest::{Client, header::CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use streamcap_core::ProbeError;
use tracing::info;

use crate::checked_mbps;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpUploadConfig {
    pub url: String,
    pub payload_bytes: usize,
    pub timeout_secs: u64,
}

impl Default for HttpUploadConfig {
    fn default() -> Self {
        Self {
            url: "https://speed.cloudflare.com/__up".to_string(),
            payload_bytes: 10_000_000,
            timeout_secs: 60,
        }
    }
}

/// Times a single POST of random bytes. Quicker and cruder than a full
/// speed test.
#[derive(Debug, Clone)]
pub struct HttpUpload {
    http: Client,
    config: HttpUploadConfig,
}

impl HttpUpload {
    pub fn new(config: HttpUploadConfig) -> Result<Self, ProbeError> {
        let http = Client::builder()
            .build()
            .map_err(|err| ProbeError::Launch(err.to_string()))?;
        Ok(Self { http, config })
    }

    pub async fn measure_upload_mbps(&self) -> Result<f64, ProbeError> {
        info!(
            "testing upload speed with {} byte POST to {}...",
            self.config.payload_bytes, self.config.url
        );
        let mut payload = vec![0_u8; self.config.payload_bytes];
        rand::rng().fill_bytes(&mut payload);
        let payload = Bytes::from(payload);
        let sent = payload.len();

        let started = Instant::now();
        let response = self
            .http
            .post(&self.config.url)
            .header(CONTENT_TYPE, "application/octet-stream")
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .body(payload)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    ProbeError::Timeout(self.config.timeout_secs)
                } else {
                    ProbeError::Failed(err.to_string())
                }
            })?;
        let elapsed = started.elapsed();

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Failed(format!(
                "upload endpoint answered with status {status}"
            )));
        }

        let mbps = throughput_mbps(sent, elapsed)?;
        info!("upload speed: {mbps:.2} Mbps");
        Ok(mbps)
    }
}

pub fn throughput_mbps(bytes: usize, elapsed: Duration) -> Result<f64, ProbeError> {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return Err(ProbeError::Output("upload finished in zero time".to_string()));
    }
    checked_mbps(bytes as f64 * 8.0 / secs / 1_000_000.0)
}
