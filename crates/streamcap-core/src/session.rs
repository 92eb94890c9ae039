use tracing::info;

pub const DEFAULT_STREAM_ESTIMATE_MBPS: f64 = 3.0;

/// One active playback as reported by the media server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSample {
    pub local: bool,
    /// Bandwidth the server says the session is using right now.
    pub session_bandwidth_kbps: Option<u32>,
    /// Nominal bitrate of the media being played.
    pub media_bitrate_kbps: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandwidthSource {
    Local,
    Session,
    Media,
    Estimated,
}

impl StreamSample {
    pub fn remote_usage(&self, estimate_mbps: f64) -> (f64, BandwidthSource) {
        if self.local {
            return (0.0, BandwidthSource::Local);
        }
        if let Some(kbps) = self.session_bandwidth_kbps {
            return (kbps as f64 / 1000.0, BandwidthSource::Session);
        }
        if let Some(kbps) = self.media_bitrate_kbps {
            return (kbps as f64 / 1000.0, BandwidthSource::Media);
        }
        (estimate_mbps, BandwidthSource::Estimated)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SessionSnapshot {
    pub active_stream_count: usize,
    pub remote_usage_mbps: f64,
}

impl SessionSnapshot {
    pub fn from_samples(samples: &[StreamSample], estimate_mbps: f64) -> Self {
        if samples.is_empty() {
            info!("no active streams");
            return Self::default();
        }
        info!("active streams: {}", samples.len());

        let mut remote_usage_mbps = 0.0;
        for sample in samples {
            let (mbps, source) = sample.remote_usage(estimate_mbps);
            match source {
                BandwidthSource::Local => info!("  session: local (skipped)"),
                BandwidthSource::Session => {
                    info!("  remote session: {mbps:.2} Mbps (actual bandwidth)")
                }
                BandwidthSource::Media => info!("  remote session: {mbps:.2} Mbps (media bitrate)"),
                BandwidthSource::Estimated => info!("  remote session: {mbps:.2} Mbps (estimated)"),
            }
            remote_usage_mbps += mbps;
        }

        Self {
            active_stream_count: samples.len(),
            remote_usage_mbps,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.active_stream_count == 0
    }
}
