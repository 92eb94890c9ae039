use std::time::Duration;

use tracing::{error, info, warn};

use crate::{
    Action, DecisionEngine, HourSource, PolicyClock, PolicyConfig, ProbeError, QualityDecision,
    RunError, ServerError, SessionSnapshot, StreamSample, Verification, reconcile, verify,
};

/// Media server side of a run: reachability, playback sessions and the
/// per-stream upload cap preference.
#[allow(async_fn_in_trait)]
pub trait MediaServer {
    async fn ping(&self) -> Result<(), ServerError>;
    async fn sessions(&self) -> Result<Vec<StreamSample>, ServerError>;
    /// `None` when the preference has never been set.
    async fn upload_cap(&self) -> Result<Option<u32>, ServerError>;
    async fn set_upload_cap(&self, kbps: u32) -> Result<(), ServerError>;
}

#[allow(async_fn_in_trait)]
pub trait SpeedProbe {
    async fn measure_upload_mbps(&self) -> Result<f64, ProbeError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Nothing is streaming, the probe was skipped.
    Idle,
    Unchanged {
        decision: QualityDecision,
    },
    Applied {
        decision: QualityDecision,
        previous_kbps: Option<u32>,
        verification: Verification,
    },
}

#[derive(Debug)]
pub struct Runner<S, P, H> {
    server: S,
    probe: P,
    hours: H,
    engine: DecisionEngine,
    clock: PolicyClock,
    skip_when_idle: bool,
    verify_delay: Duration,
    stream_estimate_mbps: f64,
}

impl<S, P, H> Runner<S, P, H>
where
    S: MediaServer,
    P: SpeedProbe,
    H: HourSource,
{
    pub fn new(config: &PolicyConfig, server: S, probe: P, hours: H) -> Self {
        Self {
            server,
            probe,
            hours,
            engine: config.engine(),
            clock: config.clock(),
            skip_when_idle: config.skip_when_idle,
            verify_delay: config.verify_delay(),
            stream_estimate_mbps: config.stream_estimate_mbps,
        }
    }

    pub fn server(&self) -> &S {
        &self.server
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    pub async fn run(&self) -> Result<RunOutcome, RunError> {
        self.server.ping().await.map_err(RunError::Connectivity)?;

        let table = self.engine.table();
        let current = self.current_quality().await;
        if let Some(kbps) = current {
            info!("current quality: {}", table.label_for(kbps));
        }

        info!("checking for active streams...");
        let snapshot = self.session_snapshot().await;
        if self.skip_when_idle && snapshot.is_idle() {
            info!("skipping speed test - no active streams");
            return Ok(RunOutcome::Idle);
        }

        let margin = self.clock.margin_for(self.hours.current_hour());
        let upload_mbps = self
            .probe
            .measure_upload_mbps()
            .await
            .map_err(RunError::Probe)?;

        let decision = self
            .engine
            .decide(upload_mbps, snapshot.remote_usage_mbps, margin);
        info!("recommended: {}", decision.target_label);

        let target = match reconcile(current, &decision) {
            Action::NoChange => {
                info!("quality already optimal");
                return Ok(RunOutcome::Unchanged { decision });
            }
            Action::Apply(target) => target,
        };

        let current_label = current
            .map(|kbps| table.label_for(kbps).into_owned())
            .unwrap_or_else(|| "unknown".to_string());
        info!(
            "changing from {current_label} to {}...",
            decision.target_label
        );
        self.server
            .set_upload_cap(target)
            .await
            .map_err(|error| RunError::Apply {
                target_kbps: target,
                error,
            })?;

        tokio::time::sleep(self.verify_delay).await;
        let readback = self.current_quality().await;
        let verification = verify(target, readback);
        match verification {
            Verification::Confirmed => info!("updated to {}", decision.target_label),
            Verification::Unconfirmed { observed } => warn!(
                "set to {target} but server reports {}",
                observed.map_or_else(|| "nothing".to_string(), |kbps| kbps.to_string())
            ),
        }

        Ok(RunOutcome::Applied {
            decision,
            previous_kbps: current,
            verification,
        })
    }

    async fn current_quality(&self) -> Option<u32> {
        match self.server.upload_cap().await {
            Ok(kbps) => kbps,
            Err(err) => {
                error!("could not get current quality: {err}");
                None
            }
        }
    }

    async fn session_snapshot(&self) -> SessionSnapshot {
        match self.server.sessions().await {
            Ok(samples) => SessionSnapshot::from_samples(&samples, self.stream_estimate_mbps),
            Err(err) => {
                warn!("could not get streaming sessions: {err}");
                SessionSnapshot::default()
            }
        }
    }
}
