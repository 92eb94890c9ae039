#![forbid(unsafe_code)]

//! Upload-capacity driven bitrate ceiling for a media server's remote
//! streams: tier table, peak/off-peak margin, decision, reconciliation and
//! the per-invocation run sequence over abstract collaborators.

mod clock;
mod config;
mod engine;
mod error;
mod reconcile;
mod run;
mod session;
mod table;

pub use clock::{FixedHour, HourSource, LocalClock, PeakWindow, PolicyClock, SafetyMargin};
pub use config::PolicyConfig;
pub use engine::{DecisionEngine, QualityDecision};
pub use error::{ConfigError, ProbeError, RunError, ServerError};
pub use reconcile::{Action, Verification, reconcile, verify};
pub use run::{MediaServer, RunOutcome, Runner, SpeedProbe};
pub use session::{BandwidthSource, DEFAULT_STREAM_ESTIMATE_MBPS, SessionSnapshot, StreamSample};
pub use table::{QualityTable, QualityTier};
