use tracing::info;

use crate::{QualityTable, SafetyMargin};

#[derive(Debug, Clone, PartialEq)]
pub struct QualityDecision {
    pub target_capacity_kbps: u32,
    pub target_label: String,
    pub usable_mbps: f64,
    pub available_mbps: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionEngine {
    table: QualityTable,
}

impl DecisionEngine {
    pub fn new(table: QualityTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &QualityTable {
        &self.table
    }

    /// Picks the tier for the bandwidth left after the safety margin and
    /// current remote usage. When remote usage eats the whole margined
    /// capacity the usable figure is looked up instead.
    pub fn decide(
        &self,
        upload_mbps: f64,
        remote_usage_mbps: f64,
        margin: SafetyMargin,
    ) -> QualityDecision {
        let usable_mbps = upload_mbps * margin.fraction();
        let available_mbps = usable_mbps - remote_usage_mbps;
        info!(
            "upload: {upload_mbps:.2} Mbps | usable ({}%): {usable_mbps:.2} Mbps | available: {available_mbps:.2} Mbps",
            margin.percent()
        );

        let bandwidth = if available_mbps > 0.0 {
            available_mbps
        } else {
            usable_mbps
        };
        let tier = self.table.lookup(bandwidth);

        QualityDecision {
            target_capacity_kbps: tier.capacity_kbps,
            target_label: tier.label.clone(),
            usable_mbps,
            available_mbps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> DecisionEngine {
        DecisionEngine::new(QualityTable::default())
    }

    fn margin(fraction: f64) -> SafetyMargin {
        SafetyMargin::new(fraction).unwrap()
    }

    #[test]
    fn peak_margin_without_remote_usage() {
        let decision = engine().decide(20.0, 0.0, margin(0.50));
        assert_eq!(decision.usable_mbps, 10.0);
        assert_eq!(decision.available_mbps, 10.0);
        assert_eq!(decision.target_capacity_kbps, 8_000);
        assert_eq!(decision.target_label, "8 Mbps 1080p");
    }

    #[test]
    fn off_peak_margin_subtracts_remote_usage() {
        let decision = engine().decide(30.0, 5.0, margin(0.65));
        assert!((decision.usable_mbps - 19.5).abs() < 1e-9);
        assert!((decision.available_mbps - 14.5).abs() < 1e-9);
        assert_eq!(decision.target_capacity_kbps, 10_000);
        assert_eq!(decision.target_label, "10 Mbps 1080p");
    }

    #[test]
    fn exhausted_capacity_falls_back_to_usable() {
        let decision = engine().decide(5.0, 10.0, margin(0.5));
        assert_eq!(decision.usable_mbps, 2.5);
        assert_eq!(decision.available_mbps, -7.5);
        assert_eq!(decision.target_capacity_kbps, 3_000);
    }

    #[test]
    fn fallback_uses_usable_rather_than_floor() {
        // usable 12.5 is fully consumed by 14 Mbps of remote streams
        let decision = engine().decide(25.0, 14.0, margin(0.5));
        assert!(decision.available_mbps < 0.0);
        assert_eq!(decision.target_capacity_kbps, 8_000);
    }

    #[test]
    fn zero_or_negative_upload_degrades_to_floor() {
        for upload in [0.0, -4.0] {
            let decision = engine().decide(upload, 0.0, margin(0.65));
            assert_eq!(decision.target_capacity_kbps, 3_000);
        }
    }

    #[test]
    fn identical_inputs_give_identical_decisions() {
        let engine = engine();
        let first = engine.decide(42.3, 3.1, margin(0.65));
        for _ in 0..10 {
            assert_eq!(engine.decide(42.3, 3.1, margin(0.65)), first);
        }
    }

    #[test]
    fn target_is_monotonic_in_upload_without_remote_usage() {
        let engine = engine();
        for fraction in [0.5, 0.65, 1.0] {
            let mut last = 0;
            for step in 0..=800 {
                let upload = step as f64 * 0.1;
                let target = engine
                    .decide(upload, 0.0, margin(fraction))
                    .target_capacity_kbps;
                assert!(target >= last, "upload {upload} dropped to {target}");
                last = target;
            }
        }
    }

    #[test]
    fn target_is_monotonic_once_remote_usage_is_covered() {
        let engine = engine();
        let remote = 4.0;
        let mut last = 0;
        // 0.5 * 8.1 already exceeds the remote usage, so available stays positive
        for step in 81..=800 {
            let upload = step as f64 * 0.1;
            let target = engine
                .decide(upload, remote, margin(0.5))
                .target_capacity_kbps;
            assert!(target >= last, "upload {upload} dropped to {target}");
            last = target;
        }
    }
}
