use crate::QualityDecision;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    NoChange,
    Apply(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Confirmed,
    Unconfirmed { observed: Option<u32> },
}

pub fn reconcile(current_kbps: Option<u32>, decision: &QualityDecision) -> Action {
    match current_kbps {
        Some(current) if current == decision.target_capacity_kbps => Action::NoChange,
        _ => Action::Apply(decision.target_capacity_kbps),
    }
}

pub fn verify(target_kbps: u32, readback_kbps: Option<u32>) -> Verification {
    if readback_kbps == Some(target_kbps) {
        Verification::Confirmed
    } else {
        Verification::Unconfirmed {
            observed: readback_kbps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(target: u32) -> QualityDecision {
        QualityDecision {
            target_capacity_kbps: target,
            target_label: String::new(),
            usable_mbps: 0.0,
            available_mbps: 0.0,
        }
    }

    #[test]
    fn matching_current_needs_no_change() {
        assert_eq!(reconcile(Some(12_000), &decision(12_000)), Action::NoChange);
    }

    #[test]
    fn differing_current_is_applied() {
        assert_eq!(
            reconcile(Some(8_000), &decision(20_000)),
            Action::Apply(20_000)
        );
    }

    #[test]
    fn unknown_current_is_always_applied() {
        assert_eq!(reconcile(None, &decision(3_000)), Action::Apply(3_000));
    }

    #[test]
    fn readback_classification() {
        assert_eq!(verify(8_000, Some(8_000)), Verification::Confirmed);
        assert_eq!(
            verify(8_000, Some(4_000)),
            Verification::Unconfirmed {
                observed: Some(4_000)
            }
        );
        assert_eq!(
            verify(8_000, None),
            Verification::Unconfirmed { observed: None }
        );
    }
}
