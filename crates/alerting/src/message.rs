//! Alert message composition

use hazard::{ClassifiedDetection, RiskTier};

/// Spoken warning for a classified detection, `None` when it is safe.
///
/// `danger_emphasis` repeats the label of non-person dangers (at least once).
pub fn compose(detection: &ClassifiedDetection, danger_emphasis: usize) -> Option<String> {
    let message = match (detection.is_person(), detection.tier) {
        (_, RiskTier::Safe) => return None,
        (true, RiskTier::Caution) => "Caution! Person ahead".to_string(),
        (true, RiskTier::Danger) => "Alert! Person very close".to_string(),
        (false, RiskTier::Caution) => format!("Warning! {} ahead", detection.label()),
        (false, RiskTier::Danger) => {
            let label = detection.label();
            let repeated = vec![label; danger_emphasis.max(1)].join(" ");
            format!("Danger! {}", repeated)
        }
    };
    Some(message)
}
