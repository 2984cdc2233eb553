//! Maps `Box<dyn Error>` from trait boundaries to typed `LiftError`.
//!
//! The traits in `lift_traits` use `Box<dyn Error + Send + Sync>` so any
//! backend can plug in; this module converts those to our typed error enum,
//! with an optional feature-gated path for `lift_hardware::HwError`.

use crate::error::LiftError;

/// Map a trait-boundary error to a typed `LiftError`.
///
/// Known hardware error types are downcast first, then string heuristics
/// are applied.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> LiftError {
    #[cfg(feature = "hardware-errors")]
    {
        use lift_hardware::error::HwError;
        if let Some(hw) = e.downcast_ref::<HwError>() {
            return match hw {
                HwError::Store(msg) => LiftError::Storage(msg.clone()),
                HwError::Link(msg) => LiftError::Link(msg.clone()),
                other => LiftError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    let lower = s.to_lowercase();
    if lower.contains("store") || lower.contains("storage") {
        LiftError::Storage(s)
    } else if lower.contains("timeout") || lower.contains("checksum") {
        LiftError::Link(s)
    } else {
        LiftError::Hardware(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_errors_fall_back_to_heuristics() {
        let e = std::io::Error::other("bms reply timeout");
        assert!(matches!(map_hw_error(&e), LiftError::Link(_)));
        let e = std::io::Error::other("pin busy");
        assert!(matches!(map_hw_error(&e), LiftError::Hardware(_)));
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn hw_errors_are_downcast() {
        use lift_hardware::error::HwError;
        let e = HwError::Store("disk full".into());
        assert!(matches!(map_hw_error(&e), LiftError::Storage(m) if m == "disk full"));
        let e = HwError::Gpio("pin 5".into());
        assert!(matches!(map_hw_error(&e), LiftError::HardwareFault(_)));
    }
}
