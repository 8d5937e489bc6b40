//! Override precedence: waypoint value, else mission value, else built-in default.

use crate::models::non_zero;

/// The three layers a per-waypoint setting can come from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layered<T> {
    pub waypoint: Option<T>,
    pub global: Option<T>,
    pub default: T,
}

impl<T: Copy + PartialEq> Layered<T> {
    pub fn new(waypoint: Option<T>, global: Option<T>, default: T) -> Self {
        Self {
            waypoint,
            global,
            default,
        }
    }

    /// The value the waypoint flies with.
    pub fn effective(&self) -> T {
        resolve(self.waypoint, self.global, self.default)
    }

    /// The mission-wide value every waypoint inherits.
    pub fn global_effective(&self) -> T {
        self.global.unwrap_or(self.default)
    }

    /// Whether the waypoint's effective value differs from the inherited one.
    pub fn is_override(&self) -> bool {
        self.effective() != self.global_effective()
    }
}

impl Layered<f64> {
    /// Numeric layers, where a request value of `0` means "not set" and falls through.
    pub fn numeric(waypoint: Option<f64>, global: Option<f64>, default: f64) -> Self {
        Self::new(non_zero(waypoint), non_zero(global), default)
    }
}

/// Resolve one setting: waypoint > global > built-in default.
pub fn resolve<T>(waypoint: Option<T>, global: Option<T>, default: T) -> T {
    waypoint.or(global).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::TurnMode;

    #[test]
    fn test_waypoint_beats_global_beats_default() {
        assert_eq!(resolve(Some(3.0), Some(5.0), 10.0), 3.0);
        assert_eq!(resolve(None, Some(5.0), 10.0), 5.0);
        assert_eq!(resolve(None, None, 10.0), 10.0);
        assert_eq!(resolve(Some(3.0), None, 10.0), 3.0);
    }

    #[test]
    fn override_only_when_value_differs() {
        let same = Layered::new(Some(5.0), Some(5.0), 10.0);
        assert_eq!(same.effective(), 5.0);
        assert!(!same.is_override());

        let inherited = Layered::new(None, Some(5.0), 10.0);
        assert!(!inherited.is_override());

        let differs = Layered::new(Some(TurnMode::CoordinateTurn), None, TurnMode::ToPointAndStopWithDiscontinuityCurvature);
        assert_eq!(differs.effective(), TurnMode::CoordinateTurn);
        assert_eq!(differs.global_effective(), TurnMode::ToPointAndStopWithDiscontinuityCurvature);
        assert!(differs.is_override());
    }

    #[test]
    fn zero_numbers_fall_through_to_the_next_layer() {
        let speed = Layered::numeric(Some(0.0), Some(6.0), 10.0);
        assert_eq!(speed.effective(), 6.0);
        assert!(!speed.is_override());
        assert_eq!(Layered::numeric(Some(0.0), Some(0.0), 10.0).effective(), 10.0);
        assert_eq!(Layered::numeric(Some(2.0), Some(0.0), 10.0).effective(), 2.0);
    }
}
