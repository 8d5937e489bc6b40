//! Numeric limits and built-in defaults for waypoint missions.

use crate::enums::{ClimbMode, FinishAction, GimbalPitchMode, HeadingMode, HeightMode, TurnMode};
use serde::{Deserialize, Serialize};

/// Inclusive numeric range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Limit {
    pub min: f64,
    pub max: f64,
}

impl Limit {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

/// Configuration for mission constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionRules {
    pub name_length: (usize, usize),
    pub description_max_length: usize,
    pub latitude: Limit,
    pub longitude: Limit,
    /// Global height in meters
    pub global_height: Limit,
    /// Per-waypoint height in meters
    pub waypoint_height: Limit,
    /// Cruise and transitional speed in m/s
    pub speed: Limit,
    /// Take-off security height in meters
    pub safe_height: Limit,
    /// Return-to-home height in meters
    pub rth_height: Limit,
    pub max_payload_position_index: u32,
    pub defaults: MissionDefaults,
}

impl Default for MissionRules {
    fn default() -> Self {
        Self {
            name_length: (1, 100),
            description_max_length: 500,
            latitude: Limit::new(-90.0, 90.0),
            longitude: Limit::new(-180.0, 180.0),
            global_height: Limit::new(5.0, 1500.0),
            waypoint_height: Limit::new(5.0, 500.0),
            speed: Limit::new(1.0, 15.0),
            safe_height: Limit::new(20.0, 200.0),
            rth_height: Limit::new(20.0, 1500.0),
            max_payload_position_index: 2,
            defaults: MissionDefaults::default(),
        }
    }
}

/// Values used when neither the waypoint nor the mission sets a field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionDefaults {
    pub global_height: f64,
    pub speed: f64,
    pub transitional_speed: f64,
    pub safe_height: f64,
    pub rth_height: f64,
    pub height_mode: HeightMode,
    pub finish_action: FinishAction,
    pub climb_mode: ClimbMode,
    pub heading_mode: HeadingMode,
    pub gimbal_pitch_mode: GimbalPitchMode,
    pub turn_mode: TurnMode,
    pub use_straight_line: bool,
    pub turn_damping_dist: f64,
}

impl Default for MissionDefaults {
    fn default() -> Self {
        Self {
            global_height: 100.0,
            speed: 10.0,
            transitional_speed: 10.0,
            safe_height: 20.0,
            rth_height: 100.0,
            height_mode: HeightMode::RelativeToStartPoint,
            finish_action: FinishAction::GoHome,
            climb_mode: ClimbMode::Vertical,
            heading_mode: HeadingMode::FollowWayline,
            gimbal_pitch_mode: GimbalPitchMode::Manual,
            turn_mode: TurnMode::ToPointAndStopWithDiscontinuityCurvature,
            use_straight_line: true,
            turn_damping_dist: 0.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_is_inclusive_and_rejects_nan() {
        let limit = Limit::new(5.0, 500.0);
        assert!(limit.contains(5.0));
        assert!(limit.contains(500.0));
        assert!(!limit.contains(4.99));
        assert!(!limit.contains(f64::NAN));
    }

    #[test]
    fn defaults_sit_inside_their_limits() {
        let rules = MissionRules::default();
        assert!(rules.global_height.contains(rules.defaults.global_height));
        assert!(rules.speed.contains(rules.defaults.speed));
        assert!(rules.speed.contains(rules.defaults.transitional_speed));
        assert!(rules.safe_height.contains(rules.defaults.safe_height));
        assert!(rules.rth_height.contains(rules.defaults.rth_height));
    }
}
