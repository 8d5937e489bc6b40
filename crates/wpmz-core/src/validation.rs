//! Mission request validation.
//!
//! Every field and waypoint is checked in one pass and all violations are
//! returned together, so a user-authored mission can be fixed in one go.
//! Optional numbers set to `0` count as unset and are not range-checked.

use crate::actions::{check_request, EncodingError};
use crate::enums::{
    ClimbMode, DroneModel, FinishAction, GimbalPitchMode, HeadingMode, HeightMode, PayloadModel,
    PhotoLens, TemplateType, TriggerType, TurnMode, UnknownVariant,
};
use crate::models::{non_zero, Waylines, Waypoint};
use crate::rules::{Limit, MissionRules};
use std::fmt;
use std::str::FromStr;

/// The rule a field broke.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Required,
    Length { min: usize, max: usize, actual: usize },
    Range { min: f64, max: f64, actual: f64 },
    NonNegative { actual: f64 },
    OneOf { value: String, allowed: &'static [&'static str] },
    Incompatible { reason: String },
    Action(EncodingError),
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constraint::Required => write!(f, "is required"),
            Constraint::Length { min, max, actual } => {
                write!(f, "length {actual} is outside {min}..={max}")
            }
            Constraint::Range { min, max, actual } => {
                write!(f, "value {actual} is outside {min}..={max}")
            }
            Constraint::NonNegative { actual } => write!(f, "value {actual} must not be negative"),
            Constraint::OneOf { value, allowed } => {
                write!(f, "'{value}' is not one of: {}", allowed.join(", "))
            }
            Constraint::Incompatible { reason } => f.write_str(reason),
            Constraint::Action(err) => write!(f, "{err}"),
        }
    }
}

/// A single constraint violation, located by a field path such as
/// `waypoints[2].actions[0].hoverTime`.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub field: String,
    pub constraint: Constraint,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.constraint)
    }
}

/// All violations found in a mission request, in field order.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{}", format_violations(.violations))]
pub struct ValidationErrors {
    pub violations: Vec<Violation>,
}

impl ValidationErrors {
    /// Whether any violation is reported for `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }
}

fn format_violations(violations: &[Violation]) -> String {
    let mut out = format!("{} validation error(s)", violations.len());
    for violation in violations {
        out.push_str("\n  ");
        out.push_str(&violation.to_string());
    }
    out
}

/// Validate a mission request against the default rules.
pub fn validate(waylines: &Waylines) -> Result<(), ValidationErrors> {
    validate_with(waylines, &MissionRules::default())
}

pub fn validate_with(waylines: &Waylines, rules: &MissionRules) -> Result<(), ValidationErrors> {
    let mut check = Checker::default();

    let name_len = waylines.name.trim().chars().count();
    let (min_len, max_len) = rules.name_length;
    if name_len < min_len || name_len > max_len {
        check.push(
            "name",
            Constraint::Length {
                min: min_len,
                max: max_len,
                actual: name_len,
            },
        );
    }
    if let Some(description) = &waylines.description {
        let len = description.chars().count();
        if len > rules.description_max_length {
            check.push(
                "description",
                Constraint::Length {
                    min: 0,
                    max: rules.description_max_length,
                    actual: len,
                },
            );
        }
    }

    let drone = check.one_of::<DroneModel>("drone_model", &waylines.drone_model);
    let payload = check.one_of::<PayloadModel>("payload_model", &waylines.payload_model);
    if let (Some(drone), Some(payload)) = (drone, payload) {
        if !payload.fits(drone) {
            check.push(
                "payload_model",
                Constraint::Incompatible {
                    reason: format!("payload {payload} cannot be flown on {drone}"),
                },
            );
        }
    }
    if let Some(index) = waylines.payload_position_index {
        if index > rules.max_payload_position_index {
            check.push(
                "payload_position_index",
                Constraint::Range {
                    min: 0.0,
                    max: rules.max_payload_position_index as f64,
                    actual: index as f64,
                },
            );
        }
    }
    check.one_of::<TemplateType>("template_type", &waylines.template_type);

    check.range("global_height", waylines.global_height, rules.global_height);
    check.range("global_speed", waylines.global_speed, rules.speed);
    check.range("global_transitional_speed", waylines.global_transitional_speed, rules.speed);
    check.range("safe_height", waylines.safe_height, rules.safe_height);
    check.range("global_rth_height", waylines.global_rth_height, rules.rth_height);
    check.non_negative("global_turn_damping_dist", waylines.global_turn_damping_dist);

    for (i, lens) in waylines.photo_settings.iter().enumerate() {
        check.one_of::<PhotoLens>(&format!("photo_settings[{i}]"), lens);
    }

    let height_mode = check.optional_one_of::<HeightMode>("height_type", &waylines.height_type);
    check.optional_one_of::<FinishAction>("finish_action", &waylines.finish_action);
    check.optional_one_of::<ClimbMode>("climb_mode", &waylines.climb_mode);
    check.optional_one_of::<HeadingMode>("aircraft_yaw_mode", &waylines.aircraft_yaw_mode);
    check.optional_one_of::<GimbalPitchMode>("gimbal_pitch_mode", &waylines.gimbal_pitch_mode);
    check.optional_one_of::<TurnMode>("global_waypoint_turn_mode", &waylines.global_waypoint_turn_mode);

    match waylines.take_off_ref_point() {
        Some(point) => {
            check.range("take_off_ref_point_latitude", Some(point.latitude), rules.latitude);
            check.range("take_off_ref_point_longitude", Some(point.longitude), rules.longitude);
            check.finite("take_off_ref_point_height", Some(point.height));
            check.finite("take_off_ref_point_agl_height", point.agl_height);
        }
        None => {
            let mode = height_mode.unwrap_or(rules.defaults.height_mode);
            if mode.requires_take_off_ref_point() {
                check.push("take_off_ref_point_latitude", Constraint::Required);
            }
        }
    }

    if waylines.waypoints.is_empty() {
        check.push("waypoints", Constraint::Required);
    }
    let last = waylines.waypoints.len().saturating_sub(1);
    for (i, waypoint) in waylines.waypoints.iter().enumerate() {
        check_waypoint(&mut check, rules, i, i == last, waypoint);
    }

    check.finish()
}

fn check_waypoint(check: &mut Checker, rules: &MissionRules, i: usize, is_last: bool, waypoint: &Waypoint) {
    let field = |name: &str| format!("waypoints[{i}].{name}");

    check.range(&field("latitude"), Some(waypoint.latitude), rules.latitude);
    check.range(&field("longitude"), Some(waypoint.longitude), rules.longitude);
    check.range(&field("height"), Some(waypoint.height), rules.waypoint_height);
    check.range(&field("speed"), waypoint.speed, rules.speed);
    check.optional_one_of::<TurnMode>(&field("waypoint_turn_mode"), &waypoint.waypoint_turn_mode);
    check.non_negative(&field("turn_damping_dist"), waypoint.turn_damping_dist);

    let trigger = check.optional_one_of::<TriggerType>(&field("trigger_type"), &waypoint.trigger_type);
    check.non_negative(&field("trigger_param"), waypoint.trigger_param);
    if let Some(trigger) = trigger {
        if trigger.takes_param() {
            if non_zero(waypoint.trigger_param).is_none() {
                check.push(&field("trigger_param"), Constraint::Required);
            }
        }
        if trigger == TriggerType::BetweenAdjacentPoints && is_last {
            check.push(
                &field("trigger_type"),
                Constraint::Incompatible {
                    reason: "betweenAdjacentPoints needs a following waypoint".to_string(),
                },
            );
        }
    }

    for (j, request) in waypoint.actions.iter().enumerate() {
        let Err(errors) = check_request(request) else {
            continue;
        };
        for err in errors {
            let path = match err.parameter() {
                Some(parameter) => format!("waypoints[{i}].actions[{j}].{parameter}"),
                None => format!("waypoints[{i}].actions[{j}].type"),
            };
            check.push(&path, Constraint::Action(err));
        }
    }
}

#[derive(Default)]
struct Checker {
    violations: Vec<Violation>,
}

impl Checker {
    fn push(&mut self, field: &str, constraint: Constraint) {
        self.violations.push(Violation {
            field: field.to_string(),
            constraint,
        });
    }

    /// Checks an optional number; `Some(0.0)` is treated as unset.
    fn range(&mut self, field: &str, value: Option<f64>, limit: Limit) {
        if let Some(actual) = non_zero(value) {
            if !limit.contains(actual) {
                self.push(
                    field,
                    Constraint::Range {
                        min: limit.min,
                        max: limit.max,
                        actual,
                    },
                );
            }
        }
    }

    fn non_negative(&mut self, field: &str, value: Option<f64>) {
        if let Some(actual) = non_zero(value) {
            if !(actual.is_finite() && actual >= 0.0) {
                self.push(field, Constraint::NonNegative { actual });
            }
        }
    }

    fn finite(&mut self, field: &str, value: Option<f64>) {
        if let Some(actual) = value {
            if !actual.is_finite() {
                self.push(
                    field,
                    Constraint::Range {
                        min: f64::MIN,
                        max: f64::MAX,
                        actual,
                    },
                );
            }
        }
    }

    fn one_of<T: FromStr<Err = UnknownVariant>>(&mut self, field: &str, value: &str) -> Option<T> {
        match value.parse::<T>() {
            Ok(variant) => Some(variant),
            Err(err) => {
                self.push(
                    field,
                    Constraint::OneOf {
                        value: err.value,
                        allowed: err.allowed,
                    },
                );
                None
            }
        }
    }

    fn optional_one_of<T: FromStr<Err = UnknownVariant>>(&mut self, field: &str, value: &Option<String>) -> Option<T> {
        value.as_deref().and_then(|v| self.one_of(field, v))
    }

    fn finish(self) -> Result<(), ValidationErrors> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors {
                violations: self.violations,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ActionRequest;

    fn mission() -> Waylines {
        Waylines::new(
            "survey",
            "M30T",
            "M30T",
            vec![Waypoint::new(39.9042, 116.4074, 50.0), Waypoint::new(39.9052, 116.4084, 60.0)],
        )
    }

    #[test]
    fn test_valid_mission_passes() {
        assert!(validate(&mission()).is_ok());
    }

    #[test]
    fn global_height_below_minimum_is_reported() {
        let mut waylines = mission();
        waylines.global_height = Some(3.0);
        let err = validate(&waylines).unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert_eq!(err.violations[0].field, "global_height");
        assert_eq!(
            err.violations[0].constraint,
            Constraint::Range {
                min: 5.0,
                max: 1500.0,
                actual: 3.0
            }
        );
    }

    #[test]
    fn reports_every_violation_not_just_the_first() {
        let mut waylines = mission();
        waylines.name = String::new();
        waylines.global_speed = Some(40.0);
        waylines.waypoints[0].latitude = 200.0;
        waylines.waypoints[1].height = 3000.0;
        waylines.waypoints[1].waypoint_turn_mode = Some("barrelRoll".to_string());

        let err = validate(&waylines).unwrap_err();
        for field in [
            "name",
            "global_speed",
            "waypoints[0].latitude",
            "waypoints[1].height",
            "waypoints[1].waypoint_turn_mode",
        ] {
            assert!(err.has_field(field), "missing violation for {field}: {err}");
        }
        assert_eq!(err.violations.len(), 5);
    }

    #[test]
    fn unknown_enum_names_are_reported() {
        let mut waylines = mission();
        waylines.drone_model = "Phantom".to_string();
        waylines.finish_action = Some("crash".to_string());
        waylines.photo_settings = vec!["wide".to_string(), "uv".to_string()];

        let err = validate(&waylines).unwrap_err();
        assert!(err.has_field("drone_model"));
        assert!(err.has_field("finish_action"));
        assert!(err.has_field("photo_settings[1]"));
        assert!(!err.has_field("payload_model"));
    }

    #[test]
    fn incompatible_payload_is_reported() {
        let mut waylines = mission();
        waylines.payload_model = "H20T".to_string();
        let err = validate(&waylines).unwrap_err();
        assert!(matches!(err.violations[0].constraint, Constraint::Incompatible { .. }));
    }

    #[test]
    fn action_violations_name_waypoint_and_action_index() {
        let mut waylines = mission();
        waylines.waypoints[1].actions = vec![
            ActionRequest::new("takePhoto"),
            ActionRequest::new("gimbalRotate").with_param("payloadPositionIndex", 0).with_param("gimbalPitchRotateAngle", -45),
            ActionRequest::new("teleport"),
        ];
        let err = validate(&waylines).unwrap_err();
        assert!(err.has_field("waypoints[1].actions[1].gimbalRotateMode"));
        assert!(err.has_field("waypoints[1].actions[2].type"));
        assert_eq!(err.violations.len(), 2);
    }

    #[test]
    fn interval_triggers_need_a_param() {
        let mut waylines = mission();
        waylines.waypoints[0].trigger_type = Some("multipleTiming".to_string());
        waylines.waypoints[1].trigger_type = Some("betweenAdjacentPoints".to_string());
        let err = validate(&waylines).unwrap_err();
        assert!(err.has_field("waypoints[0].trigger_param"));
        assert!(err.has_field("waypoints[1].trigger_type"));
    }

    #[test]
    fn takeoff_relative_height_needs_reference_point() {
        let mut waylines = mission();
        waylines.height_type = Some("relativeToTakeoff".to_string());
        let err = validate(&waylines).unwrap_err();
        assert!(err.has_field("take_off_ref_point_latitude"));

        waylines.take_off_ref_point_latitude = Some(39.9);
        waylines.take_off_ref_point_longitude = Some(116.4);
        assert!(validate(&waylines).is_ok());
    }

    #[test]
    fn zero_numbers_are_unset_not_out_of_range() {
        let mut waylines = mission();
        waylines.global_height = Some(0.0);
        waylines.global_speed = Some(0.0);
        waylines.global_transitional_speed = Some(0.0);
        waylines.safe_height = Some(0.0);
        waylines.global_rth_height = Some(0.0);
        waylines.waypoints[0].speed = Some(0.0);
        waylines.waypoints[1].turn_damping_dist = Some(0.0);
        assert!(validate(&waylines).is_ok());
    }

    #[test]
    fn zero_interval_trigger_param_is_missing() {
        let mut waylines = mission();
        waylines.waypoints[0].trigger_type = Some("multipleDistance".to_string());
        waylines.waypoints[0].trigger_param = Some(0.0);
        let err = validate(&waylines).unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert_eq!(err.violations[0].field, "waypoints[0].trigger_param");
        assert_eq!(err.violations[0].constraint, Constraint::Required);
    }

    #[test]
    fn error_message_lists_each_violation() {
        let mut waylines = mission();
        waylines.name = String::new();
        waylines.global_speed = Some(40.0);
        let message = validate(&waylines).unwrap_err().to_string();
        assert!(message.starts_with("2 validation error(s)\n  name: "), "{message}");
        assert!(message.contains("\n  global_speed: value 40 is outside"), "{message}");
    }

    #[test]
    fn empty_waypoint_list_is_rejected() {
        let mut waylines = mission();
        waylines.waypoints.clear();
        let err = validate(&waylines).unwrap_err();
        assert_eq!(err.violations[0].field, "waypoints");
        assert_eq!(err.violations[0].constraint, Constraint::Required);
    }
}
