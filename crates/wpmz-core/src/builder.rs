//! Mission builder: request -> mission tree.
//!
//! The request is validated first; any violation aborts the build. Every
//! placemark carries its effective values after override resolution, the
//! document renderer decides which of them need to be written explicitly.

use crate::actions::{encode_waypoint_actions, IdAllocator};
use crate::enums::{
    ClimbMode, DroneModel, FinishAction, GimbalPitchMode, HeadingMode, HeightMode, PayloadModel,
    PhotoLens, TemplateType, TriggerType, TurnMode, UnknownVariant,
};
use crate::error::BuildError;
use crate::mission::{ActionTrigger, DocumentInfo, Folder, MissionConfig, MissionDocument, Placemark};
use crate::models::{non_zero, Waylines, Waypoint};
use crate::resolve::Layered;
use crate::rules::{MissionDefaults, MissionRules};
use crate::spatial::route_stats;
use crate::validation::{validate_with, Constraint, ValidationErrors, Violation};
use chrono::{DateTime, Utc};
use std::str::FromStr;
use tracing::debug;

/// Caller-supplied values that are not part of the mission request.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub author: Option<String>,
    /// Stamped as both creation and update time
    pub timestamp: Option<DateTime<Utc>>,
    pub first_group_id: u32,
    pub first_action_id: u32,
    pub rules: MissionRules,
}

/// Build the mission tree with default options.
pub fn build_mission(waylines: &Waylines) -> Result<MissionDocument, BuildError> {
    build_mission_with(waylines, &BuildOptions::default())
}

pub fn build_mission_with(waylines: &Waylines, options: &BuildOptions) -> Result<MissionDocument, BuildError> {
    validate_with(waylines, &options.rules)?;
    let defaults = &options.rules.defaults;

    let height_mode = parse_optional::<HeightMode>("height_type", &waylines.height_type)?
        .unwrap_or(defaults.height_mode);
    let take_off_ref_point = if height_mode.requires_take_off_ref_point() {
        waylines.take_off_ref_point()
    } else {
        if waylines.take_off_ref_point().is_some() {
            debug!(%height_mode, "height mode does not use a take-off reference point; omitting it");
        }
        None
    };

    let config = MissionConfig {
        climb_mode: parse_optional::<ClimbMode>("climb_mode", &waylines.climb_mode)?
            .unwrap_or(defaults.climb_mode),
        finish_action: parse_optional::<FinishAction>("finish_action", &waylines.finish_action)?
            .unwrap_or(defaults.finish_action),
        take_off_security_height: non_zero(waylines.safe_height).unwrap_or(defaults.safe_height),
        global_transitional_speed: non_zero(waylines.global_transitional_speed)
            .unwrap_or(defaults.transitional_speed),
        global_rth_height: non_zero(waylines.global_rth_height).unwrap_or(defaults.rth_height),
        take_off_ref_point,
        drone: parse_field::<DroneModel>("drone_model", &waylines.drone_model)?,
        payload: parse_field::<PayloadModel>("payload_model", &waylines.payload_model)?,
        payload_position_index: waylines.payload_position_index.unwrap_or(0),
    };

    let globals = GlobalSettings {
        speed: non_zero(waylines.global_speed),
        turn_mode: parse_optional::<TurnMode>("global_waypoint_turn_mode", &waylines.global_waypoint_turn_mode)?,
        turn_damping_dist: non_zero(waylines.global_turn_damping_dist),
        use_straight_line: waylines.global_use_straight_line,
    };

    let mut ids = IdAllocator::starting_at(options.first_group_id, options.first_action_id);
    let mut placemarks = Vec::with_capacity(waylines.waypoints.len());
    for (i, waypoint) in waylines.waypoints.iter().enumerate() {
        placemarks.push(build_placemark(i, waypoint, &globals, defaults, &mut ids)?);
    }

    let image_formats = waylines
        .photo_settings
        .iter()
        .enumerate()
        .map(|(i, lens)| parse_field::<PhotoLens>(&format!("photo_settings[{i}]"), lens))
        .collect::<Result<Vec<_>, _>>()?;

    let stats = route_stats(&placemarks);
    let folder = Folder {
        template_type: parse_field::<TemplateType>("template_type", &waylines.template_type)?,
        template_id: 0,
        wayline_id: 0,
        height_mode,
        global_height: non_zero(waylines.global_height).unwrap_or(defaults.global_height),
        auto_flight_speed: globals.speed.unwrap_or(defaults.speed),
        global_turn_mode: globals.turn_mode.unwrap_or(defaults.turn_mode),
        global_turn_damping_dist: globals.turn_damping_dist.unwrap_or(defaults.turn_damping_dist),
        global_use_straight_line: globals.use_straight_line.unwrap_or(defaults.use_straight_line),
        heading_mode: parse_optional::<HeadingMode>("aircraft_yaw_mode", &waylines.aircraft_yaw_mode)?
            .unwrap_or(defaults.heading_mode),
        gimbal_pitch_mode: parse_optional::<GimbalPitchMode>("gimbal_pitch_mode", &waylines.gimbal_pitch_mode)?
            .unwrap_or(defaults.gimbal_pitch_mode),
        image_formats,
        low_light_smart: waylines.use_low_light_smart.unwrap_or(false),
        distance_m: stats.distance_m,
        duration_s: stats.duration_s,
        placemarks,
    };

    // Documents store milliseconds.
    let timestamp = options
        .timestamp
        .and_then(|t| DateTime::from_timestamp_millis(t.timestamp_millis()));
    let info = DocumentInfo {
        name: waylines.name.clone(),
        description: waylines.description.clone(),
        author: options.author.clone(),
        create_time: timestamp,
        update_time: timestamp,
    };

    let document = MissionDocument { info, config, folder };
    debug!(
        placemarks = document.placemarks().len(),
        actions = document.actions().count(),
        distance_m = document.folder.distance_m,
        "built mission tree"
    );
    Ok(document)
}

/// Mission-wide values a waypoint may override.
struct GlobalSettings {
    speed: Option<f64>,
    turn_mode: Option<TurnMode>,
    turn_damping_dist: Option<f64>,
    use_straight_line: Option<bool>,
}

fn build_placemark(
    i: usize,
    waypoint: &Waypoint,
    globals: &GlobalSettings,
    defaults: &MissionDefaults,
    ids: &mut IdAllocator,
) -> Result<Placemark, BuildError> {
    let index = i as u32;
    let turn_mode = parse_optional::<TurnMode>(&format!("waypoints[{i}].waypoint_turn_mode"), &waypoint.waypoint_turn_mode)?;
    let trigger_type = parse_optional::<TriggerType>(&format!("waypoints[{i}].trigger_type"), &waypoint.trigger_type)?
        .unwrap_or(TriggerType::ReachPoint);

    let param = if trigger_type.takes_param() {
        non_zero(waypoint.trigger_param)
    } else {
        if waypoint.trigger_param.is_some() {
            debug!(waypoint = i, %trigger_type, "trigger type takes no parameter; dropping it");
        }
        None
    };
    let trigger = ActionTrigger { trigger_type, param };
    let end_index = match trigger_type {
        TriggerType::BetweenAdjacentPoints => index + 1,
        _ => index,
    };

    let action_groups = encode_waypoint_actions(&waypoint.actions, trigger, index, end_index, ids)
        .map_err(|source| BuildError::Encoding { waypoint: i, source })?;

    Ok(Placemark {
        index,
        latitude: waypoint.latitude,
        longitude: waypoint.longitude,
        height: waypoint.height,
        speed: Layered::numeric(waypoint.speed, globals.speed, defaults.speed).effective(),
        turn_mode: Layered::new(turn_mode, globals.turn_mode, defaults.turn_mode).effective(),
        turn_damping_dist: Layered::numeric(
            waypoint.turn_damping_dist,
            globals.turn_damping_dist,
            defaults.turn_damping_dist,
        )
        .effective(),
        use_straight_line: Layered::new(
            waypoint.use_straight_line,
            globals.use_straight_line,
            defaults.use_straight_line,
        )
        .effective(),
        action_groups,
    })
}

fn parse_field<T: FromStr<Err = UnknownVariant>>(field: &str, value: &str) -> Result<T, BuildError> {
    value.parse().map_err(|err: UnknownVariant| {
        BuildError::Validation(ValidationErrors {
            violations: vec![Violation {
                field: field.to_string(),
                constraint: Constraint::OneOf {
                    value: err.value,
                    allowed: err.allowed,
                },
            }],
        })
    })
}

fn parse_optional<T: FromStr<Err = UnknownVariant>>(field: &str, value: &Option<String>) -> Result<Option<T>, BuildError> {
    value.as_deref().map(|v| parse_field(field, v)).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::ActionKind;
    use crate::models::{ActionRequest, TakeOffRefPoint};

    fn two_point_mission() -> Waylines {
        let mut waylines = Waylines::new(
            "scenario-a",
            "M30T",
            "M30T",
            vec![
                Waypoint::new(39.9042, 116.4074, 50.0).with_action(ActionRequest::new("takePhoto")),
                Waypoint::new(39.9052, 116.4084, 60.0),
            ],
        );
        waylines.global_speed = Some(5.0);
        waylines
    }

    #[test]
    fn test_placemarks_follow_input_order() {
        let mut waylines = two_point_mission();
        waylines.waypoints.push(Waypoint::new(39.9000, 116.4000, 70.0));
        let document = build_mission(&waylines).unwrap();

        let indices: Vec<_> = document.placemarks().iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        for (placemark, waypoint) in document.placemarks().iter().zip(&waylines.waypoints) {
            assert_eq!(placemark.latitude, waypoint.latitude);
            assert_eq!(placemark.longitude, waypoint.longitude);
            assert_eq!(placemark.height, waypoint.height);
        }
    }

    #[test]
    fn photo_action_lands_on_first_placemark_only() {
        let document = build_mission(&two_point_mission()).unwrap();
        let first = &document.placemarks()[0];
        assert_eq!(first.action_groups.len(), 1);
        assert_eq!(first.action_groups[0].trigger, ActionTrigger::default());
        assert_eq!(first.action_groups[0].actions.len(), 1);
        assert!(matches!(first.action_groups[0].actions[0].kind, ActionKind::TakePhoto { .. }));
        assert!(document.placemarks()[1].action_groups.is_empty());
    }

    #[test]
    fn waypoint_values_override_globals() {
        let mut waylines = two_point_mission();
        waylines.global_waypoint_turn_mode = Some("coordinateTurn".to_string());
        waylines.waypoints[1].speed = Some(8.0);
        waylines.waypoints[1].waypoint_turn_mode = Some("toPointAndPassWithContinuityCurvature".to_string());

        let document = build_mission(&waylines).unwrap();
        let [first, second] = document.placemarks() else {
            panic!("expected two placemarks");
        };
        assert_eq!(first.speed, 5.0);
        assert_eq!(first.turn_mode, TurnMode::CoordinateTurn);
        assert_eq!(second.speed, 8.0);
        assert_eq!(second.turn_mode, TurnMode::ToPointAndPassWithContinuityCurvature);
        assert_eq!(document.folder.auto_flight_speed, 5.0);
    }

    #[test]
    fn zero_waypoint_speed_inherits_global_speed() {
        let json = r#"{
            "name": "zero-speed",
            "drone_model": "M30T",
            "payload_model": "M30T",
            "global_speed": 6,
            "global_height": 0,
            "waypoints": [
                {"latitude": 39.9042, "longitude": 116.4074, "height": 50, "speed": 0},
                {"latitude": 39.9052, "longitude": 116.4084, "height": 60, "speed": 9}
            ]
        }"#;
        let waylines: Waylines = serde_json::from_str(json).unwrap();
        let document = build_mission(&waylines).unwrap();
        assert_eq!(document.folder.auto_flight_speed, 6.0);
        assert_eq!(document.placemarks()[0].speed, 6.0);
        assert_eq!(document.placemarks()[1].speed, 9.0);
        assert_eq!(document.folder.global_height, MissionDefaults::default().global_height);
    }

    #[test]
    fn original_height_type_names_build() {
        let mut waylines = two_point_mission();
        waylines.height_type = Some("EGM96".to_string());
        waylines.aircraft_yaw_mode = Some("followRoute".to_string());
        waylines.gimbal_pitch_mode = Some("free".to_string());
        waylines.use_low_light_smart = Some(true);
        let document = build_mission(&waylines).unwrap();
        assert_eq!(document.folder.height_mode, HeightMode::Egm96);
        assert_eq!(document.folder.heading_mode, HeadingMode::FollowWayline);
        assert_eq!(document.folder.gimbal_pitch_mode, GimbalPitchMode::Manual);
        assert!(document.folder.low_light_smart);
    }

    #[test]
    fn built_in_defaults_fill_unset_values() {
        let mut waylines = two_point_mission();
        waylines.global_speed = None;
        let document = build_mission(&waylines).unwrap();
        let defaults = MissionDefaults::default();
        assert_eq!(document.folder.auto_flight_speed, defaults.speed);
        assert_eq!(document.placemarks()[0].speed, defaults.speed);
        assert_eq!(document.config.finish_action, FinishAction::GoHome);
        assert_eq!(document.folder.height_mode, HeightMode::RelativeToStartPoint);
    }

    #[test]
    fn action_ids_are_mission_scoped() {
        let mut waylines = two_point_mission();
        waylines.waypoints[1].actions = vec![
            ActionRequest::new("recordVideo").with_param("durationSeconds", 4),
            ActionRequest::new("takePhoto"),
        ];
        let document = build_mission_with(
            &waylines,
            &BuildOptions {
                first_action_id: 100,
                ..BuildOptions::default()
            },
        )
        .unwrap();
        let ids: Vec<_> = document.actions().map(|a| a.id).collect();
        assert_eq!(ids, vec![100, 101, 102, 103, 104]);
        let group_ids: Vec<_> = document
            .placemarks()
            .iter()
            .flat_map(|p| p.action_groups.iter().map(|g| g.id))
            .collect();
        assert_eq!(group_ids, vec![0, 1]);
    }

    #[test]
    fn running_out_of_action_ids_fails_the_build() {
        let at_limit = BuildOptions {
            first_action_id: u32::MAX,
            ..BuildOptions::default()
        };
        let document = build_mission_with(&two_point_mission(), &at_limit).unwrap();
        assert_eq!(document.actions().map(|a| a.id).collect::<Vec<_>>(), vec![u32::MAX]);

        let mut waylines = two_point_mission();
        waylines.waypoints[1].actions.push(ActionRequest::new("takePhoto"));
        match build_mission_with(&waylines, &at_limit) {
            Err(BuildError::Encoding { waypoint: 1, source }) => assert_eq!(source.action_index, 0),
            other => panic!("expected id exhaustion, got {other:?}"),
        }
    }

    #[test]
    fn take_off_point_only_for_modes_that_need_it() {
        let point = TakeOffRefPoint {
            latitude: 39.9,
            longitude: 116.4,
            height: 42.0,
            agl_height: Some(1.5),
        };
        let mut waylines = two_point_mission();
        waylines.set_take_off_ref_point(Some(point));
        assert_eq!(build_mission(&waylines).unwrap().config.take_off_ref_point, None);

        waylines.height_type = Some("relativeToTakeoff".to_string());
        assert_eq!(build_mission(&waylines).unwrap().config.take_off_ref_point, Some(point));
    }

    #[test]
    fn trigger_settings_shape_the_group() {
        let mut waylines = two_point_mission();
        waylines.waypoints[0].trigger_type = Some("betweenAdjacentPoints".to_string());
        waylines.waypoints[0].trigger_param = Some(7.0);
        let document = build_mission(&waylines).unwrap();
        let group = &document.placemarks()[0].action_groups[0];
        assert_eq!(group.trigger.trigger_type, TriggerType::BetweenAdjacentPoints);
        assert_eq!(group.trigger.param, None);
        assert_eq!((group.start_index, group.end_index), (0, 1));
    }

    #[test]
    fn invalid_request_never_builds() {
        let mut waylines = two_point_mission();
        waylines.global_height = Some(3.0);
        match build_mission(&waylines) {
            Err(BuildError::Validation(errors)) => assert!(errors.has_field("global_height")),
            other => panic!("expected validation failure, got {other:?}"),
        }
    }
}
