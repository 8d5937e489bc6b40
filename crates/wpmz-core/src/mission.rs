//! The mission tree: document, folder, placemarks and action groups.
//!
//! Built by [`crate::builder`], rendered by [`crate::document`] and
//! reconstructed from an archive by [`crate::container`].

use crate::actions::ActionKind;
use crate::enums::{
    ClimbMode, DroneModel, FinishAction, GimbalPitchMode, HeadingMode, HeightMode, PayloadModel,
    PhotoLens, TemplateType, TriggerType, TurnMode,
};
use crate::models::{TakeOffRefPoint, Waylines, Waypoint};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionDocument {
    pub info: DocumentInfo,
    pub config: MissionConfig,
    pub folder: Folder,
}

/// Descriptive metadata carried by the visualization document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub name: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub create_time: Option<DateTime<Utc>>,
    pub update_time: Option<DateTime<Utc>>,
}

/// Document-level execution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionConfig {
    pub climb_mode: ClimbMode,
    pub finish_action: FinishAction,
    pub take_off_security_height: f64,
    pub global_transitional_speed: f64,
    pub global_rth_height: f64,
    /// Present only for height modes that need it
    pub take_off_ref_point: Option<TakeOffRefPoint>,
    pub drone: DroneModel,
    pub payload: PayloadModel,
    pub payload_position_index: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub template_type: TemplateType,
    pub template_id: u32,
    pub wayline_id: u32,
    pub height_mode: HeightMode,
    pub global_height: f64,
    pub auto_flight_speed: f64,
    pub global_turn_mode: TurnMode,
    pub global_turn_damping_dist: f64,
    pub global_use_straight_line: bool,
    pub heading_mode: HeadingMode,
    pub gimbal_pitch_mode: GimbalPitchMode,
    pub image_formats: Vec<PhotoLens>,
    /// Payload low-light smart capture
    #[serde(default)]
    pub low_light_smart: bool,
    /// Great-circle route length in meters
    pub distance_m: f64,
    /// Estimated flight time in seconds
    pub duration_s: f64,
    pub placemarks: Vec<Placemark>,
}

/// One waypoint with its effective (already resolved) parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placemark {
    pub index: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub height: f64,
    pub speed: f64,
    pub turn_mode: TurnMode,
    pub turn_damping_dist: f64,
    pub use_straight_line: bool,
    pub action_groups: Vec<ActionGroup>,
}

/// A trigger and the ordered actions it fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionGroup {
    pub id: u32,
    pub start_index: u32,
    pub end_index: u32,
    pub trigger: ActionTrigger,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActionTrigger {
    pub trigger_type: TriggerType,
    pub param: Option<f64>,
}

impl Default for ActionTrigger {
    fn default() -> Self {
        Self {
            trigger_type: TriggerType::ReachPoint,
            param: None,
        }
    }
}

/// A concrete device command with its mission-scoped identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: u32,
    pub kind: ActionKind,
}

impl MissionDocument {
    pub fn placemarks(&self) -> &[Placemark] {
        &self.folder.placemarks
    }

    /// Every action in document order.
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.folder
            .placemarks
            .iter()
            .flat_map(|p| p.action_groups.iter())
            .flat_map(|g| g.actions.iter())
    }

    /// Best-effort reconstruction of the mission request.
    ///
    /// Every setting is written out explicitly, so the result builds into
    /// an equivalent tree. Composite actions come back as their parts.
    pub fn to_waylines(&self) -> Waylines {
        let folder = &self.folder;
        let waypoints = folder
            .placemarks
            .iter()
            .map(|placemark| {
                let trigger = placemark.action_groups.first().map(|g| g.trigger);
                let mut waypoint = Waypoint::new(placemark.latitude, placemark.longitude, placemark.height);
                waypoint.speed = Some(placemark.speed);
                waypoint.waypoint_turn_mode = Some(placemark.turn_mode.to_string());
                waypoint.turn_damping_dist = Some(placemark.turn_damping_dist);
                waypoint.use_straight_line = Some(placemark.use_straight_line);
                if let Some(trigger) = trigger.filter(|t| t.trigger_type != TriggerType::ReachPoint) {
                    waypoint.trigger_type = Some(trigger.trigger_type.to_string());
                    waypoint.trigger_param = trigger.param;
                }
                waypoint.actions = placemark
                    .action_groups
                    .iter()
                    .flat_map(|g| g.actions.iter())
                    .map(|action| action.kind.to_request())
                    .collect();
                waypoint
            })
            .collect();

        let mut waylines = Waylines::new(
            self.info.name.clone(),
            self.config.drone.to_string(),
            self.config.payload.to_string(),
            waypoints,
        );
        waylines.description = self.info.description.clone();
        waylines.payload_position_index = Some(self.config.payload_position_index);
        waylines.template_type = folder.template_type.to_string();
        waylines.global_height = Some(folder.global_height);
        waylines.global_speed = Some(folder.auto_flight_speed);
        waylines.global_transitional_speed = Some(self.config.global_transitional_speed);
        waylines.photo_settings = folder.image_formats.iter().map(|l| l.to_string()).collect();
        waylines.use_low_light_smart = Some(folder.low_light_smart);
        waylines.height_type = Some(folder.height_mode.to_string());
        waylines.finish_action = Some(self.config.finish_action.to_string());
        waylines.climb_mode = Some(self.config.climb_mode.to_string());
        waylines.safe_height = Some(self.config.take_off_security_height);
        waylines.global_rth_height = Some(self.config.global_rth_height);
        waylines.aircraft_yaw_mode = Some(folder.heading_mode.to_string());
        waylines.gimbal_pitch_mode = Some(folder.gimbal_pitch_mode.to_string());
        waylines.set_take_off_ref_point(self.config.take_off_ref_point);
        waylines.global_waypoint_turn_mode = Some(folder.global_turn_mode.to_string());
        waylines.global_use_straight_line = Some(folder.global_use_straight_line);
        waylines.global_turn_damping_dist = Some(folder.global_turn_damping_dist);
        waylines
    }
}
