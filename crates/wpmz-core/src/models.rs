//! Mission request models.
//!
//! These are the user-authored shapes: enumerated settings are kept as text
//! so that [`crate::validation::validate`] can report every unknown name
//! instead of failing on the first one during deserialization.
//!
//! Numeric settings follow the request schema's convention that `0` means
//! "not set": such a value is inherited, never range-checked.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A waypoint mission request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Waylines {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub drone_model: String,
    pub payload_model: String,
    /// Gimbal port of the payload (0-2)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_position_index: Option<u32>,
    #[serde(default = "default_template_type")]
    pub template_type: String,
    /// Global height in meters (5-1500)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_height: Option<f64>,
    /// Global cruise speed in m/s (1-15)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_speed: Option<f64>,
    /// Speed while flying to the first waypoint, m/s (1-15)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_transitional_speed: Option<f64>,
    /// Lenses stored per photo
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photo_settings: Vec<String>,
    /// Low-light smart capture for the payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_low_light_smart: Option<bool>,
    /// Height mode name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub climb_mode: Option<String>,
    /// Take-off security height in meters (20-200)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub safe_height: Option<f64>,
    /// Return-to-home height in meters (20-1500)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_rth_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aircraft_yaw_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gimbal_pitch_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_off_ref_point_latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_off_ref_point_longitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_off_ref_point_height: Option<f64>,
    /// Height of the take-off point above ground level. Zero is a real value here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub take_off_ref_point_agl_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_waypoint_turn_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_use_straight_line: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_turn_damping_dist: Option<f64>,
    pub waypoints: Vec<Waypoint>,
}

fn default_template_type() -> String {
    "waypoint".to_string()
}

impl Waylines {
    /// Create a request with only the required fields set.
    pub fn new(
        name: impl Into<String>,
        drone_model: impl Into<String>,
        payload_model: impl Into<String>,
        waypoints: Vec<Waypoint>,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            drone_model: drone_model.into(),
            payload_model: payload_model.into(),
            payload_position_index: None,
            template_type: default_template_type(),
            global_height: None,
            global_speed: None,
            global_transitional_speed: None,
            photo_settings: Vec::new(),
            use_low_light_smart: None,
            height_type: None,
            finish_action: None,
            climb_mode: None,
            safe_height: None,
            global_rth_height: None,
            aircraft_yaw_mode: None,
            gimbal_pitch_mode: None,
            take_off_ref_point_latitude: None,
            take_off_ref_point_longitude: None,
            take_off_ref_point_height: None,
            take_off_ref_point_agl_height: None,
            global_waypoint_turn_mode: None,
            global_use_straight_line: None,
            global_turn_damping_dist: None,
            waypoints,
        }
    }

    /// The take-off reference point, if its coordinates are set.
    pub fn take_off_ref_point(&self) -> Option<TakeOffRefPoint> {
        let latitude = non_zero(self.take_off_ref_point_latitude);
        let longitude = non_zero(self.take_off_ref_point_longitude);
        if latitude.is_none() && longitude.is_none() {
            return None;
        }
        Some(TakeOffRefPoint {
            latitude: latitude.unwrap_or(0.0),
            longitude: longitude.unwrap_or(0.0),
            height: self.take_off_ref_point_height.unwrap_or(0.0),
            agl_height: self.take_off_ref_point_agl_height,
        })
    }

    pub fn set_take_off_ref_point(&mut self, point: Option<TakeOffRefPoint>) {
        self.take_off_ref_point_latitude = point.map(|p| p.latitude);
        self.take_off_ref_point_longitude = point.map(|p| p.longitude);
        self.take_off_ref_point_height = point.map(|p| p.height);
        self.take_off_ref_point_agl_height = point.and_then(|p| p.agl_height);
    }
}

/// A numeric request value, with `0` read as "not set".
pub fn non_zero(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v != 0.0)
}

/// Reference point for take-off relative height modes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TakeOffRefPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub height: f64,
    /// Height of the take-off point above ground level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agl_height: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Waypoint {
    pub latitude: f64,
    pub longitude: f64,
    /// Height in meters (5-500), interpreted in the mission's height mode
    pub height: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_param: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waypoint_turn_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_straight_line: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn_damping_dist: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionRequest>,
}

impl Waypoint {
    pub fn new(latitude: f64, longitude: f64, height: f64) -> Self {
        Self {
            latitude,
            longitude,
            height,
            speed: None,
            trigger_type: None,
            trigger_param: None,
            waypoint_turn_mode: None,
            use_straight_line: None,
            turn_damping_dist: None,
            actions: Vec::new(),
        }
    }

    /// Append an action request.
    pub fn with_action(mut self, action: ActionRequest) -> Self {
        self.actions.push(action);
        self
    }
}

/// An action requested at a waypoint: a type tag and its parameter bag.
///
/// The bag is checked against the per-type schema in [`crate::actions`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl ActionRequest {
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            params: BTreeMap::new(),
        }
    }

    /// Set a parameter.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}
