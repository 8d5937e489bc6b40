//! Action encoding.
//!
//! Turns loosely-typed [`ActionRequest`]s into concrete device commands,
//! assigns mission-scoped identifiers and groups the commands under the
//! waypoint's trigger.

use crate::enums::{GimbalRotateMode, UnknownVariant, YawPathMode};
use crate::mission::{Action, ActionGroup, ActionTrigger};
use crate::models::ActionRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

/// Request types accepted by the encoder.
pub const SUPPORTED_ACTIONS: &[&str] = &[
    "takePhoto",
    "startRecord",
    "stopRecord",
    "recordVideo",
    "focus",
    "zoom",
    "customDirName",
    "gimbalRotate",
    "aircraftYaw",
    "rotateYaw",
    "hover",
];

const ANGLE_RANGE: (f64, f64) = (-180.0, 180.0);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodingError {
    #[error("unsupported action type '{action_type}'")]
    UnsupportedActionType { action_type: String },
    #[error("{action_type}: missing parameter '{parameter}'")]
    MissingParameter { action_type: String, parameter: String },
    #[error("{action_type}: unrecognized parameter '{parameter}'")]
    UnknownParameter { action_type: String, parameter: String },
    #[error("{action_type}: invalid value {value} for '{parameter}': {reason}")]
    InvalidParameter {
        action_type: String,
        parameter: String,
        value: String,
        reason: String,
    },
    #[error("no {kind} identifiers left")]
    IdsExhausted { kind: &'static str },
}

impl EncodingError {
    /// The parameter the error is about, if any.
    pub fn parameter(&self) -> Option<&str> {
        match self {
            EncodingError::UnsupportedActionType { .. } | EncodingError::IdsExhausted { .. } => None,
            EncodingError::MissingParameter { parameter, .. }
            | EncodingError::UnknownParameter { parameter, .. }
            | EncodingError::InvalidParameter { parameter, .. } => Some(parameter),
        }
    }
}

/// An encoding failure located within a waypoint's action list.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("action {action_index}: {source}")]
pub struct ActionError {
    pub action_index: usize,
    #[source]
    pub source: EncodingError,
}

/// Gimbal rotation. Axes left as `None` are not rotated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GimbalRotate {
    pub payload_position_index: u32,
    pub rotate_mode: GimbalRotateMode,
    pub pitch: Option<f64>,
    pub roll: Option<f64>,
    pub yaw: Option<f64>,
    /// Rotation time in seconds
    pub rotate_time: Option<f64>,
}

/// Concrete device command, one variant per actuator function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "func", rename_all = "camelCase")]
pub enum ActionKind {
    TakePhoto {
        payload_position_index: u32,
        file_suffix: Option<String>,
    },
    StartRecord {
        payload_position_index: u32,
        file_suffix: Option<String>,
    },
    StopRecord {
        payload_position_index: u32,
    },
    Focus {
        payload_position_index: u32,
        focus_x: f64,
        focus_y: f64,
        infinite: bool,
    },
    Zoom {
        payload_position_index: u32,
        focal_length: f64,
    },
    CustomDirName {
        payload_position_index: u32,
        directory_name: String,
    },
    GimbalRotate(GimbalRotate),
    RotateYaw {
        heading: f64,
        path_mode: YawPathMode,
    },
    Hover {
        hover_time: f64,
    },
}

impl ActionKind {
    /// Actuator function name written into the execution document.
    pub fn func(&self) -> &'static str {
        match self {
            ActionKind::TakePhoto { .. } => "takePhoto",
            ActionKind::StartRecord { .. } => "startRecord",
            ActionKind::StopRecord { .. } => "stopRecord",
            ActionKind::Focus { .. } => "focus",
            ActionKind::Zoom { .. } => "zoom",
            ActionKind::CustomDirName { .. } => "customDirName",
            ActionKind::GimbalRotate(_) => "gimbalRotate",
            ActionKind::RotateYaw { .. } => "rotateYaw",
            ActionKind::Hover { .. } => "hover",
        }
    }

    /// The request that encodes to exactly this command.
    pub fn to_request(&self) -> ActionRequest {
        match self {
            ActionKind::TakePhoto {
                payload_position_index,
                file_suffix,
            } => with_suffix(
                ActionRequest::new("takePhoto").with_param("payloadPositionIndex", *payload_position_index),
                file_suffix,
            ),
            ActionKind::StartRecord {
                payload_position_index,
                file_suffix,
            } => with_suffix(
                ActionRequest::new("startRecord").with_param("payloadPositionIndex", *payload_position_index),
                file_suffix,
            ),
            ActionKind::StopRecord { payload_position_index } => {
                ActionRequest::new("stopRecord").with_param("payloadPositionIndex", *payload_position_index)
            }
            ActionKind::Focus {
                payload_position_index,
                focus_x,
                focus_y,
                infinite,
            } => ActionRequest::new("focus")
                .with_param("payloadPositionIndex", *payload_position_index)
                .with_param("focusX", *focus_x)
                .with_param("focusY", *focus_y)
                .with_param("isInfiniteFocus", *infinite),
            ActionKind::Zoom {
                payload_position_index,
                focal_length,
            } => ActionRequest::new("zoom")
                .with_param("payloadPositionIndex", *payload_position_index)
                .with_param("focalLength", *focal_length),
            ActionKind::CustomDirName {
                payload_position_index,
                directory_name,
            } => ActionRequest::new("customDirName")
                .with_param("payloadPositionIndex", *payload_position_index)
                .with_param("directoryName", directory_name.as_str()),
            ActionKind::GimbalRotate(gimbal) => {
                let mut request = ActionRequest::new("gimbalRotate")
                    .with_param("payloadPositionIndex", gimbal.payload_position_index)
                    .with_param("gimbalRotateMode", gimbal.rotate_mode.as_str());
                let optional = [
                    ("gimbalPitchRotateAngle", gimbal.pitch),
                    ("gimbalRollRotateAngle", gimbal.roll),
                    ("gimbalYawRotateAngle", gimbal.yaw),
                    ("gimbalRotateTimeInSeconds", gimbal.rotate_time),
                ];
                for (name, value) in optional {
                    if let Some(value) = value {
                        request = request.with_param(name, value);
                    }
                }
                request
            }
            ActionKind::RotateYaw { heading, path_mode } => ActionRequest::new("aircraftYaw")
                .with_param("aircraftYawRotateMode", path_mode.as_str())
                .with_param("aircraftYawRotateAngle", *heading),
            ActionKind::Hover { hover_time } => ActionRequest::new("hover").with_param("hoverTime", *hover_time),
        }
    }
}

fn with_suffix(request: ActionRequest, file_suffix: &Option<String>) -> ActionRequest {
    match file_suffix {
        Some(suffix) => request.with_param("fileSuffix", suffix.as_str()),
        None => request,
    }
}

/// Mission-scoped identifier source for action groups and actions.
///
/// One allocator is threaded through a whole conversion; identifiers are
/// never reused, even across waypoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdAllocator {
    // Wider than the ids so `u32::MAX` itself can still be handed out.
    next_group: u64,
    next_action: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(first_group_id: u32, first_action_id: u32) -> Self {
        Self {
            next_group: first_group_id.into(),
            next_action: first_action_id.into(),
        }
    }

    /// `None` once every group id has been handed out.
    pub fn next_group_id(&mut self) -> Option<u32> {
        take_id(&mut self.next_group)
    }

    pub fn next_action_id(&mut self) -> Option<u32> {
        take_id(&mut self.next_action)
    }
}

fn take_id(next: &mut u64) -> Option<u32> {
    let id = u32::try_from(*next).ok()?;
    *next += 1;
    Some(id)
}

/// Encode one request into its device commands, stopping at the first problem.
pub fn encode_request(request: &ActionRequest) -> Result<Vec<ActionKind>, EncodingError> {
    check_request(request).map_err(|mut errors| errors.remove(0))
}

/// Encode one request, reporting every problem with it.
///
/// The error list is never empty.
pub fn check_request(request: &ActionRequest) -> Result<Vec<ActionKind>, Vec<EncodingError>> {
    let action_type = request.action_type.as_str();
    match action_type {
        "takePhoto" => {
            let mut p = ParamReader::new(request, &["payloadPositionIndex", "fileSuffix"]);
            let payload_position_index = p.optional_u32("payloadPositionIndex").unwrap_or(0);
            let file_suffix = p.optional_string("fileSuffix");
            p.finish(vec![ActionKind::TakePhoto {
                payload_position_index,
                file_suffix,
            }])
        }
        "startRecord" => {
            let mut p = ParamReader::new(request, &["payloadPositionIndex", "fileSuffix"]);
            let payload_position_index = p.optional_u32("payloadPositionIndex").unwrap_or(0);
            let file_suffix = p.optional_string("fileSuffix");
            p.finish(vec![ActionKind::StartRecord {
                payload_position_index,
                file_suffix,
            }])
        }
        "stopRecord" => {
            let mut p = ParamReader::new(request, &["payloadPositionIndex"]);
            let payload_position_index = p.optional_u32("payloadPositionIndex").unwrap_or(0);
            p.finish(vec![ActionKind::StopRecord { payload_position_index }])
        }
        "recordVideo" => {
            let mut p = ParamReader::new(request, &["payloadPositionIndex", "fileSuffix", "durationSeconds"]);
            let payload_position_index = p.optional_u32("payloadPositionIndex").unwrap_or(0);
            let file_suffix = p.optional_string("fileSuffix");
            let Some(duration) = p.required_positive("durationSeconds") else {
                return Err(p.into_errors());
            };
            p.finish(vec![
                ActionKind::StartRecord {
                    payload_position_index,
                    file_suffix,
                },
                ActionKind::Hover { hover_time: duration },
                ActionKind::StopRecord { payload_position_index },
            ])
        }
        "focus" => {
            let mut p = ParamReader::new(
                request,
                &["payloadPositionIndex", "focusX", "focusY", "isInfiniteFocus"],
            );
            let payload_position_index = p.optional_u32("payloadPositionIndex").unwrap_or(0);
            let focus_x = p.optional_in_range("focusX", (0.0, 1.0)).unwrap_or(0.5);
            let focus_y = p.optional_in_range("focusY", (0.0, 1.0)).unwrap_or(0.5);
            let infinite = p.optional_bool("isInfiniteFocus").unwrap_or(false);
            p.finish(vec![ActionKind::Focus {
                payload_position_index,
                focus_x,
                focus_y,
                infinite,
            }])
        }
        "zoom" => {
            let mut p = ParamReader::new(request, &["payloadPositionIndex", "focalLength"]);
            let payload_position_index = p.optional_u32("payloadPositionIndex").unwrap_or(0);
            let Some(focal_length) = p.required_positive("focalLength") else {
                return Err(p.into_errors());
            };
            p.finish(vec![ActionKind::Zoom {
                payload_position_index,
                focal_length,
            }])
        }
        "customDirName" => {
            let mut p = ParamReader::new(request, &["payloadPositionIndex", "directoryName"]);
            let payload_position_index = p.optional_u32("payloadPositionIndex").unwrap_or(0);
            let Some(directory_name) = p.required_string("directoryName") else {
                return Err(p.into_errors());
            };
            p.finish(vec![ActionKind::CustomDirName {
                payload_position_index,
                directory_name,
            }])
        }
        "gimbalRotate" => {
            let mut p = ParamReader::new(
                request,
                &[
                    "payloadPositionIndex",
                    "gimbalRotateMode",
                    "gimbalPitchRotateAngle",
                    "gimbalRollRotateAngle",
                    "gimbalYawRotateAngle",
                    "gimbalRotateTimeInSeconds",
                ],
            );
            let payload_position_index = p.required_u32("payloadPositionIndex");
            let rotate_mode = p.required_enum::<GimbalRotateMode>("gimbalRotateMode");
            let pitch = p.optional_in_range("gimbalPitchRotateAngle", ANGLE_RANGE);
            let roll = p.optional_in_range("gimbalRollRotateAngle", ANGLE_RANGE);
            let yaw = p.optional_in_range("gimbalYawRotateAngle", ANGLE_RANGE);
            let rotate_time = p.optional_positive("gimbalRotateTimeInSeconds");
            if !p.is_present("gimbalPitchRotateAngle") && !p.is_present("gimbalYawRotateAngle") {
                p.missing("gimbalPitchRotateAngle or gimbalYawRotateAngle");
            }
            let (Some(payload_position_index), Some(rotate_mode)) = (payload_position_index, rotate_mode) else {
                return Err(p.into_errors());
            };
            p.finish(vec![ActionKind::GimbalRotate(GimbalRotate {
                payload_position_index,
                rotate_mode,
                pitch,
                roll,
                yaw,
                rotate_time,
            })])
        }
        "aircraftYaw" | "rotateYaw" => {
            let mut p = ParamReader::new(request, &["aircraftYawRotateMode", "aircraftYawRotateAngle"]);
            let path_mode = p.required_enum::<YawPathMode>("aircraftYawRotateMode");
            let heading = p.required_in_range("aircraftYawRotateAngle", ANGLE_RANGE);
            let (Some(path_mode), Some(heading)) = (path_mode, heading) else {
                return Err(p.into_errors());
            };
            p.finish(vec![ActionKind::RotateYaw { heading, path_mode }])
        }
        "hover" => {
            let mut p = ParamReader::new(request, &["hoverTime"]);
            let Some(hover_time) = p.required_positive("hoverTime") else {
                return Err(p.into_errors());
            };
            p.finish(vec![ActionKind::Hover { hover_time }])
        }
        _ => Err(vec![EncodingError::UnsupportedActionType {
            action_type: action_type.to_string(),
        }]),
    }
}

/// Encode a waypoint's requests into action groups.
///
/// All requests share the waypoint's single trigger, so the result holds at
/// most one group. Identifiers are taken from `ids` only once every request
/// has encoded successfully.
pub fn encode_waypoint_actions(
    requests: &[ActionRequest],
    trigger: ActionTrigger,
    start_index: u32,
    end_index: u32,
    ids: &mut IdAllocator,
) -> Result<Vec<ActionGroup>, ActionError> {
    if requests.is_empty() {
        return Ok(Vec::new());
    }

    let mut commands = Vec::new();
    for (action_index, request) in requests.iter().enumerate() {
        let encoded = encode_request(request).map_err(|source| ActionError { action_index, source })?;
        commands.extend(encoded.into_iter().map(|kind| (action_index, kind)));
    }

    let id = ids.next_group_id().ok_or(ActionError {
        action_index: 0,
        source: EncodingError::IdsExhausted { kind: "action group" },
    })?;
    let actions = commands
        .into_iter()
        .map(|(action_index, kind)| match ids.next_action_id() {
            Some(id) => Ok(Action { id, kind }),
            None => Err(ActionError {
                action_index,
                source: EncodingError::IdsExhausted { kind: "action" },
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(vec![ActionGroup {
        id,
        start_index,
        end_index,
        trigger,
        actions,
    }])
}

/// Schema-checked access to a request's parameter bag.
///
/// Problems are collected rather than returned so that one pass reports
/// everything wrong with a request.
struct ParamReader<'a> {
    action_type: &'a str,
    params: &'a BTreeMap<String, Value>,
    errors: Vec<EncodingError>,
}

impl<'a> ParamReader<'a> {
    fn new(request: &'a ActionRequest, allowed: &[&str]) -> Self {
        let errors = request
            .params
            .keys()
            .filter(|name| !allowed.contains(&name.as_str()))
            .map(|name| EncodingError::UnknownParameter {
                action_type: request.action_type.clone(),
                parameter: name.clone(),
            })
            .collect();
        Self {
            action_type: &request.action_type,
            params: &request.params,
            errors,
        }
    }

    fn is_present(&self, name: &str) -> bool {
        !matches!(self.params.get(name), None | Some(Value::Null))
    }

    fn value(&mut self, name: &str, required: bool) -> Option<&'a Value> {
        match self.params.get(name) {
            None | Some(Value::Null) => {
                if required {
                    self.missing(name);
                }
                None
            }
            Some(value) => Some(value),
        }
    }

    fn missing(&mut self, name: &str) {
        self.errors.push(EncodingError::MissingParameter {
            action_type: self.action_type.to_string(),
            parameter: name.to_string(),
        });
    }

    fn invalid(&mut self, name: &str, value: &Value, reason: impl Into<String>) {
        self.errors.push(EncodingError::InvalidParameter {
            action_type: self.action_type.to_string(),
            parameter: name.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        });
    }

    fn number(&mut self, name: &str, required: bool, check: impl Fn(f64) -> Result<(), String>) -> Option<f64> {
        let value = self.value(name, required)?;
        let Some(number) = value.as_f64().filter(|n| n.is_finite()) else {
            self.invalid(name, value, "expected a number");
            return None;
        };
        match check(number) {
            Ok(()) => Some(number),
            Err(reason) => {
                self.invalid(name, value, reason);
                None
            }
        }
    }

    fn in_range(&mut self, name: &str, required: bool, range: (f64, f64)) -> Option<f64> {
        self.number(name, required, |n| {
            if n < range.0 || n > range.1 {
                Err(format!("must be between {} and {}", range.0, range.1))
            } else {
                Ok(())
            }
        })
    }

    fn required_in_range(&mut self, name: &str, range: (f64, f64)) -> Option<f64> {
        self.in_range(name, true, range)
    }

    fn optional_in_range(&mut self, name: &str, range: (f64, f64)) -> Option<f64> {
        self.in_range(name, false, range)
    }

    fn positive(&mut self, name: &str, required: bool) -> Option<f64> {
        self.number(name, required, |n| {
            if n > 0.0 {
                Ok(())
            } else {
                Err("must be greater than 0".to_string())
            }
        })
    }

    fn required_positive(&mut self, name: &str) -> Option<f64> {
        self.positive(name, true)
    }

    fn optional_positive(&mut self, name: &str) -> Option<f64> {
        self.positive(name, false)
    }

    fn index(&mut self, name: &str, required: bool) -> Option<u32> {
        let value = self.value(name, required)?;
        match value.as_u64().and_then(|n| u32::try_from(n).ok()) {
            Some(index) => Some(index),
            None => {
                self.invalid(name, value, "expected a non-negative integer");
                None
            }
        }
    }

    fn required_u32(&mut self, name: &str) -> Option<u32> {
        self.index(name, true)
    }

    fn optional_u32(&mut self, name: &str) -> Option<u32> {
        self.index(name, false)
    }

    fn string(&mut self, name: &str, required: bool) -> Option<String> {
        let value = self.value(name, required)?;
        match value.as_str().map(str::trim).filter(|s| !s.is_empty()) {
            Some(text) => Some(text.to_string()),
            None => {
                self.invalid(name, value, "expected a non-empty string");
                None
            }
        }
    }

    fn required_string(&mut self, name: &str) -> Option<String> {
        self.string(name, true)
    }

    fn optional_string(&mut self, name: &str) -> Option<String> {
        self.string(name, false)
    }

    fn optional_bool(&mut self, name: &str) -> Option<bool> {
        let value = self.value(name, false)?;
        match value {
            Value::Bool(flag) => Some(*flag),
            Value::Number(n) if n.as_u64() == Some(0) => Some(false),
            Value::Number(n) if n.as_u64() == Some(1) => Some(true),
            _ => {
                self.invalid(name, value, "expected a boolean");
                None
            }
        }
    }

    fn required_enum<T>(&mut self, name: &str) -> Option<T>
    where
        T: FromStr<Err = UnknownVariant>,
    {
        let value = self.value(name, true)?;
        let parsed = value
            .as_str()
            .ok_or_else(|| "expected a string".to_string())
            .and_then(|s| s.parse::<T>().map_err(|e| format!("expected one of: {}", e.allowed.join(", "))));
        match parsed {
            Ok(variant) => Some(variant),
            Err(reason) => {
                self.invalid(name, value, reason);
                None
            }
        }
    }

    fn into_errors(self) -> Vec<EncodingError> {
        self.errors
    }

    fn finish<T>(self, value: T) -> Result<T, Vec<EncodingError>> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(self.errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::TriggerType;

    #[test]
    fn test_take_photo_defaults_payload_index() {
        let commands = encode_request(&ActionRequest::new("takePhoto")).unwrap();
        assert_eq!(
            commands,
            vec![ActionKind::TakePhoto {
                payload_position_index: 0,
                file_suffix: None
            }]
        );
    }

    #[test]
    fn gimbal_rotate_requires_rotate_mode() {
        let request = ActionRequest::new("gimbalRotate")
            .with_param("payloadPositionIndex", 0)
            .with_param("gimbalPitchRotateAngle", -90);
        let err = encode_request(&request).unwrap_err();
        assert_eq!(
            err,
            EncodingError::MissingParameter {
                action_type: "gimbalRotate".to_string(),
                parameter: "gimbalRotateMode".to_string(),
            }
        );
    }

    #[test]
    fn gimbal_rotate_needs_pitch_or_yaw() {
        let request = ActionRequest::new("gimbalRotate")
            .with_param("payloadPositionIndex", 0)
            .with_param("gimbalRotateMode", "absoluteAngle")
            .with_param("gimbalRollRotateAngle", 10);
        let errors = check_request(&request).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].parameter(),
            Some("gimbalPitchRotateAngle or gimbalYawRotateAngle")
        );
    }

    #[test]
    fn gimbal_rotate_encodes_enabled_axes() {
        let request = ActionRequest::new("gimbalRotate")
            .with_param("payloadPositionIndex", 1)
            .with_param("gimbalRotateMode", "relativeAngle")
            .with_param("gimbalYawRotateAngle", 45.5)
            .with_param("gimbalRotateTimeInSeconds", 2);
        let commands = encode_request(&request).unwrap();
        assert_eq!(
            commands,
            vec![ActionKind::GimbalRotate(GimbalRotate {
                payload_position_index: 1,
                rotate_mode: GimbalRotateMode::RelativeAngle,
                pitch: None,
                roll: None,
                yaw: Some(45.5),
                rotate_time: Some(2.0),
            })]
        );
    }

    #[test]
    fn check_request_reports_every_problem() {
        let request = ActionRequest::new("gimbalRotate")
            .with_param("gimbalRotateMode", "sideways")
            .with_param("gimbalPitchRotateAngle", 400)
            .with_param("speed", 3);
        let errors = check_request(&request).unwrap_err();
        let params: Vec<_> = errors.iter().filter_map(|e| e.parameter()).collect();
        assert_eq!(
            params,
            vec!["speed", "payloadPositionIndex", "gimbalRotateMode", "gimbalPitchRotateAngle"]
        );
    }

    #[test]
    fn unsupported_and_unknown_params_are_rejected() {
        let err = encode_request(&ActionRequest::new("doABarrelRoll")).unwrap_err();
        assert!(matches!(err, EncodingError::UnsupportedActionType { .. }));

        let err = encode_request(&ActionRequest::new("takePhoto").with_param("zoomLevel", 2)).unwrap_err();
        assert_eq!(err.parameter(), Some("zoomLevel"));
    }

    #[test]
    fn hover_rejects_non_positive_time() {
        let err = encode_request(&ActionRequest::new("hover").with_param("hoverTime", 0)).unwrap_err();
        match err {
            EncodingError::InvalidParameter { parameter, value, .. } => {
                assert_eq!(parameter, "hoverTime");
                assert_eq!(value, "0");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn aircraft_yaw_maps_to_rotate_yaw() {
        let request = ActionRequest::new("aircraftYaw")
            .with_param("aircraftYawRotateMode", "counterClockwise")
            .with_param("aircraftYawRotateAngle", -30.0);
        let commands = encode_request(&request).unwrap();
        assert_eq!(commands[0].func(), "rotateYaw");
        assert_eq!(commands[0].to_request(), request);
    }

    #[test]
    fn record_video_expands_to_three_commands() {
        let request = ActionRequest::new("recordVideo").with_param("durationSeconds", 8);
        let funcs: Vec<_> = encode_request(&request).unwrap().iter().map(|c| c.func()).collect();
        assert_eq!(funcs, vec!["startRecord", "hover", "stopRecord"]);
    }

    #[test]
    fn waypoint_actions_share_one_group_and_consume_ids() {
        let requests = vec![
            ActionRequest::new("takePhoto"),
            ActionRequest::new("hover").with_param("hoverTime", 2),
        ];
        let trigger = ActionTrigger {
            trigger_type: TriggerType::MultipleTiming,
            param: Some(3.0),
        };
        let mut ids = IdAllocator::starting_at(4, 10);
        let groups = encode_waypoint_actions(&requests, trigger, 2, 2, &mut ids).unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, 4);
        assert_eq!(groups[0].trigger, trigger);
        let ids_used: Vec<_> = groups[0].actions.iter().map(|a| a.id).collect();
        assert_eq!(ids_used, vec![10, 11]);
        assert_eq!(ids.next_action_id(), Some(12));
    }

    #[test]
    fn id_allocation_stops_at_the_last_identifier() {
        let mut ids = IdAllocator::starting_at(u32::MAX, u32::MAX - 1);
        assert_eq!(ids.next_group_id(), Some(u32::MAX));
        assert_eq!(ids.next_group_id(), None);
        assert_eq!(ids.next_action_id(), Some(u32::MAX - 1));
        assert_eq!(ids.next_action_id(), Some(u32::MAX));
        assert_eq!(ids.next_action_id(), None);
    }

    #[test]
    fn exhausted_action_ids_are_an_error() {
        let requests = vec![
            ActionRequest::new("takePhoto"),
            ActionRequest::new("hover").with_param("hoverTime", 2),
        ];
        let mut ids = IdAllocator::starting_at(0, u32::MAX);
        let err = encode_waypoint_actions(&requests, ActionTrigger::default(), 0, 0, &mut ids).unwrap_err();
        assert_eq!(err.action_index, 1);
        assert_eq!(err.source, EncodingError::IdsExhausted { kind: "action" });
        assert_eq!(err.source.parameter(), None);
    }

    #[test]
    fn failed_encoding_does_not_consume_ids() {
        let requests = vec![ActionRequest::new("takePhoto"), ActionRequest::new("hover")];
        let mut ids = IdAllocator::new();
        let err = encode_waypoint_actions(&requests, ActionTrigger::default(), 0, 0, &mut ids).unwrap_err();
        assert_eq!(err.action_index, 1);
        assert_eq!(ids, IdAllocator::new());
    }

    #[test]
    fn no_requests_yield_no_groups() {
        let mut ids = IdAllocator::new();
        let groups = encode_waypoint_actions(&[], ActionTrigger::default(), 0, 0, &mut ids).unwrap();
        assert!(groups.is_empty());
        assert_eq!(ids.next_group_id(), Some(0));
    }

    #[test]
    fn every_command_round_trips_through_its_request() {
        let requests = vec![
            ActionRequest::new("takePhoto").with_param("fileSuffix", "north"),
            ActionRequest::new("focus").with_param("focusX", 0.25),
            ActionRequest::new("zoom").with_param("focalLength", 56),
            ActionRequest::new("customDirName").with_param("directoryName", "bridge"),
            ActionRequest::new("stopRecord").with_param("payloadPositionIndex", 1),
        ];
        for request in requests {
            let commands = encode_request(&request).unwrap();
            let again = encode_request(&commands[0].to_request()).unwrap();
            assert_eq!(commands, again);
        }
    }
}
