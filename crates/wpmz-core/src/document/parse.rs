use crate::actions::{ActionKind, GimbalRotate};
use crate::enums::{ClimbMode, DroneModel, PayloadModel, PhotoLens, TemplateType};
use crate::error::{ContainerError, DocumentKind};
use crate::mission::{
    Action, ActionGroup, ActionTrigger, DocumentInfo, Folder, MissionConfig, MissionDocument, Placemark,
};
use crate::models::TakeOffRefPoint;
use crate::xml::{self, Element};
use chrono::{DateTime, Utc};
use tracing::debug;

type Result<T> = std::result::Result<T, String>;

/// What the visualization document contributes to the tree.
struct Template {
    info: DocumentInfo,
    template_type: TemplateType,
    points: Vec<(u32, f64, f64)>,
}

/// Rebuild the mission tree from the two document texts.
///
/// The documents must describe the same waypoints in the same order at the
/// same coordinates.
pub fn parse_documents(template_kml: &str, waylines_wpml: &str) -> std::result::Result<MissionDocument, ContainerError> {
    let template = read_template(template_kml).map_err(|reason| ContainerError::MalformedDocument {
        document: DocumentKind::Template,
        reason,
    })?;
    let (config, mut folder) = read_waylines(waylines_wpml).map_err(|reason| ContainerError::MalformedDocument {
        document: DocumentKind::Waylines,
        reason,
    })?;

    check_consistency(&template.points, &folder.placemarks)?;
    folder.template_type = template.template_type;

    debug!(placemarks = folder.placemarks.len(), "parsed mission documents");
    Ok(MissionDocument {
        info: template.info,
        config,
        folder,
    })
}

fn document_root(text: &str) -> Result<Element> {
    let root = xml::parse(text)?;
    if root.name != "kml" {
        return Err(format!("root element is <{}>, expected <kml>", root.name));
    }
    let document = root.required("Document")?.clone();
    Ok(document)
}

fn read_template(text: &str) -> Result<Template> {
    let document = document_root(text)?;
    let folder = document.required("Folder")?;

    let info = DocumentInfo {
        name: document.text_of("name")?.to_string(),
        description: document.optional_text("description").map(str::to_string),
        author: document.optional_text("author").map(str::to_string),
        create_time: timestamp(&document, "createTime")?,
        update_time: timestamp(&document, "updateTime")?,
    };

    let points = folder
        .children_named("Placemark")
        .map(|placemark| {
            let (longitude, latitude) = coordinates(placemark)?;
            Ok((placemark.value("index")?, latitude, longitude))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Template {
        info,
        template_type: folder.value("templateType")?,
        points,
    })
}

fn timestamp(element: &Element, name: &str) -> Result<Option<DateTime<Utc>>> {
    match element.optional_value::<i64>(name)? {
        Some(millis) => DateTime::from_timestamp_millis(millis)
            .map(Some)
            .ok_or_else(|| format!("<{name}> is out of range: {millis}")),
        None => Ok(None),
    }
}

/// `<Point><coordinates>lon,lat</coordinates></Point>`
fn coordinates(placemark: &Element) -> Result<(f64, f64)> {
    let text = placemark.required("Point")?.text_of("coordinates")?;
    let mut parts = text.split(',').map(str::trim);
    match (parts.next(), parts.next()) {
        (Some(lon), Some(lat)) => {
            let parse = |s: &str| {
                s.parse::<f64>()
                    .map_err(|e| format!("invalid coordinates '{text}': {e}"))
            };
            Ok((parse(lon)?, parse(lat)?))
        }
        _ => Err(format!("invalid coordinates '{text}'")),
    }
}

fn read_waylines(text: &str) -> Result<(MissionConfig, Folder)> {
    let document = document_root(text)?;
    let config = read_mission_config(document.required("missionConfig")?)?;
    let folder = read_folder(document.required("Folder")?)?;
    Ok((config, folder))
}

fn read_mission_config(element: &Element) -> Result<MissionConfig> {
    let mode = element.text_of("flyToWaylineMode")?;
    let climb_mode = ClimbMode::from_fly_to_wayline_mode(mode)
        .ok_or_else(|| format!("unknown flyToWaylineMode '{mode}'"))?;

    let take_off_ref_point = match element.optional_text("takeOffRefPoint") {
        Some(text) => {
            let values = text
                .split(',')
                .map(|s| s.trim().parse::<f64>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| format!("invalid takeOffRefPoint '{text}': {e}"))?;
            let [latitude, longitude, height] = values[..] else {
                return Err(format!("invalid takeOffRefPoint '{text}'"));
            };
            Some(TakeOffRefPoint {
                latitude,
                longitude,
                height,
                agl_height: element.optional_value("takeOffRefPointAGLHeight")?,
            })
        }
        None => None,
    };

    let drone_info = element.required("droneInfo")?;
    let (value, sub_value) = (
        drone_info.value::<u32>("droneEnumValue")?,
        drone_info.value::<u32>("droneSubEnumValue")?,
    );
    let drone = DroneModel::from_enum_value(value, sub_value)
        .ok_or_else(|| format!("unknown drone enum value {value}/{sub_value}"))?;

    let payload_info = element.required("payloadInfo")?;
    let value = payload_info.value::<u32>("payloadEnumValue")?;
    let payload =
        PayloadModel::from_enum_value(value).ok_or_else(|| format!("unknown payload enum value {value}"))?;

    Ok(MissionConfig {
        climb_mode,
        finish_action: element.value("finishAction")?,
        take_off_security_height: element.value("takeOffSecurityHeight")?,
        global_transitional_speed: element.value("globalTransitionalSpeed")?,
        global_rth_height: element.value("globalRTHHeight")?,
        take_off_ref_point,
        drone,
        payload,
        payload_position_index: payload_info.value("payloadPositionIndex")?,
    })
}

fn read_folder(element: &Element) -> Result<Folder> {
    let payload_param = element.child("payloadParam");
    let image_formats = match payload_param.and_then(|param| param.optional_text("imageFormat")) {
        Some(formats) => formats
            .split(',')
            .map(|lens| lens.trim().parse::<PhotoLens>().map_err(|e| e.to_string()))
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };
    let low_light_smart = match payload_param {
        Some(param) => param.optional_flag("useLowLightSmart")?.unwrap_or(false),
        None => false,
    };

    let mut folder = Folder {
        // Only the visualization document carries the template type.
        template_type: TemplateType::Waypoint,
        template_id: element.value("templateId")?,
        wayline_id: element.value("waylineId")?,
        height_mode: element.value("executeHeightMode")?,
        global_height: element.value("globalHeight")?,
        auto_flight_speed: element.value("autoFlightSpeed")?,
        global_turn_mode: element.value("globalWaypointTurnMode")?,
        global_turn_damping_dist: element.value("globalWaypointTurnDampingDist")?,
        global_use_straight_line: element.flag("globalUseStraightLine")?,
        heading_mode: element.required("globalWaypointHeadingParam")?.value("waypointHeadingMode")?,
        gimbal_pitch_mode: element.value("gimbalPitchMode")?,
        image_formats,
        low_light_smart,
        distance_m: element.value("distance")?,
        duration_s: element.value("duration")?,
        placemarks: Vec::new(),
    };

    folder.placemarks = element
        .children_named("Placemark")
        .map(|placemark| read_placemark(&folder, placemark))
        .collect::<Result<Vec<_>>>()?;
    Ok(folder)
}

/// Absent per-waypoint settings inherit the folder value.
fn read_placemark(folder: &Folder, element: &Element) -> Result<Placemark> {
    let (longitude, latitude) = coordinates(element)?;
    let (turn_mode, turn_damping_dist) = match element.child("waypointTurnParam") {
        Some(turn) => (
            turn.value("waypointTurnMode")?,
            turn.value("waypointTurnDampingDist")?,
        ),
        None => (folder.global_turn_mode, folder.global_turn_damping_dist),
    };

    Ok(Placemark {
        index: element.value("index")?,
        latitude,
        longitude,
        height: element.value("executeHeight")?,
        speed: element
            .optional_value("waypointSpeed")?
            .unwrap_or(folder.auto_flight_speed),
        turn_mode,
        turn_damping_dist,
        use_straight_line: element
            .optional_flag("useStraightLine")?
            .unwrap_or(folder.global_use_straight_line),
        action_groups: element
            .children_named("actionGroup")
            .map(read_action_group)
            .collect::<Result<Vec<_>>>()?,
    })
}

fn read_action_group(element: &Element) -> Result<ActionGroup> {
    let trigger = element.required("actionTrigger")?;
    Ok(ActionGroup {
        id: element.value("actionGroupId")?,
        start_index: element.value("actionGroupStartIndex")?,
        end_index: element.value("actionGroupEndIndex")?,
        trigger: ActionTrigger {
            trigger_type: trigger.value("actionTriggerType")?,
            param: trigger.optional_value("actionTriggerParam")?,
        },
        actions: element
            .children_named("action")
            .map(read_action)
            .collect::<Result<Vec<_>>>()?,
    })
}

fn read_action(element: &Element) -> Result<Action> {
    let func = element.text_of("actionActuatorFunc")?;
    let params = element.required("actionActuatorFuncParam")?;
    let kind = match func {
        "takePhoto" => ActionKind::TakePhoto {
            payload_position_index: params.value("payloadPositionIndex")?,
            file_suffix: params.optional_text("fileSuffix").map(str::to_string),
        },
        "startRecord" => ActionKind::StartRecord {
            payload_position_index: params.value("payloadPositionIndex")?,
            file_suffix: params.optional_text("fileSuffix").map(str::to_string),
        },
        "stopRecord" => ActionKind::StopRecord {
            payload_position_index: params.value("payloadPositionIndex")?,
        },
        "focus" => ActionKind::Focus {
            payload_position_index: params.value("payloadPositionIndex")?,
            focus_x: params.value("focusX")?,
            focus_y: params.value("focusY")?,
            infinite: params.flag("isInfiniteFocus")?,
        },
        "zoom" => ActionKind::Zoom {
            payload_position_index: params.value("payloadPositionIndex")?,
            focal_length: params.value("focalLength")?,
        },
        "customDirName" => ActionKind::CustomDirName {
            payload_position_index: params.value("payloadPositionIndex")?,
            directory_name: params.text_of("directoryName")?.to_string(),
        },
        "gimbalRotate" => ActionKind::GimbalRotate(read_gimbal_rotate(params)?),
        "rotateYaw" => ActionKind::RotateYaw {
            heading: params.value("aircraftHeading")?,
            path_mode: params.value("aircraftPathMode")?,
        },
        "hover" => ActionKind::Hover {
            hover_time: params.value("hoverTime")?,
        },
        other => return Err(format!("unsupported actuator function '{other}'")),
    };
    Ok(Action {
        id: element.value("actionId")?,
        kind,
    })
}

fn read_gimbal_rotate(params: &Element) -> Result<GimbalRotate> {
    let enabled = |axis: &str| -> Result<Option<f64>> {
        if params.flag(&format!("gimbal{axis}RotateEnable"))? {
            params.value(&format!("gimbal{axis}RotateAngle")).map(Some)
        } else {
            Ok(None)
        }
    };
    let rotate_time = if params.flag("gimbalRotateTimeEnable")? {
        Some(params.value("gimbalRotateTime")?)
    } else {
        None
    };
    Ok(GimbalRotate {
        payload_position_index: params.value("payloadPositionIndex")?,
        rotate_mode: params.value("gimbalRotateMode")?,
        pitch: enabled("Pitch")?,
        roll: enabled("Roll")?,
        yaw: enabled("Yaw")?,
        rotate_time,
    })
}

fn check_consistency(points: &[(u32, f64, f64)], placemarks: &[Placemark]) -> std::result::Result<(), ContainerError> {
    let inconsistent = |reason: String| ContainerError::InconsistentDocuments { reason };

    if points.len() != placemarks.len() {
        return Err(inconsistent(format!(
            "template has {} waypoints, waylines has {}",
            points.len(),
            placemarks.len()
        )));
    }
    for (position, (&(index, latitude, longitude), placemark)) in points.iter().zip(placemarks).enumerate() {
        if index != position as u32 || placemark.index != position as u32 {
            return Err(inconsistent(format!(
                "waypoint {position} has index {index} in template and {} in waylines",
                placemark.index
            )));
        }
        if latitude != placemark.latitude || longitude != placemark.longitude {
            return Err(inconsistent(format!(
                "waypoint {position} is at {latitude},{longitude} in template but {},{} in waylines",
                placemark.latitude, placemark.longitude
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_mission;
    use crate::document::render;
    use crate::models::{ActionRequest, Waylines, Waypoint};

    fn rendered() -> (MissionDocument, crate::document::RenderedDocuments) {
        let mut waylines = Waylines::new(
            "survey",
            "M30T",
            "M30T",
            vec![
                Waypoint::new(39.9042, 116.4074, 50.0).with_action(
                    ActionRequest::new("gimbalRotate")
                        .with_param("payloadPositionIndex", 0)
                        .with_param("gimbalRotateMode", "absoluteAngle")
                        .with_param("gimbalPitchRotateAngle", -45.0),
                ),
                Waypoint::new(39.9052, 116.4084, 60.0),
            ],
        );
        waylines.waypoints[1].speed = Some(3.5);
        let document = build_mission(&waylines).unwrap();
        let rendered = render(&document).unwrap();
        (document, rendered)
    }

    #[test]
    fn test_parse_restores_rendered_tree() {
        let (document, rendered) = rendered();
        let parsed = parse_documents(&rendered.template_kml, &rendered.waylines_wpml).unwrap();
        assert_eq!(parsed, document);
    }

    #[test]
    fn mismatched_coordinates_are_inconsistent() {
        let (_, rendered) = rendered();
        let template = rendered
            .template_kml
            .replace("116.4084,39.9052", "116.5,39.9052");
        let err = parse_documents(&template, &rendered.waylines_wpml).unwrap_err();
        assert!(matches!(err, ContainerError::InconsistentDocuments { .. }));
    }

    #[test]
    fn truncated_waylines_is_malformed() {
        let (_, rendered) = rendered();
        let half = &rendered.waylines_wpml[..rendered.waylines_wpml.len() / 2];
        let err = parse_documents(&rendered.template_kml, half).unwrap_err();
        assert!(matches!(
            err,
            ContainerError::MalformedDocument {
                document: DocumentKind::Waylines,
                ..
            }
        ));
    }

    #[test]
    fn unknown_actuator_function_is_malformed() {
        let (_, rendered) = rendered();
        let waylines = rendered.waylines_wpml.replace(">gimbalRotate<", ">spray<");
        let err = parse_documents(&rendered.template_kml, &waylines).unwrap_err();
        assert!(err.to_string().contains("spray"));
    }
}
