use super::{KML_NAMESPACE, WPML_NAMESPACE};
use crate::actions::ActionKind;
use crate::error::{DocumentKind, RenderError};
use crate::mission::{ActionGroup, Folder, MissionConfig, MissionDocument, Placemark};
use crate::xml::XmlWriter;

type Result<T> = std::result::Result<T, String>;

/// The two rendered documents of one mission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocuments {
    pub template_kml: String,
    pub waylines_wpml: String,
}

/// Render both documents.
pub fn render(document: &MissionDocument) -> std::result::Result<RenderedDocuments, RenderError> {
    Ok(RenderedDocuments {
        template_kml: render_template(document)?,
        waylines_wpml: render_waylines(document)?,
    })
}

/// Render the visualization document.
pub fn render_template(document: &MissionDocument) -> std::result::Result<String, RenderError> {
    write_template(document).map_err(|reason| RenderError {
        document: DocumentKind::Template,
        reason,
    })
}

/// Render the execution document.
pub fn render_waylines(document: &MissionDocument) -> std::result::Result<String, RenderError> {
    write_waylines(document).map_err(|reason| RenderError {
        document: DocumentKind::Waylines,
        reason,
    })
}

fn open_kml(w: &mut XmlWriter) -> Result<()> {
    w.open_with_attributes("kml", &[("xmlns", KML_NAMESPACE), ("xmlns:wpml", WPML_NAMESPACE)])?;
    w.open("Document")
}

fn close_kml(w: &mut XmlWriter) -> Result<()> {
    w.close("Document")?;
    w.close("kml")
}

fn write_coordinates(w: &mut XmlWriter, placemark: &Placemark) -> Result<()> {
    w.open("Point")?;
    w.leaf("coordinates", format_args!("{},{}", placemark.longitude, placemark.latitude))?;
    w.close("Point")
}

fn write_template(document: &MissionDocument) -> Result<String> {
    let info = &document.info;
    let mut w = XmlWriter::new()?;
    open_kml(&mut w)?;

    w.leaf("name", &info.name)?;
    w.optional_leaf("description", info.description.as_deref())?;
    w.optional_leaf("wpml:author", info.author.as_deref())?;
    w.optional_leaf("wpml:createTime", info.create_time.map(|t| t.timestamp_millis()))?;
    w.optional_leaf("wpml:updateTime", info.update_time.map(|t| t.timestamp_millis()))?;

    w.open("Folder")?;
    w.leaf("wpml:templateType", document.folder.template_type)?;
    w.leaf("wpml:templateId", document.folder.template_id)?;
    for placemark in &document.folder.placemarks {
        w.open("Placemark")?;
        w.leaf("name", format_args!("Waypoint {}", placemark.index + 1))?;
        write_coordinates(&mut w, placemark)?;
        w.leaf("wpml:index", placemark.index)?;
        w.close("Placemark")?;
    }
    w.close("Folder")?;

    close_kml(&mut w)?;
    w.finish()
}

fn write_waylines(document: &MissionDocument) -> Result<String> {
    let mut w = XmlWriter::new()?;
    open_kml(&mut w)?;
    write_mission_config(&mut w, &document.config)?;
    write_folder(&mut w, &document.folder)?;
    close_kml(&mut w)?;
    w.finish()
}

fn write_mission_config(w: &mut XmlWriter, config: &MissionConfig) -> Result<()> {
    w.open("wpml:missionConfig")?;
    w.leaf("wpml:flyToWaylineMode", config.climb_mode.fly_to_wayline_mode())?;
    w.leaf("wpml:finishAction", config.finish_action)?;
    w.leaf("wpml:exitOnRCLost", "executeLostAction")?;
    w.leaf("wpml:executeRCLostAction", "goBack")?;
    w.leaf("wpml:takeOffSecurityHeight", config.take_off_security_height)?;
    w.leaf("wpml:globalTransitionalSpeed", config.global_transitional_speed)?;
    w.leaf("wpml:globalRTHHeight", config.global_rth_height)?;
    if let Some(point) = &config.take_off_ref_point {
        w.leaf(
            "wpml:takeOffRefPoint",
            format_args!("{},{},{}", point.latitude, point.longitude, point.height),
        )?;
        w.optional_leaf("wpml:takeOffRefPointAGLHeight", point.agl_height)?;
    }

    let (drone_value, drone_sub_value) = config.drone.enum_value();
    w.open("wpml:droneInfo")?;
    w.leaf("wpml:droneEnumValue", drone_value)?;
    w.leaf("wpml:droneSubEnumValue", drone_sub_value)?;
    w.close("wpml:droneInfo")?;

    w.open("wpml:payloadInfo")?;
    w.leaf("wpml:payloadEnumValue", config.payload.enum_value())?;
    w.leaf("wpml:payloadPositionIndex", config.payload_position_index)?;
    w.close("wpml:payloadInfo")?;
    w.close("wpml:missionConfig")
}

fn write_folder(w: &mut XmlWriter, folder: &Folder) -> Result<()> {
    w.open("Folder")?;
    w.leaf("wpml:templateId", folder.template_id)?;
    w.leaf("wpml:waylineId", folder.wayline_id)?;
    w.leaf("wpml:executeHeightMode", folder.height_mode)?;
    w.leaf("wpml:autoFlightSpeed", folder.auto_flight_speed)?;
    w.leaf("wpml:globalHeight", folder.global_height)?;
    w.leaf("wpml:distance", folder.distance_m)?;
    w.leaf("wpml:duration", folder.duration_s)?;
    w.leaf("wpml:globalWaypointTurnMode", folder.global_turn_mode)?;
    w.leaf("wpml:globalWaypointTurnDampingDist", folder.global_turn_damping_dist)?;
    w.flag("wpml:globalUseStraightLine", folder.global_use_straight_line)?;

    w.open("wpml:globalWaypointHeadingParam")?;
    w.leaf("wpml:waypointHeadingMode", folder.heading_mode)?;
    w.close("wpml:globalWaypointHeadingParam")?;
    w.leaf("wpml:gimbalPitchMode", folder.gimbal_pitch_mode)?;

    if !folder.image_formats.is_empty() || folder.low_light_smart {
        w.open("wpml:payloadParam")?;
        if !folder.image_formats.is_empty() {
            let formats: Vec<_> = folder.image_formats.iter().map(|lens| lens.as_str()).collect();
            w.leaf("wpml:imageFormat", formats.join(","))?;
        }
        w.flag("wpml:useLowLightSmart", folder.low_light_smart)?;
        w.close("wpml:payloadParam")?;
    }

    for placemark in &folder.placemarks {
        write_placemark(w, folder, placemark)?;
    }
    w.close("Folder")
}

/// Per-waypoint settings are only written where they differ from the
/// folder-level value they would otherwise inherit.
fn write_placemark(w: &mut XmlWriter, folder: &Folder, placemark: &Placemark) -> Result<()> {
    w.open("Placemark")?;
    write_coordinates(w, placemark)?;
    w.leaf("wpml:index", placemark.index)?;
    w.leaf("wpml:executeHeight", placemark.height)?;

    if placemark.speed != folder.auto_flight_speed {
        w.leaf("wpml:waypointSpeed", placemark.speed)?;
    }
    if placemark.turn_mode != folder.global_turn_mode
        || placemark.turn_damping_dist != folder.global_turn_damping_dist
    {
        w.open("wpml:waypointTurnParam")?;
        w.leaf("wpml:waypointTurnMode", placemark.turn_mode)?;
        w.leaf("wpml:waypointTurnDampingDist", placemark.turn_damping_dist)?;
        w.close("wpml:waypointTurnParam")?;
    }
    if placemark.use_straight_line != folder.global_use_straight_line {
        w.flag("wpml:useStraightLine", placemark.use_straight_line)?;
    }

    for group in &placemark.action_groups {
        write_action_group(w, group)?;
    }
    w.close("Placemark")
}

fn write_action_group(w: &mut XmlWriter, group: &ActionGroup) -> Result<()> {
    w.open("wpml:actionGroup")?;
    w.leaf("wpml:actionGroupId", group.id)?;
    w.leaf("wpml:actionGroupStartIndex", group.start_index)?;
    w.leaf("wpml:actionGroupEndIndex", group.end_index)?;
    w.leaf("wpml:actionGroupMode", "sequence")?;

    w.open("wpml:actionTrigger")?;
    w.leaf("wpml:actionTriggerType", group.trigger.trigger_type)?;
    w.optional_leaf("wpml:actionTriggerParam", group.trigger.param)?;
    w.close("wpml:actionTrigger")?;

    for action in &group.actions {
        w.open("wpml:action")?;
        w.leaf("wpml:actionId", action.id)?;
        w.leaf("wpml:actionActuatorFunc", action.kind.func())?;
        w.open("wpml:actionActuatorFuncParam")?;
        write_action_params(w, &action.kind)?;
        w.close("wpml:actionActuatorFuncParam")?;
        w.close("wpml:action")?;
    }
    w.close("wpml:actionGroup")
}

fn write_action_params(w: &mut XmlWriter, kind: &ActionKind) -> Result<()> {
    match kind {
        ActionKind::TakePhoto {
            payload_position_index,
            file_suffix,
        }
        | ActionKind::StartRecord {
            payload_position_index,
            file_suffix,
        } => {
            w.leaf("wpml:payloadPositionIndex", payload_position_index)?;
            w.optional_leaf("wpml:fileSuffix", file_suffix.as_deref())?;
        }
        ActionKind::StopRecord { payload_position_index } => {
            w.leaf("wpml:payloadPositionIndex", payload_position_index)?;
        }
        ActionKind::Focus {
            payload_position_index,
            focus_x,
            focus_y,
            infinite,
        } => {
            w.leaf("wpml:payloadPositionIndex", payload_position_index)?;
            w.flag("wpml:isPointFocus", true)?;
            w.leaf("wpml:focusX", focus_x)?;
            w.leaf("wpml:focusY", focus_y)?;
            w.flag("wpml:isInfiniteFocus", *infinite)?;
        }
        ActionKind::Zoom {
            payload_position_index,
            focal_length,
        } => {
            w.leaf("wpml:payloadPositionIndex", payload_position_index)?;
            w.leaf("wpml:focalLength", focal_length)?;
        }
        ActionKind::CustomDirName {
            payload_position_index,
            directory_name,
        } => {
            w.leaf("wpml:payloadPositionIndex", payload_position_index)?;
            w.leaf("wpml:directoryName", directory_name)?;
        }
        ActionKind::GimbalRotate(gimbal) => {
            w.leaf("wpml:payloadPositionIndex", gimbal.payload_position_index)?;
            w.leaf("wpml:gimbalHeadingYawBase", "north")?;
            w.leaf("wpml:gimbalRotateMode", gimbal.rotate_mode)?;
            for (axis, angle) in [("Pitch", gimbal.pitch), ("Roll", gimbal.roll), ("Yaw", gimbal.yaw)] {
                w.flag(&format!("wpml:gimbal{axis}RotateEnable"), angle.is_some())?;
                w.leaf(&format!("wpml:gimbal{axis}RotateAngle"), angle.unwrap_or(0.0))?;
            }
            w.flag("wpml:gimbalRotateTimeEnable", gimbal.rotate_time.is_some())?;
            w.leaf("wpml:gimbalRotateTime", gimbal.rotate_time.unwrap_or(0.0))?;
        }
        ActionKind::RotateYaw { heading, path_mode } => {
            w.leaf("wpml:aircraftHeading", heading)?;
            w.leaf("wpml:aircraftPathMode", path_mode)?;
        }
        ActionKind::Hover { hover_time } => {
            w.leaf("wpml:hoverTime", hover_time)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build_mission;
    use crate::models::{ActionRequest, Waylines, Waypoint};

    fn mission() -> Waylines {
        let mut waylines = Waylines::new(
            "river & bridge",
            "M3E",
            "M3E",
            vec![
                Waypoint::new(39.9042, 116.4074, 50.0).with_action(ActionRequest::new("takePhoto")),
                Waypoint::new(39.9052, 116.4084, 60.0),
            ],
        );
        waylines.global_speed = Some(5.0);
        waylines
    }

    #[test]
    fn test_coordinates_are_longitude_first() {
        let document = build_mission(&mission()).unwrap();
        let rendered = render(&document).unwrap();
        assert!(rendered.template_kml.contains("<coordinates>116.4074,39.9042</coordinates>"));
        assert!(rendered.waylines_wpml.contains("<coordinates>116.4084,39.9052</coordinates>"));
        assert!(rendered.template_kml.contains("<name>river &amp; bridge</name>"));
    }

    #[test]
    fn inherited_values_are_not_repeated_per_placemark() {
        let mut waylines = mission();
        waylines.waypoints[1].speed = Some(7.5);
        let rendered = render_waylines(&build_mission(&waylines).unwrap()).unwrap();
        assert_eq!(rendered.matches("<wpml:waypointSpeed>").count(), 1);
        assert!(rendered.contains("<wpml:waypointSpeed>7.5</wpml:waypointSpeed>"));
        assert!(!rendered.contains("<wpml:waypointTurnParam>"));
        assert!(!rendered.contains("<wpml:useStraightLine>"));
    }

    #[test]
    fn action_group_is_fully_described() {
        let rendered = render_waylines(&build_mission(&mission()).unwrap()).unwrap();
        assert_eq!(rendered.matches("<wpml:actionGroup>").count(), 1);
        assert!(rendered.contains("<wpml:actionTriggerType>reachPoint</wpml:actionTriggerType>"));
        assert!(rendered.contains("<wpml:actionActuatorFunc>takePhoto</wpml:actionActuatorFunc>"));
        assert!(!rendered.contains("<wpml:actionTriggerParam>"));
    }

    #[test]
    fn take_off_point_is_omitted_for_start_point_mode() {
        let rendered = render_waylines(&build_mission(&mission()).unwrap()).unwrap();
        assert!(!rendered.contains("takeOffRefPoint"));
        assert!(rendered.contains("<wpml:executeHeightMode>relativeToStartPoint</wpml:executeHeightMode>"));
    }

    #[test]
    fn low_light_flag_opens_payload_param() {
        let rendered = render_waylines(&build_mission(&mission()).unwrap()).unwrap();
        assert!(!rendered.contains("<wpml:payloadParam>"));

        let mut waylines = mission();
        waylines.use_low_light_smart = Some(true);
        let rendered = render_waylines(&build_mission(&waylines).unwrap()).unwrap();
        assert!(rendered.contains("<wpml:useLowLightSmart>1</wpml:useLowLightSmart>"));
        assert!(!rendered.contains("<wpml:imageFormat>"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let document = build_mission(&mission()).unwrap();
        assert_eq!(render(&document).unwrap(), render(&document).unwrap());
    }
}
