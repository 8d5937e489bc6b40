//! Enumerations shared by the mission request and the mission documents.
//!
//! Every enumeration has a fixed wire name per variant. The same names are
//! accepted in mission requests, written into the documents and read back.
//! A variant may also list request aliases (`Variant => "wire" | "alias"`),
//! which parse to that variant but are never written.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A textual value that does not name any variant of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}' (expected one of: {})", .allowed.join(", "))]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
    pub allowed: &'static [&'static str],
}

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident: $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal $(| $alias:literal)* ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Wire names of every variant, in declaration order.
            pub const NAMES: &'static [&'static str] = &[$($wire),+];

            /// Every name `from_str` accepts: wire names followed by aliases.
            pub const ACCEPTED: &'static [&'static str] = &[$($wire,)+ $($($alias,)*)+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $wire ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $wire $(| $alias)* => Ok($name::$variant), )+
                    _ => Err(UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                        allowed: Self::ACCEPTED,
                    }),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(de::Error::custom)
            }
        }
    };
}

wire_enum! {
    /// Supported airframes.
    pub enum DroneModel: "drone model" {
        M300 => "M300",
        M350 => "M350",
        M30 => "M30",
        M30T => "M30T",
        M3E => "M3E",
        M3T => "M3T",
        M3M => "M3M",
        M3D => "M3D",
        M3TD => "M3TD",
    }
}

impl DroneModel {
    /// `(droneEnumValue, droneSubEnumValue)` as used by the flight controller.
    pub fn enum_value(self) -> (u32, u32) {
        match self {
            DroneModel::M300 => (60, 0),
            DroneModel::M350 => (89, 0),
            DroneModel::M30 => (67, 0),
            DroneModel::M30T => (67, 1),
            DroneModel::M3E => (77, 0),
            DroneModel::M3T => (77, 1),
            DroneModel::M3M => (77, 2),
            DroneModel::M3D => (91, 0),
            DroneModel::M3TD => (91, 1),
        }
    }

    pub fn from_enum_value(value: u32, sub_value: u32) -> Option<Self> {
        [
            DroneModel::M300,
            DroneModel::M350,
            DroneModel::M30,
            DroneModel::M30T,
            DroneModel::M3E,
            DroneModel::M3T,
            DroneModel::M3M,
            DroneModel::M3D,
            DroneModel::M3TD,
        ]
        .into_iter()
        .find(|model| model.enum_value() == (value, sub_value))
    }

    /// Airframes that carry exchangeable gimbal payloads.
    pub fn has_payload_mount(self) -> bool {
        matches!(self, DroneModel::M300 | DroneModel::M350)
    }
}

wire_enum! {
    /// Camera payloads, either mounted on a gimbal port or built into the airframe.
    pub enum PayloadModel: "payload model" {
        H20 => "H20",
        H20T => "H20T",
        H20N => "H20N",
        P1 => "P1",
        M30 => "M30",
        M30T => "M30T",
        M3E => "M3E",
        M3T => "M3T",
        M3M => "M3M",
        M3D => "M3D",
        M3TD => "M3TD",
    }
}

impl PayloadModel {
    pub fn enum_value(self) -> u32 {
        match self {
            PayloadModel::H20 => 42,
            PayloadModel::H20T => 43,
            PayloadModel::H20N => 61,
            PayloadModel::P1 => 50,
            PayloadModel::M30 => 52,
            PayloadModel::M30T => 53,
            PayloadModel::M3E => 66,
            PayloadModel::M3T => 67,
            PayloadModel::M3M => 68,
            PayloadModel::M3D => 80,
            PayloadModel::M3TD => 81,
        }
    }

    pub fn from_enum_value(value: u32) -> Option<Self> {
        [
            PayloadModel::H20,
            PayloadModel::H20T,
            PayloadModel::H20N,
            PayloadModel::P1,
            PayloadModel::M30,
            PayloadModel::M30T,
            PayloadModel::M3E,
            PayloadModel::M3T,
            PayloadModel::M3M,
            PayloadModel::M3D,
            PayloadModel::M3TD,
        ]
        .into_iter()
        .find(|model| model.enum_value() == value)
    }

    /// The airframe an integrated camera belongs to, `None` for gimbal payloads.
    pub fn integrated_airframe(self) -> Option<DroneModel> {
        match self {
            PayloadModel::H20 | PayloadModel::H20T | PayloadModel::H20N | PayloadModel::P1 => None,
            PayloadModel::M30 => Some(DroneModel::M30),
            PayloadModel::M30T => Some(DroneModel::M30T),
            PayloadModel::M3E => Some(DroneModel::M3E),
            PayloadModel::M3T => Some(DroneModel::M3T),
            PayloadModel::M3M => Some(DroneModel::M3M),
            PayloadModel::M3D => Some(DroneModel::M3D),
            PayloadModel::M3TD => Some(DroneModel::M3TD),
        }
    }

    /// Whether this payload can fly on the given airframe.
    pub fn fits(self, drone: DroneModel) -> bool {
        match self.integrated_airframe() {
            Some(airframe) => airframe == drone,
            None => drone.has_payload_mount(),
        }
    }
}

wire_enum! {
    pub enum TemplateType: "template type" {
        Waypoint => "waypoint",
        Mapping2d => "mapping2d",
        Mapping3d => "mapping3d",
        MappingStrip => "mappingStrip",
    }
}

wire_enum! {
    /// Altitude reference frame for waypoint heights.
    pub enum HeightMode: "height mode" {
        RelativeToStartPoint => "relativeToStartPoint",
        RelativeToTakeoff => "relativeToTakeoff",
        Egm96 => "EGM96",
        Wgs84 => "WGS84",
        AboveGroundLevel => "aboveGroundLevel",
        RealTimeFollowSurface => "realTimeFollowSurface",
    }
}

impl HeightMode {
    /// Modes whose heights are meaningless without a take-off reference point.
    pub fn requires_take_off_ref_point(self) -> bool {
        matches!(self, HeightMode::RelativeToTakeoff | HeightMode::AboveGroundLevel)
    }
}

wire_enum! {
    /// What the aircraft does after the last waypoint.
    pub enum FinishAction: "finish action" {
        GoHome => "goHome",
        AutoLand => "autoLand",
        NoAction => "noAction",
        GotoFirstWaypoint => "gotoFirstWaypoint",
    }
}

wire_enum! {
    pub enum TurnMode: "turn mode" {
        CoordinateTurn => "coordinateTurn",
        ToPointAndStopWithDiscontinuityCurvature => "toPointAndStopWithDiscontinuityCurvature",
        ToPointAndStopWithContinuityCurvature => "toPointAndStopWithContinuityCurvature",
        ToPointAndPassWithContinuityCurvature => "toPointAndPassWithContinuityCurvature",
    }
}

wire_enum! {
    /// Condition that fires an action group.
    pub enum TriggerType: "trigger type" {
        ReachPoint => "reachPoint",
        PassPoint => "passPoint",
        Manual => "manual",
        BetweenAdjacentPoints => "betweenAdjacentPoints",
        MultipleTiming => "multipleTiming",
        MultipleDistance => "multipleDistance",
    }
}

impl TriggerType {
    /// Interval triggers carry a positive seconds/meters parameter.
    pub fn takes_param(self) -> bool {
        matches!(self, TriggerType::MultipleTiming | TriggerType::MultipleDistance)
    }
}

wire_enum! {
    /// How the aircraft climbs to the first waypoint.
    pub enum ClimbMode: "climb mode" {
        Vertical => "vertical",
        Inclined => "inclined",
    }
}

impl ClimbMode {
    /// `flyToWaylineMode` value in the execution document.
    pub fn fly_to_wayline_mode(self) -> &'static str {
        match self {
            ClimbMode::Vertical => "safely",
            ClimbMode::Inclined => "pointToPoint",
        }
    }

    pub fn from_fly_to_wayline_mode(value: &str) -> Option<Self> {
        match value {
            "safely" => Some(ClimbMode::Vertical),
            "pointToPoint" => Some(ClimbMode::Inclined),
            _ => None,
        }
    }
}

wire_enum! {
    /// Aircraft heading behaviour along the route.
    pub enum HeadingMode: "aircraft yaw mode" {
        FollowWayline => "followWayline" | "followRoute",
        /// Heading is left to the pilot.
        Manually => "manually" | "manual" | "free",
        Fixed => "fixed",
        SmoothTransition => "smoothTransition",
    }
}

wire_enum! {
    pub enum GimbalPitchMode: "gimbal pitch mode" {
        UsePointSetting => "usePointSetting",
        Manual => "manual" | "free",
    }
}

wire_enum! {
    /// Lenses stored when a photo is taken.
    pub enum PhotoLens: "photo setting" {
        Wide => "wide",
        Zoom => "zoom",
        Ir => "ir",
        Vision => "vision",
    }
}

wire_enum! {
    pub enum GimbalRotateMode: "gimbal rotate mode" {
        AbsoluteAngle => "absoluteAngle",
        RelativeAngle => "relativeAngle",
    }
}

wire_enum! {
    /// Rotation direction for an aircraft yaw action.
    pub enum YawPathMode: "aircraft yaw rotate mode" {
        Clockwise => "clockwise",
        CounterClockwise => "counterClockwise",
    }
}
