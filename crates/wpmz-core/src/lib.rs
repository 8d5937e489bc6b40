//! Waypoint mission conversion for DJI-style WPML archives.
//!
//! A [`Waylines`] request is validated, built into a [`MissionDocument`],
//! rendered into the template and waylines documents and packed into a
//! KMZ archive. Archives parse back into the same mission tree.

pub mod actions;
pub mod builder;
pub mod container;
pub mod document;
pub mod enums;
pub mod error;
pub mod mission;
pub mod models;
pub mod resolve;
pub mod rules;
pub mod spatial;
pub mod validation;
mod xml;

use std::path::Path;

pub use actions::{
    check_request, encode_request, encode_waypoint_actions, ActionError, ActionKind, EncodingError,
    GimbalRotate, IdAllocator, SUPPORTED_ACTIONS,
};
pub use builder::{build_mission, build_mission_with, BuildOptions};
pub use container::{
    package, parse_archive, read_archive, unpack, write_archive, PackageOptions, Resource, UnpackedArchive,
    RESOURCE_DIR, TEMPLATE_ENTRY, WAYLINES_ENTRY,
};
pub use document::{parse_documents, render, render_template, render_waylines, RenderedDocuments};
pub use enums::{
    ClimbMode, DroneModel, FinishAction, GimbalPitchMode, GimbalRotateMode, HeadingMode, HeightMode,
    PayloadModel, PhotoLens, TemplateType, TriggerType, TurnMode, UnknownVariant, YawPathMode,
};
pub use error::{BuildError, ContainerError, DocumentKind, Error, RenderError};
pub use mission::{Action, ActionGroup, ActionTrigger, DocumentInfo, Folder, MissionConfig, MissionDocument, Placemark};
pub use models::{non_zero, ActionRequest, TakeOffRefPoint, Waylines, Waypoint};
pub use resolve::{resolve, Layered};
pub use rules::{Limit, MissionDefaults, MissionRules};
pub use spatial::{haversine_distance, route_stats, RouteStats};
pub use validation::{validate, validate_with, Constraint, ValidationErrors, Violation};

/// Render a mission tree and pack it into archive bytes.
pub fn archive_bytes(
    document: &MissionDocument,
    resources: &[Resource],
    options: &PackageOptions,
) -> Result<Vec<u8>, Error> {
    let rendered = render(document)?;
    Ok(package(&rendered, resources, options)?)
}

/// Render a mission tree and publish it as an archive file.
pub fn write_mission_archive(
    path: &Path,
    document: &MissionDocument,
    resources: &[Resource],
    options: &PackageOptions,
) -> Result<(), Error> {
    let bytes = archive_bytes(document, resources, options)?;
    write_archive(path, &bytes)?;
    Ok(())
}

/// Convert a mission request straight into archive bytes with default options.
pub fn convert(waylines: &Waylines) -> Result<Vec<u8>, Error> {
    convert_with(waylines, &BuildOptions::default(), &[], &PackageOptions::default())
}

pub fn convert_with(
    waylines: &Waylines,
    build_options: &BuildOptions,
    resources: &[Resource],
    package_options: &PackageOptions,
) -> Result<Vec<u8>, Error> {
    let document = build_mission_with(waylines, build_options)?;
    archive_bytes(&document, resources, package_options)
}
