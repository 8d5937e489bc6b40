//! Mission documents.
//!
//! A mission tree is rendered into two companion documents:
//! - the visualization document (`template.kml`): mission name and one
//!   plain placemark per waypoint, for display;
//! - the execution document (`waylines.wpml`): mission config, route
//!   settings, placemarks with their overrides and action groups.
//!
//! Both list the same placemarks in the same order. Parsing cross-checks
//! them before reconstructing the tree.

mod parse;
mod render;

pub use parse::parse_documents;
pub use render::{render, render_template, render_waylines, RenderedDocuments};

pub(crate) const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";
pub(crate) const WPML_NAMESPACE: &str = "http://www.dji.com/wpmz/1.0.2";
