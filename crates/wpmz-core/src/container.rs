//! Mission archive packing and unpacking.
//!
//! An archive always has the same layout:
//!
//! ```text
//! wpmz/template.kml    visualization document
//! wpmz/waylines.wpml   execution document
//! wpmz/res/...         optional resource files
//! ```
//!
//! Archives are assembled fully in memory. Writing to disk goes through a
//! temporary file in the destination directory that is renamed into place,
//! so a failed write never leaves a partial archive behind.

use crate::document::{parse_documents, RenderedDocuments};
use crate::error::{ContainerError, DocumentKind};
use crate::mission::MissionDocument;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const TEMPLATE_ENTRY: &str = "wpmz/template.kml";
pub const WAYLINES_ENTRY: &str = "wpmz/waylines.wpml";
pub const RESOURCE_DIR: &str = "wpmz/res/";
const ROOT_DIR: &str = "wpmz/";

/// A file stored under `wpmz/res/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Plain file name, no directories
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Resource {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageOptions {
    /// Deflate level, 0-9
    pub compression_level: i64,
}

impl Default for PackageOptions {
    fn default() -> Self {
        Self { compression_level: 6 }
    }
}

/// Raw contents of an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnpackedArchive {
    pub template_kml: String,
    pub waylines_wpml: String,
    pub resources: Vec<Resource>,
}

fn check_resource_name(name: &str) -> Result<(), ContainerError> {
    let invalid = name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\');
    if invalid {
        return Err(ContainerError::InvalidResourceName(name.to_string()));
    }
    Ok(())
}

/// Pack the rendered documents and resources into archive bytes.
pub fn package(
    documents: &RenderedDocuments,
    resources: &[Resource],
    options: &PackageOptions,
) -> Result<Vec<u8>, ContainerError> {
    for resource in resources {
        check_resource_name(&resource.name)?;
    }

    // Fixed timestamps keep the archive bytes a function of the content.
    let file_options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(options.compression_level.clamp(0, 9)))
        .last_modified_time(zip::DateTime::default());

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.add_directory(ROOT_DIR, file_options)?;
    zip.start_file(TEMPLATE_ENTRY, file_options)?;
    zip.write_all(documents.template_kml.as_bytes())?;
    zip.start_file(WAYLINES_ENTRY, file_options)?;
    zip.write_all(documents.waylines_wpml.as_bytes())?;

    if !resources.is_empty() {
        zip.add_directory(RESOURCE_DIR, file_options)?;
        for resource in resources {
            zip.start_file(format!("{RESOURCE_DIR}{}", resource.name), file_options)?;
            zip.write_all(&resource.bytes)?;
        }
    }

    let bytes = zip.finish()?.into_inner();
    debug!(bytes = bytes.len(), resources = resources.len(), "packaged mission archive");
    Ok(bytes)
}

/// Atomically publish archive bytes at `path`.
pub fn write_archive(path: &Path, bytes: &[u8]) -> Result<(), ContainerError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;

    info!(path = %path.display(), bytes = bytes.len(), "wrote mission archive");
    Ok(())
}

/// Extract both documents and any resources.
pub fn unpack(bytes: &[u8]) -> Result<UnpackedArchive, ContainerError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let template_kml = read_document(&mut archive, DocumentKind::Template)?;
    let waylines_wpml = read_document(&mut archive, DocumentKind::Waylines)?;

    let mut resources = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let Some(name) = file.name().strip_prefix(RESOURCE_DIR).map(str::to_string) else {
            continue;
        };
        let mut contents = Vec::new();
        file.read_to_end(&mut contents)?;
        resources.push(Resource::new(name, contents));
    }

    Ok(UnpackedArchive {
        template_kml,
        waylines_wpml,
        resources,
    })
}

fn read_document(archive: &mut ZipArchive<Cursor<&[u8]>>, document: DocumentKind) -> Result<String, ContainerError> {
    let entry = document.entry_path();
    let mut file = match archive.by_name(entry) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Err(ContainerError::MissingEntry { entry }),
        Err(e) => return Err(e.into()),
    };
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;
    String::from_utf8(contents).map_err(|e| ContainerError::MalformedDocument {
        document,
        reason: e.to_string(),
    })
}

/// Parse archive bytes back into a mission tree.
pub fn parse_archive(bytes: &[u8]) -> Result<MissionDocument, ContainerError> {
    let unpacked = unpack(bytes)?;
    let document = parse_documents(&unpacked.template_kml, &unpacked.waylines_wpml)?;
    info!(
        name = %document.info.name,
        placemarks = document.placemarks().len(),
        resources = unpacked.resources.len(),
        "parsed mission archive"
    );
    Ok(document)
}

/// Read and parse an archive file.
pub fn read_archive(path: &Path) -> Result<MissionDocument, ContainerError> {
    let bytes = fs::read(path)?;
    parse_archive(&bytes)
}
