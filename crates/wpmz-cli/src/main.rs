//! `wpmz` - build, validate and inspect waypoint mission archives.
//!
//! Usage:
//!   wpmz convert mission.json -o mission.kmz [--resources ./res]
//!   wpmz validate mission.json
//!   wpmz inspect mission.kmz [--json | --waylines]

mod config;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wpmz_core::{
    build_mission_with, read_archive, validate, write_mission_archive, BuildOptions, MissionDocument,
    PackageOptions, Resource, ValidationErrors, Waylines,
};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(author, version, about = "Waypoint mission archive tools")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a JSON mission request into a KMZ archive
    Convert {
        /// Mission request (JSON)
        mission: PathBuf,

        /// Output archive path
        #[arg(short, long)]
        output: PathBuf,

        /// Directory whose files are stored under wpmz/res/
        #[arg(long)]
        resources: Option<PathBuf>,
    },
    /// Check a JSON mission request and report every violation
    Validate {
        /// Mission request (JSON)
        mission: PathBuf,
    },
    /// Print the contents of a KMZ archive
    Inspect {
        /// Archive path
        archive: PathBuf,

        /// Print the full mission tree as JSON
        #[arg(long, conflicts_with = "waylines")]
        json: bool,

        /// Print the reconstructed mission request as JSON
        #[arg(long)]
        waylines: bool,
    },
}

fn main() -> Result<()> {
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(
            config
                .log_json
                .then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
        )
        .with(
            (!config.log_json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(config.log_filter.parse()?))
        .init();

    let args = Args::parse();
    match args.command {
        Command::Convert {
            mission,
            output,
            resources,
        } => convert(&config, &mission, &output, resources.as_deref()),
        Command::Validate { mission } => {
            let waylines = load_mission(&mission)?;
            check(&waylines)?;
            println!("{}: ok ({} waypoints)", mission.display(), waylines.waypoints.len());
            Ok(())
        }
        Command::Inspect {
            archive,
            json,
            waylines,
        } => inspect(&archive, json, waylines),
    }
}

fn load_mission(path: &Path) -> Result<Waylines> {
    let text = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse mission request {}", path.display()))
}

fn check(waylines: &Waylines) -> Result<()> {
    if let Err(errors) = validate(waylines) {
        print_violations(&errors);
        bail!("mission '{}' has {} violation(s)", waylines.name, errors.violations.len());
    }
    Ok(())
}

fn print_violations(errors: &ValidationErrors) {
    for violation in &errors.violations {
        eprintln!("  {}: {}", violation.field, violation.constraint);
    }
}

fn load_resources(dir: &Path) -> Result<Vec<Resource>> {
    let mut resources = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let bytes = fs::read(entry.path()).with_context(|| format!("failed to read resource {name}"))?;
        resources.push(Resource::new(name, bytes));
    }
    // Directory listing order is platform dependent.
    resources.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(resources)
}

fn convert(config: &Config, mission: &Path, output: &Path, resources: Option<&Path>) -> Result<()> {
    let waylines = load_mission(mission)?;
    check(&waylines)?;

    let options = BuildOptions {
        author: config.author.clone(),
        timestamp: Some(Utc::now()),
        ..BuildOptions::default()
    };
    let document = build_mission_with(&waylines, &options).context("failed to build mission")?;
    let resources = match resources {
        Some(dir) => load_resources(dir)?,
        None => Vec::new(),
    };

    let package_options = PackageOptions {
        compression_level: config.compression_level,
    };
    write_mission_archive(output, &document, &resources, &package_options)
        .with_context(|| format!("failed to write {}", output.display()))?;

    tracing::info!(
        waypoints = document.placemarks().len(),
        actions = document.actions().count(),
        resources = resources.len(),
        "converted {}",
        mission.display()
    );
    println!("{}", output.display());
    Ok(())
}

fn inspect(archive: &Path, json: bool, waylines: bool) -> Result<()> {
    let document = read_archive(archive).with_context(|| format!("failed to read {}", archive.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else if waylines {
        println!("{}", serde_json::to_string_pretty(&document.to_waylines())?);
    } else {
        print_summary(&document);
    }
    Ok(())
}

fn print_summary(document: &MissionDocument) {
    let info = &document.info;
    let config = &document.config;
    let folder = &document.folder;

    println!("Mission: {}", info.name);
    if let Some(description) = &info.description {
        println!("  {description}");
    }
    if let Some(author) = &info.author {
        println!("Author: {author}");
    }
    if let Some(created) = info.create_time {
        println!("Created: {}", created.to_rfc3339());
    }
    println!("Aircraft: {} / {} (position {})", config.drone, config.payload, config.payload_position_index);
    println!(
        "Route: {} waypoints, {:.0}m, ~{:.0}s at {} m/s ({})",
        folder.placemarks.len(),
        folder.distance_m,
        folder.duration_s,
        folder.auto_flight_speed,
        folder.height_mode
    );
    println!("Finish: {}", config.finish_action);

    for placemark in &folder.placemarks {
        let actions: Vec<&str> = placemark
            .action_groups
            .iter()
            .flat_map(|g| g.actions.iter())
            .map(|a| a.kind.func())
            .collect();
        println!(
            "  #{:<3} {:.6}, {:.6}  {:>6.1}m  {:>4.1}m/s  {}",
            placemark.index,
            placemark.latitude,
            placemark.longitude,
            placemark.height,
            placemark.speed,
            actions.join(", ")
        );
    }
}
