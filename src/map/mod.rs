//! Renders every trajectory found in a directory of CSV files onto one map.
//!
//! The output is a GeoJSON collection, a Leaflet page built from it, and a
//! best-effort PNG snapshot of that page.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::{bounds::BoundingBox, config::MapConfig, loader, model::Trajectory, palette};

mod features;
mod html;
pub mod snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Rendered,
    /// Nothing usable was found, callers should exit with a failure code.
    NoInput,
}

/// Everything the renderer needs for one run.
#[derive(Debug)]
pub struct MapPlan {
    pub trajectories: BTreeMap<String, Trajectory>,
    pub colors: BTreeMap<String, String>,
    pub bounds: BoundingBox,
}

impl MapPlan {
    /// Drops empty trajectories, returns `None` when none remain.
    pub fn new(trajectories: impl IntoIterator<Item = Trajectory>) -> Option<Self> {
        let trajectories: BTreeMap<_, _> = trajectories
            .into_iter()
            .filter(|x| !x.is_empty())
            .map(|x| (x.name().to_owned(), x))
            .collect();

        let bounds = BoundingBox::covering(trajectories.values())?;
        let colors = palette::assign(trajectories.values());
        Some(Self {
            trajectories,
            colors,
            bounds,
        })
    }

    pub fn color(&self, name: &str) -> &str {
        self.colors.get(name).map_or("#3388ff", String::as_str)
    }
}

/// Sorted list of the `.csv` files directly inside `dir`.
pub fn find_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|x| x == "csv") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Loads every file, warning about the ones without any usable point.
pub fn load_all(files: &[PathBuf]) -> Result<Vec<Trajectory>> {
    let mut trajectories = Vec::new();
    for path in files {
        let trajectory = loader::load(path)?;
        if trajectory.is_empty() {
            warn!(file = trajectory.name(), "no valid point, skipped");
            continue;
        }
        trajectories.push(trajectory);
    }
    Ok(trajectories)
}

pub fn run(config: &MapConfig) -> Result<Outcome> {
    for dir in [&config.csv_dir, &config.out_dir] {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let files = find_csv_files(&config.csv_dir)?;
    if files.is_empty() {
        error!(
            dir = %config.csv_dir.display(),
            "no CSV file found, expected files with an ip,latitude,longitude header"
        );
        return Ok(Outcome::NoInput);
    }

    let Some(plan) = MapPlan::new(load_all(&files)?) else {
        error!("no valid point found in the CSV files");
        return Ok(Outcome::NoInput);
    };

    for trajectory in plan.trajectories.values() {
        info!(
            name = trajectory.name(),
            points = trajectory.len(),
            km = trajectory.length() / 1000.0,
            "loaded trajectory"
        );
    }

    let collection = features::collection(&plan);
    let geojson = serde_json::to_string(&collection)?;
    let geojson_path = config.out_dir.join(&config.geojson_name);
    fs::write(&geojson_path, &geojson)
        .with_context(|| format!("failed to write {}", geojson_path.display()))?;
    info!(path = %geojson_path.display(), "GeoJSON written");

    let page = html::render(&plan, &geojson, &config.tiles, &config.tiles_attribution);
    let html_path = config.out_dir.join(&config.html_name);
    fs::write(&html_path, page).with_context(|| format!("failed to write {}", html_path.display()))?;
    info!(path = %html_path.display(), "HTML map written");

    if config.snapshot {
        let job = snapshot::Job {
            html: html_path.clone(),
            png: config.out_dir.join(&config.png_name),
            width: config.width,
            height: config.height,
        };
        match snapshot::export(&snapshot::default_exporters(), &job) {
            Some(exporter) => info!(path = %job.png.display(), exporter, "PNG snapshot written"),
            None => warn!(
                html = %html_path.display(),
                "could not export a PNG snapshot, install chromium, firefox or wkhtmltoimage and run again"
            ),
        }
    }

    Ok(Outcome::Rendered)
}
