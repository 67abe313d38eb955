//! Enriches GPX data with descriptions from a JSON metadata file.
//!
//! The metadata holds one record per leg (used to name and describe the route
//! built from each legged track), one record per waypoint, and a mapping table
//! between waypoint names used in the GPX file and in the metadata. A mapping
//! row with an empty `Data` side marks a GPX waypoint that has no metadata on
//! purpose; an empty `Gpx` side marks a metadata record with no waypoint.

use std::{
    collections::{HashMap, HashSet},
    fs,
    path::Path,
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::{
    convert::GPX_VERSION,
    gpx::{self, Gpx, Route, Track, Waypoint},
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Metadata {
    pub legs: Vec<LegData>,
    pub waypoints: Vec<WaypointData>,
    pub mapping: Vec<MappingData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LegData {
    pub leg: i32,
    pub from: String,
    pub to: String,
    pub highlights: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct WaypointData {
    pub waypoint: String,
    pub description: String,
    pub terrain: String,
    pub summary: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MappingData {
    pub gpx: String,
    pub data: String,
}

impl Metadata {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).with_context(|| format!("reading metadata {:?}", path))?;
        let metadata: Metadata = serde_json::from_slice(&bytes)
            .with_context(|| format!("decoding metadata {:?}", path))?;
        debug!(
            "loaded metadata {:?}: {} legs, {} waypoints, {} mappings",
            path,
            metadata.legs.len(),
            metadata.waypoints.len(),
            metadata.mapping.len()
        );
        Ok(metadata)
    }
}

#[derive(Default)]
struct NameMapping<'a> {
    renames: HashMap<&'a str, &'a str>,
    gpx_only: HashSet<&'a str>,
    data_only: HashSet<&'a str>,
}

impl<'a> NameMapping<'a> {
    fn new(rows: &'a [MappingData]) -> Self {
        let mut mapping = Self::default();
        for row in rows {
            if row.data.is_empty() {
                mapping.gpx_only.insert(&row.gpx);
            } else if row.gpx.is_empty() {
                mapping.data_only.insert(&row.data);
            } else {
                mapping.renames.insert(&row.gpx, &row.data);
            }
        }
        mapping
    }

    fn rename<'b>(&'b self, name: &'b str) -> &'b str {
        self.renames.get(name).copied().unwrap_or(name)
    }
}

/// One route per track, named and described from the track's leg record.
/// Segments of a track are merged into a single route.
pub fn describe_routes(tracks: &[Track], metadata: &Metadata) -> Result<Vec<Route>> {
    let legs: HashMap<i32, &LegData> = metadata.legs.iter().map(|l| (l.leg, l)).collect();
    let total = metadata.legs.len();

    tracks
        .iter()
        .map(|track| -> Result<Route> {
            let leg = legs
                .get(&track.leg)
                .with_context(|| {
                    format!("no metadata for leg {} ({:?})", track.leg, track.name)
                })?;
            let line = track.line();
            if line.is_empty() {
                bail!("track {:?} of leg {} has no points", track.name, track.leg);
            }
            Ok(Route {
                name: format!("Leg {} / {}: {} to {}", leg.leg, total, leg.from, leg.to),
                desc: format!(
                    "{}\n\n{}",
                    leg.highlights.replace('•', "★"),
                    leg.description
                ),
                points: gpx::line_points(&line),
            })
        })
        .collect()
}

/// Renames waypoints through the mapping table and fills in their
/// descriptions. Every waypoint must have metadata and every metadata record
/// must be used, unless the mapping table says otherwise.
pub fn annotate_waypoints(waypoints: &[Waypoint], metadata: &Metadata) -> Result<Vec<Waypoint>> {
    let mapping = NameMapping::new(&metadata.mapping);
    let records: HashMap<&str, &WaypointData> = metadata
        .waypoints
        .iter()
        .map(|w| (w.waypoint.as_str(), w))
        .collect();

    let mut done = HashSet::new();
    let mut without_metadata = Vec::new();
    let mut annotated = Vec::with_capacity(waypoints.len());
    for waypoint in waypoints {
        let name = mapping.rename(&waypoint.name);
        let mut out = Waypoint {
            name: name.to_owned(),
            ..waypoint.clone()
        };
        match records.get(name) {
            Some(record) => {
                done.insert(name);
                if !record.summary.is_empty() {
                    out.name = format!("{} ({})", name, record.summary);
                }
                out.desc = format!("★ {}", record.description);
                if !record.terrain.is_empty() {
                    out.desc.push_str(&format!("\n\nTerrain: {}", record.terrain));
                }
            }
            None => {
                if !mapping.gpx_only.contains(name) {
                    without_metadata.push(name.to_owned());
                }
            }
        }
        annotated.push(out);
    }
    if !without_metadata.is_empty() {
        bail!("waypoints without metadata: {}", without_metadata.join(", "));
    }

    let unused = metadata
        .waypoints
        .iter()
        .map(|w| w.waypoint.as_str())
        .filter(|name| !done.contains(name) && !mapping.data_only.contains(name))
        .collect::<Vec<_>>();
    if !unused.is_empty() {
        bail!("metadata matches no waypoint: {}", unused.join(", "));
    }

    info!(
        "annotated {} waypoints, {} described",
        annotated.len(),
        done.len()
    );
    Ok(annotated)
}

/// Builds the published document: described routes from `tracks` and
/// annotated waypoints from `waypoints`.
pub fn annotate(metadata: &Metadata, tracks: &Gpx, waypoints: &Gpx) -> Result<Gpx> {
    Ok(Gpx {
        version: GPX_VERSION,
        waypoints: annotate_waypoints(&waypoints.waypoints, metadata)?,
        tracks: vec![],
        routes: describe_routes(&tracks.tracks, metadata)?,
    })
}
