use crate::{
    geo::{merge_lines, FloatOne, Line},
    gpx::{self, Gpx, Route, Track, TrackSegment, Waypoint},
    kml::{Document, Folder, Geometry, Kml, LineString, LineStyle, Placemark, Style},
};

pub const GPX_VERSION: f64 = 1.1;

/// Line colours (`aabbggrr`) for routes and tracks, used in turn.
pub const COLORS: [(&str, &str); 10] = [
    ("red", "961400FF"),
    ("green", "9678FF00"),
    ("blue", "96FF7800"),
    ("cyan", "96F0FF14"),
    ("orange", "961478FF"),
    ("dark_green", "96008C14"),
    ("purple", "96FF7878"),
    ("pink", "96A078F0"),
    ("brown", "96143C96"),
    ("dark_blue", "96F01414"),
];

const LINE_WIDTH: f64 = 4.0;

fn color_url(i: usize) -> String {
    format!("#{}", COLORS[i % COLORS.len()].0)
}

fn folder(name: &str, placemarks: Vec<Placemark>) -> Folder {
    Folder {
        name: name.to_owned(),
        description: String::new(),
        visibility: 1,
        open: 0,
        placemarks,
        folders: vec![],
    }
}

pub fn gpx_to_kml(gpx: &Gpx, name: &str) -> Kml {
    let styles = COLORS
        .iter()
        .map(|(id, color)| Style {
            id: id.to_string(),
            line_style: Some(LineStyle {
                color: color.to_string(),
                width: FloatOne::from(LINE_WIDTH),
            }),
            ..Default::default()
        })
        .collect();

    let mut folders = Vec::new();
    if !gpx.waypoints.is_empty() {
        let placemarks = gpx
            .waypoints
            .iter()
            .map(|w| Placemark {
                description: w.desc.clone(),
                visibility: 1,
                ..Placemark::new(&w.name, Geometry::Point(w.point.pos()))
            })
            .collect();
        folders.push(folder("Waypoints", placemarks));
    }
    if !gpx.routes.is_empty() {
        let placemarks = gpx
            .routes
            .iter()
            .enumerate()
            .map(|(i, r)| Placemark {
                description: r.desc.clone(),
                visibility: 1,
                style_url: color_url(i),
                ..Placemark::new(
                    &r.name,
                    Geometry::LineString(LineString::clamped(r.line())),
                )
            })
            .collect();
        folders.push(folder("Routes", placemarks));
    }
    if !gpx.tracks.is_empty() {
        let placemarks = gpx
            .tracks
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let line_strings = t
                    .segments
                    .iter()
                    .map(TrackSegment::line)
                    .filter(|line| !line.is_empty())
                    .map(LineString::clamped)
                    .collect();
                Placemark {
                    description: t.desc.clone(),
                    visibility: 1,
                    style_url: color_url(gpx.routes.len() + i),
                    ..Placemark::new(&t.name, Geometry::MultiGeometry(line_strings))
                }
            })
            .collect();
        folders.push(folder("Tracks", placemarks));
    }

    info!(
        "converted gpx to kml: {} waypoints, {} routes, {} tracks",
        gpx.waypoints.len(),
        gpx.routes.len(),
        gpx.tracks.len()
    );
    Kml::new(Document {
        name: name.to_owned(),
        visibility: 1,
        open: 1,
        styles,
        folders,
        ..Default::default()
    })
}

/// Points become waypoints, line strings become routes and multi-geometries
/// become tracks with one segment per line string.
pub fn kml_to_gpx(kml: &Kml) -> Gpx {
    let mut out = Gpx {
        version: GPX_VERSION,
        ..Default::default()
    };
    for placemark in kml.placemarks() {
        let name = placemark.name.clone();
        let desc = placemark.description.clone();
        match &placemark.geometry {
            Geometry::Point(pos) => out.waypoints.push(Waypoint {
                point: (*pos).into(),
                name,
                desc,
                ..Default::default()
            }),
            Geometry::LineString(line_string) => out.routes.push(Route {
                name,
                desc,
                points: gpx::line_points(&line_string.line),
            }),
            Geometry::MultiGeometry(line_strings) => out.tracks.push(Track {
                leg: 0,
                name,
                desc,
                segments: line_strings
                    .iter()
                    .map(|l| TrackSegment {
                        points: gpx::line_track_points(&l.line),
                    })
                    .collect(),
            }),
        }
    }
    info!(
        "converted kml to gpx: {} waypoints, {} routes, {} tracks",
        out.waypoints.len(),
        out.routes.len(),
        out.tracks.len()
    );
    out
}

/// Joins every route and track of `gpx`, in file order, into one line.
pub fn full_line(gpx: &Gpx) -> Line {
    let lines: Vec<Line> = gpx
        .routes
        .iter()
        .map(Route::line)
        .chain(gpx.tracks.iter().map(Track::line))
        .collect();
    merge_lines(&lines)
}
