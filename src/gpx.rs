use std::{io::Write, path::Path};

use chrono::{DateTime, SecondsFormat, Utc};

use crate::{
    container::Container,
    error::{DecodeError, DecodeResult, EncodeResult, Error, Result},
    geo::{merge_lines, FloatFive, FloatZero, Line, Pos},
    xml::{self, Element, XmlWriter},
};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Gpx {
    pub version: f64,
    pub waypoints: Vec<Waypoint>,
    pub tracks: Vec<Track>,
    pub routes: Vec<Route>,
}

/// A position as it appears on the wire: `lat`/`lon` attributes with five
/// fractional digits and an integer `ele` child, omitted when zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub lat: FloatFive,
    pub lon: FloatFive,
    pub ele: FloatZero,
}

impl Point {
    pub fn pos(&self) -> Pos {
        Pos::new(self.lat.into(), self.lon.into(), self.ele.into())
    }

    fn decode(element: &Element) -> DecodeResult<Self> {
        Ok(Self {
            lat: FloatFive::from(element.attr_value::<f64>("lat")?),
            lon: FloatFive::from(element.attr_value::<f64>("lon")?),
            ele: FloatZero::from(element.child_value::<f64>("ele")?),
        })
    }

    fn attributes(&self) -> (String, String) {
        (self.lat.to_string(), self.lon.to_string())
    }

    /// Opens `<name lat=".." lon="..">` followed by `<ele>` when non-zero.
    fn start<W: Write>(
        &self,
        writer: &mut XmlWriter<W>,
        name: &str,
    ) -> EncodeResult<()> {
        let (lat, lon) = self.attributes();
        writer.start(name, &[("lat", lat.as_str()), ("lon", lon.as_str())])?;
        if self.ele.0 != 0.0 {
            writer.text("ele", &self.ele.to_string())?;
        }
        Ok(())
    }

    /// Writes the point as a complete element with no other children.
    fn encode<W: Write>(
        &self,
        writer: &mut XmlWriter<W>,
        name: &str,
    ) -> EncodeResult<()> {
        if self.ele.0 != 0.0 {
            self.start(writer, name)?;
            return writer.end(name);
        }
        let (lat, lon) = self.attributes();
        writer.empty(name, &[("lat", lat.as_str()), ("lon", lon.as_str())])
    }
}

impl From<Pos> for Point {
    fn from(pos: Pos) -> Self {
        Self {
            lat: pos.lat.into(),
            lon: pos.lon.into(),
            ele: pos.ele.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Waypoint {
    pub point: Point,
    pub name: String,
    pub sym: String,
    pub desc: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Route {
    pub name: String,
    pub desc: String,
    pub points: Vec<Point>,
}

impl Route {
    pub fn line(&self) -> Line {
        self.points.iter().map(Point::pos).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackPoint {
    pub point: Point,
    pub time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackSegment {
    pub points: Vec<TrackPoint>,
}

impl TrackSegment {
    pub fn line(&self) -> Line {
        self.points.iter().map(|p| p.point.pos()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Track {
    /// Grouping key of the stage this track belongs to, 0 when unset.
    pub leg: i32,
    pub name: String,
    pub desc: String,
    pub segments: Vec<TrackSegment>,
}

impl Track {
    /// The whole track as one line, segments joined end to end.
    pub fn line(&self) -> Line {
        let lines: Vec<Line> = self.segments.iter().map(TrackSegment::line).collect();
        merge_lines(&lines)
    }
}

pub fn line_points(line: &Line) -> Vec<Point> {
    line.iter().copied().map(Point::from).collect()
}

pub fn line_track_points(line: &Line) -> Vec<TrackPoint> {
    line.iter()
        .map(|pos| TrackPoint {
            point: Point::from(*pos),
            time: None,
        })
        .collect()
}

pub fn decode(bytes: &[u8]) -> DecodeResult<Gpx> {
    let root = xml::parse_root(bytes, "gpx")?;

    let waypoints = root
        .children("wpt")
        .map(|wpt| {
            Ok(Waypoint {
                point: Point::decode(wpt)?,
                name: wpt.child_text("name"),
                sym: wpt.child_text("sym"),
                desc: wpt.child_text("desc"),
            })
        })
        .collect::<DecodeResult<Vec<_>>>()?;

    let tracks = root
        .children("trk")
        .map(decode_track)
        .collect::<DecodeResult<Vec<_>>>()?;

    let routes = root
        .children("rte")
        .map(|rte| {
            Ok(Route {
                name: rte.child_text("name"),
                desc: rte.child_text("desc"),
                points: rte
                    .children("rtept")
                    .map(Point::decode)
                    .collect::<DecodeResult<Vec<_>>>()?,
            })
        })
        .collect::<DecodeResult<Vec<_>>>()?;

    Ok(Gpx {
        version: root.attr_value("version")?,
        waypoints,
        tracks,
        routes,
    })
}

fn decode_track(trk: &Element) -> DecodeResult<Track> {
    let mut segments = Vec::new();
    for trkseg in trk.children("trkseg") {
        let mut points = Vec::new();
        for trkpt in trkseg.children("trkpt") {
            let time = match trkpt.child("time").map(|t| t.text.trim()) {
                Some(text) if !text.is_empty() => Some(
                    DateTime::parse_from_rfc3339(text)
                        .map_err(|_| DecodeError::InvalidValue {
                            field: "time in <trkpt>".to_owned(),
                            value: text.to_owned(),
                        })?
                        .with_timezone(&Utc),
                ),
                _ => None,
            };
            points.push(TrackPoint {
                point: Point::decode(trkpt)?,
                time,
            });
        }
        segments.push(TrackSegment { points });
    }
    Ok(Track {
        leg: trk.attr_value("leg")?,
        name: trk.child_text("name"),
        desc: trk.child_text("desc"),
        segments,
    })
}

/// Writes the header and the indented `<gpx>` document to `sink`.
pub fn write_to<W: Write>(gpx: &Gpx, sink: W) -> EncodeResult<W> {
    let mut writer = XmlWriter::new(sink)?;
    let version = gpx.version.to_string();
    writer.start("gpx", &[("version", version.as_str())])?;

    for waypoint in &gpx.waypoints {
        waypoint.point.start(&mut writer, "wpt")?;
        writer.text("name", &waypoint.name)?;
        writer.text_if_not_empty("sym", &waypoint.sym)?;
        writer.text_if_not_empty("desc", &waypoint.desc)?;
        writer.end("wpt")?;
    }

    for track in &gpx.tracks {
        let leg = track.leg.to_string();
        if track.leg != 0 {
            writer.start("trk", &[("leg", leg.as_str())])?;
        } else {
            writer.start("trk", &[])?;
        }
        writer.text("name", &track.name)?;
        writer.text("desc", &track.desc)?;
        for segment in &track.segments {
            writer.start("trkseg", &[])?;
            for point in &segment.points {
                let Some(time) = point.time else {
                    point.point.encode(&mut writer, "trkpt")?;
                    continue;
                };
                point.point.start(&mut writer, "trkpt")?;
                writer.text("time", &time.to_rfc3339_opts(SecondsFormat::AutoSi, true))?;
                writer.end("trkpt")?;
            }
            writer.end("trkseg")?;
        }
        writer.end("trk")?;
    }

    for route in &gpx.routes {
        writer.start("rte", &[])?;
        writer.text("name", &route.name)?;
        writer.text("desc", &route.desc)?;
        for point in &route.points {
            point.encode(&mut writer, "rtept")?;
        }
        writer.end("rte")?;
    }

    writer.end("gpx")?;
    Ok(writer.into_inner())
}

pub fn encode(gpx: &Gpx) -> EncodeResult<Vec<u8>> {
    write_to(gpx, Vec::new())
}

pub fn load(path: impl AsRef<Path>) -> Result<Gpx> {
    let path = path.as_ref();
    debug!("loading gpx {:?}", path);
    let bytes = Container::Plain.read_document(path)?;
    decode(&bytes).map_err(|source| Error::Decode {
        path: path.to_owned(),
        source,
    })
}

impl Gpx {
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        debug!(
            "saving gpx {:?}: {} waypoints, {} tracks, {} routes",
            path,
            self.waypoints.len(),
            self.tracks.len(),
            self.routes.len()
        );
        Container::Plain.write_document(path, |sink| write_to(self, sink).map(|_| ()))
    }
}
