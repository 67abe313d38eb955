//! KML documents: a styled tree of folders and placemarks.
//!
//! Coordinates are stored decoded, as [`Pos`]/[`Line`]. On the wire every
//! position is `lon,lat,ele` (note the order) with five, five and zero
//! fractional digits, and positions of a line are separated by one space.
//! Files ending in `.kmz` are read from and written to a single-entry zip
//! archive, see [`Container`].

use std::{io::Write, path::Path};

use itertools::Itertools;

use crate::{
    container::Container,
    error::{DecodeError, DecodeResult, EncodeResult, Error, Result},
    geo::{FloatFive, FloatOne, FloatZero, Line, Pos},
    xml::{self, Element, XmlWriter},
};

pub const XMLNS: &str = "http://www.opengis.net/kml/2.2";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Kml {
    pub xmlns: String,
    pub document: Document,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub name: String,
    pub description: String,
    pub visibility: i32,
    pub open: i32,
    pub styles: Vec<Style>,
    pub style_maps: Vec<StyleMap>,
    pub folders: Vec<Folder>,
    pub placemarks: Vec<Placemark>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyleMap {
    pub id: String,
    pub pairs: Vec<Pair>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pair {
    pub key: String,
    pub style_url: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Style {
    pub id: String,
    pub line_style: Option<LineStyle>,
    pub icon_style: Option<IconStyle>,
    pub label_style: Option<LabelStyle>,
    pub list_style: Option<ListStyle>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineStyle {
    pub color: String,
    pub width: FloatOne,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct IconStyle {
    pub color: String,
    pub scale: f64,
    pub icon: Option<Icon>,
    pub hot_spot: Option<HotSpot>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LabelStyle {
    pub color: String,
    pub scale: FloatOne,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListStyle {
    pub scale: FloatOne,
    pub item_icon: Option<Icon>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Icon {
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HotSpot {
    pub x: i32,
    pub y: i32,
    pub xunits: String,
    pub yunits: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Folder {
    pub name: String,
    pub description: String,
    pub visibility: i32,
    pub open: i32,
    pub placemarks: Vec<Placemark>,
    pub folders: Vec<Folder>,
}

impl Folder {
    /// All placemarks of this folder and its sub-folders, depth first.
    pub fn placemarks_recursive(&self) -> Vec<&Placemark> {
        let mut result: Vec<&Placemark> = self.placemarks.iter().collect();
        for folder in &self.folders {
            result.extend(folder.placemarks_recursive());
        }
        result
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placemark {
    /// The `legacy` attribute, kept as is.
    pub legacy: String,
    pub name: String,
    pub description: String,
    pub visibility: i32,
    pub open: i32,
    pub style_url: String,
    pub geometry: Geometry,
    pub style: Option<Style>,
}

impl Placemark {
    pub fn new(name: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            legacy: String::new(),
            name: name.into(),
            description: String::new(),
            visibility: 0,
            open: 0,
            style_url: String::new(),
            geometry,
            style: None,
        }
    }

    /// The placemark's own line string, or else the first one of its
    /// multi-geometry. Multiple line strings are never merged here.
    pub fn line_string(&self) -> Option<&LineString> {
        match &self.geometry {
            Geometry::LineString(line_string) => Some(line_string),
            Geometry::MultiGeometry(line_strings) => line_strings.first(),
            Geometry::Point(_) => None,
        }
    }

    pub fn point(&self) -> Option<&Pos> {
        match &self.geometry {
            Geometry::Point(pos) => Some(pos),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Pos),
    LineString(LineString),
    MultiGeometry(Vec<LineString>),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineString {
    pub extrude: bool,
    pub tessellate: bool,
    pub altitude_mode: String,
    pub line: Line,
}

impl LineString {
    /// A line string draped on the terrain, the way routes are drawn.
    pub fn clamped(line: Line) -> Self {
        Self {
            extrude: true,
            tessellate: true,
            altitude_mode: "clampToGround".to_owned(),
            line,
        }
    }
}

pub fn parse_coordinate(text: &str) -> DecodeResult<Pos> {
    let invalid = || DecodeError::InvalidCoordinates(text.to_owned());
    let parse = |field: &str| field.trim().parse::<f64>().map_err(|_| invalid());
    let mut fields = text.trim().split(',');
    match (fields.next(), fields.next(), fields.next(), fields.next()) {
        (Some(lon), Some(lat), Some(ele), None) => {
            Ok(Pos::new(parse(lat)?, parse(lon)?, parse(ele)?))
        }
        _ => Err(invalid()),
    }
}

pub fn parse_coordinates(text: &str) -> DecodeResult<Line> {
    let positions = text
        .split_whitespace()
        .map(parse_coordinate)
        .collect::<DecodeResult<Vec<_>>>()?;
    if positions.is_empty() {
        return Err(DecodeError::InvalidCoordinates(text.to_owned()));
    }
    Ok(Line::new(positions))
}

pub fn format_coordinate(pos: &Pos) -> String {
    format!(
        "{},{},{}",
        FloatFive::from(pos.lon),
        FloatFive::from(pos.lat),
        FloatZero::from(pos.ele)
    )
}

pub fn format_coordinates(line: &Line) -> String {
    line.iter().map(format_coordinate).join(" ")
}

pub fn decode(bytes: &[u8]) -> DecodeResult<Kml> {
    let root = xml::parse_root(bytes, "kml")?;
    let document = match root.child("Document") {
        Some(document) => decode_document(document)?,
        None => Document::default(),
    };
    Ok(Kml {
        xmlns: root.attr("xmlns").unwrap_or_default().to_owned(),
        document,
    })
}

fn decode_document(e: &Element) -> DecodeResult<Document> {
    Ok(Document {
        name: e.child_text("name"),
        description: e.child_text("description"),
        visibility: e.child_value("visibility")?,
        open: e.child_value("open")?,
        styles: e
            .children("Style")
            .map(decode_style)
            .collect::<DecodeResult<Vec<_>>>()?,
        style_maps: e
            .children("StyleMap")
            .map(|m| StyleMap {
                id: m.attr("id").unwrap_or_default().to_owned(),
                pairs: m
                    .children("Pair")
                    .map(|p| Pair {
                        key: p.child_text("key"),
                        style_url: p.child_text("styleUrl"),
                    })
                    .collect(),
            })
            .collect(),
        folders: e
            .children("Folder")
            .map(decode_folder)
            .collect::<DecodeResult<Vec<_>>>()?,
        placemarks: e
            .children("Placemark")
            .filter_map(|p| decode_placemark(p).transpose())
            .collect::<DecodeResult<Vec<_>>>()?,
    })
}

fn decode_icon(e: &Element) -> Icon {
    Icon {
        href: e.child_text("href"),
    }
}

fn decode_style(e: &Element) -> DecodeResult<Style> {
    let line_style = match e.child("LineStyle") {
        Some(s) => Some(LineStyle {
            color: s.child_text("color"),
            width: FloatOne::from(s.child_value::<f64>("width")?),
        }),
        None => None,
    };
    let icon_style = match e.child("IconStyle") {
        Some(s) => Some(IconStyle {
            color: s.child_text("color"),
            scale: s.child_value("scale")?,
            icon: s.child("Icon").map(decode_icon),
            hot_spot: match s.child("hotSpot") {
                Some(h) => Some(HotSpot {
                    x: h.attr_value("x")?,
                    y: h.attr_value("y")?,
                    xunits: h.attr("xunits").unwrap_or_default().to_owned(),
                    yunits: h.attr("yunits").unwrap_or_default().to_owned(),
                }),
                None => None,
            },
        }),
        None => None,
    };
    let label_style = match e.child("LabelStyle") {
        Some(s) => Some(LabelStyle {
            color: s.child_text("color"),
            scale: FloatOne::from(s.child_value::<f64>("scale")?),
        }),
        None => None,
    };
    let list_style = match e.child("ListStyle") {
        Some(s) => Some(ListStyle {
            scale: FloatOne::from(s.child_value::<f64>("scale")?),
            item_icon: s.child("ItemIcon").map(decode_icon),
        }),
        None => None,
    };
    Ok(Style {
        id: e.attr("id").unwrap_or_default().to_owned(),
        line_style,
        icon_style,
        label_style,
        list_style,
    })
}

fn decode_folder(e: &Element) -> DecodeResult<Folder> {
    Ok(Folder {
        name: e.child_text("name"),
        description: e.child_text("description"),
        visibility: e.child_value("visibility")?,
        open: e.child_value("open")?,
        placemarks: e
            .children("Placemark")
            .filter_map(|p| decode_placemark(p).transpose())
            .collect::<DecodeResult<Vec<_>>>()?,
        folders: e
            .children("Folder")
            .map(decode_folder)
            .collect::<DecodeResult<Vec<_>>>()?,
    })
}

fn decode_line_string(e: &Element) -> DecodeResult<LineString> {
    Ok(LineString {
        extrude: e.child_flag("extrude")?,
        tessellate: e.child_flag("tessellate")?,
        altitude_mode: e.child_text("altitudeMode"),
        line: parse_coordinates(&e.child_text("coordinates"))?,
    })
}

/// `None` for a placemark whose only geometry is of a kind this crate does
/// not model.
fn decode_placemark(e: &Element) -> DecodeResult<Option<Placemark>> {
    let name = e.child_text("name");
    let Some(geometry) = decode_geometry(e, &name)? else {
        return Ok(None);
    };
    Ok(Some(Placemark {
        legacy: e.attr("legacy").unwrap_or_default().to_owned(),
        description: e.child_text("description"),
        visibility: e.child_value("visibility")?,
        open: e.child_value("open")?,
        style_url: e.child_text("styleUrl"),
        geometry,
        style: e.child("Style").map(decode_style).transpose()?,
        name,
    }))
}

const UNSUPPORTED_GEOMETRIES: [&str; 5] =
    ["Polygon", "LinearRing", "Model", "Track", "MultiTrack"];

// A direct line string wins over a multi-geometry, which wins over a point.
fn decode_geometry(e: &Element, name: &str) -> DecodeResult<Option<Geometry>> {
    if let Some(line_string) = e.child("LineString") {
        return Ok(Some(Geometry::LineString(decode_line_string(line_string)?)));
    }
    let multi: Option<Vec<LineString>> = match e.child("MultiGeometry") {
        Some(m) => Some(
            m.children("LineString")
                .map(decode_line_string)
                .collect::<DecodeResult<Vec<_>>>()?,
        ),
        None => None,
    };
    if multi.as_ref().is_some_and(|lines| !lines.is_empty()) {
        return Ok(Some(Geometry::MultiGeometry(multi.unwrap_or_default())));
    }
    if let Some(point) = e.child("Point") {
        return Ok(Some(Geometry::Point(parse_coordinate(
            &point.child_text("coordinates"),
        )?)));
    }
    if let Some(lines) = multi {
        warn!("placemark {:?} has an empty MultiGeometry", name);
        return Ok(Some(Geometry::MultiGeometry(lines)));
    }
    match e
        .children
        .iter()
        .find(|c| UNSUPPORTED_GEOMETRIES.contains(&c.name.as_str()))
    {
        Some(other) => {
            warn!("skipping placemark {:?}: unsupported <{}>", name, other.name);
            Ok(None)
        }
        None => Err(DecodeError::MissingGeometry(name.to_owned())),
    }
}

fn non_empty<'a>(attributes: &[(&'a str, &'a str)]) -> Vec<(&'a str, &'a str)> {
    attributes
        .iter()
        .copied()
        .filter(|(_, value)| !value.is_empty())
        .collect()
}

/// Writes the header and the indented `<kml>` document to `sink`.
pub fn write_to<W: Write>(kml: &Kml, sink: W) -> EncodeResult<W> {
    let mut w = XmlWriter::new(sink)?;
    w.start("kml", &non_empty(&[("xmlns", kml.xmlns.as_str())]))?;

    let doc = &kml.document;
    w.start("Document", &[])?;
    w.text_if_not_empty("name", &doc.name)?;
    w.text_if_not_empty("description", &doc.description)?;
    w.text("visibility", &doc.visibility.to_string())?;
    w.text("open", &doc.open.to_string())?;
    for style in &doc.styles {
        encode_style(&mut w, style)?;
    }
    for style_map in &doc.style_maps {
        w.start("StyleMap", &non_empty(&[("id", style_map.id.as_str())]))?;
        for pair in &style_map.pairs {
            w.start("Pair", &[])?;
            w.text_if_not_empty("key", &pair.key)?;
            w.text_if_not_empty("styleUrl", &pair.style_url)?;
            w.end("Pair")?;
        }
        w.end("StyleMap")?;
    }
    for folder in &doc.folders {
        encode_folder(&mut w, folder)?;
    }
    for placemark in &doc.placemarks {
        encode_placemark(&mut w, placemark)?;
    }
    w.end("Document")?;

    w.end("kml")?;
    Ok(w.into_inner())
}

pub fn encode(kml: &Kml) -> EncodeResult<Vec<u8>> {
    write_to(kml, Vec::new())
}

fn encode_icon<W: Write>(w: &mut XmlWriter<W>, name: &str, icon: &Icon) -> EncodeResult<()> {
    w.start(name, &[])?;
    w.text_if_not_empty("href", &icon.href)?;
    w.end(name)
}

fn encode_style<W: Write>(w: &mut XmlWriter<W>, style: &Style) -> EncodeResult<()> {
    w.start("Style", &non_empty(&[("id", style.id.as_str())]))?;
    if let Some(s) = &style.line_style {
        w.start("LineStyle", &[])?;
        w.text_if_not_empty("color", &s.color)?;
        w.text("width", &s.width.to_string())?;
        w.end("LineStyle")?;
    }
    if let Some(s) = &style.icon_style {
        w.start("IconStyle", &[])?;
        w.text_if_not_empty("color", &s.color)?;
        w.text("scale", &s.scale.to_string())?;
        if let Some(icon) = &s.icon {
            encode_icon(w, "Icon", icon)?;
        }
        if let Some(h) = &s.hot_spot {
            let (x, y) = (h.x.to_string(), h.y.to_string());
            let mut attributes = vec![("x", x.as_str()), ("y", y.as_str())];
            attributes.extend(non_empty(&[
                ("xunits", h.xunits.as_str()),
                ("yunits", h.yunits.as_str()),
            ]));
            w.empty("hotSpot", &attributes)?;
        }
        w.end("IconStyle")?;
    }
    if let Some(s) = &style.label_style {
        w.start("LabelStyle", &[])?;
        w.text_if_not_empty("color", &s.color)?;
        w.text("scale", &s.scale.to_string())?;
        w.end("LabelStyle")?;
    }
    if let Some(s) = &style.list_style {
        w.start("ListStyle", &[])?;
        w.text("scale", &s.scale.to_string())?;
        if let Some(icon) = &s.item_icon {
            encode_icon(w, "ItemIcon", icon)?;
        }
        w.end("ListStyle")?;
    }
    w.end("Style")
}

fn encode_folder<W: Write>(w: &mut XmlWriter<W>, folder: &Folder) -> EncodeResult<()> {
    w.start("Folder", &[])?;
    w.text("name", &folder.name)?;
    w.text("description", &folder.description)?;
    w.text("visibility", &folder.visibility.to_string())?;
    w.text("open", &folder.open.to_string())?;
    for placemark in &folder.placemarks {
        encode_placemark(w, placemark)?;
    }
    for sub_folder in &folder.folders {
        encode_folder(w, sub_folder)?;
    }
    w.end("Folder")
}

fn encode_line_string<W: Write>(
    w: &mut XmlWriter<W>,
    line_string: &LineString,
) -> EncodeResult<()> {
    w.start("LineString", &[])?;
    w.text("extrude", &line_string.extrude.to_string())?;
    w.text("tessellate", &line_string.tessellate.to_string())?;
    w.text("altitudeMode", &line_string.altitude_mode)?;
    w.text("coordinates", &format_coordinates(&line_string.line))?;
    w.end("LineString")
}

fn encode_placemark<W: Write>(
    w: &mut XmlWriter<W>,
    placemark: &Placemark,
) -> EncodeResult<()> {
    w.start("Placemark", &non_empty(&[("legacy", placemark.legacy.as_str())]))?;
    w.text("name", &placemark.name)?;
    w.text("description", &placemark.description)?;
    w.text("visibility", &placemark.visibility.to_string())?;
    w.text("open", &placemark.open.to_string())?;
    w.text_if_not_empty("styleUrl", &placemark.style_url)?;
    match &placemark.geometry {
        Geometry::Point(pos) => {
            w.start("Point", &[])?;
            w.text("coordinates", &format_coordinate(pos))?;
            w.end("Point")?;
        }
        Geometry::LineString(line_string) => encode_line_string(w, line_string)?,
        Geometry::MultiGeometry(line_strings) => {
            w.start("MultiGeometry", &[])?;
            for line_string in line_strings {
                encode_line_string(w, line_string)?;
            }
            w.end("MultiGeometry")?;
        }
    }
    if let Some(style) = &placemark.style {
        encode_style(w, style)?;
    }
    w.end("Placemark")
}

/// Loads a `.kml` file, or the first entry of a `.kmz` archive.
pub fn load(path: impl AsRef<Path>) -> Result<Kml> {
    let path = path.as_ref();
    let container = Container::for_path(path);
    debug!("loading kml {:?} ({:?})", path, container);
    let bytes = container.read_document(path)?;
    decode(&bytes).map_err(|source| Error::Decode {
        path: path.to_owned(),
        source,
    })
}

impl Kml {
    pub fn new(document: Document) -> Self {
        Self {
            xmlns: XMLNS.to_owned(),
            document,
        }
    }

    /// Every placemark in the document, folders walked depth first.
    pub fn placemarks(&self) -> Vec<&Placemark> {
        let mut result: Vec<&Placemark> = Vec::new();
        for folder in &self.document.folders {
            result.extend(folder.placemarks_recursive());
        }
        result.extend(self.document.placemarks.iter());
        result
    }

    /// Saves as `.kml`, or as a single-entry `.kmz` archive.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let container = Container::for_path(path);
        debug!("saving kml {:?} ({:?})", path, container);
        container.write_document(path, |sink| write_to(self, sink).map(|_| ()))
    }
}
