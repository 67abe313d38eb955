use chrono::{TimeZone, Utc};
use geotrack_core::{
    error::{DecodeError, Error},
    geo::Pos,
    gpx::{self, Gpx, Point, Route, Track, TrackPoint, TrackSegment, Waypoint},
};
use tempdir::TempDir;

#[test]
fn load_routes() {
    let gpx = gpx::load("./tests/data/routes.gpx").unwrap();
    assert_eq!(gpx.version, 1.1);
    assert!(gpx.waypoints.is_empty());
    assert!(gpx.routes.is_empty());
    assert_eq!(gpx.tracks.len(), 2);

    let first = &gpx.tracks[0];
    assert_eq!(first.leg, 1);
    assert_eq!(first.name, "Ambleside - Grasmere");
    assert_eq!(first.desc, "First leg");
    assert_eq!(first.segments.len(), 2);
    assert_eq!(first.line().len(), 5);
    assert_eq!(
        first.segments[0].points[0].time,
        Some(Utc.with_ymd_and_hms(2023, 6, 1, 8, 0, 0).unwrap())
    );
    assert_eq!(first.segments[0].points[2].time, None);
    assert_eq!(
        first.segments[1].points[1].point.pos(),
        Pos::new(54.46031, -3.0052, 151.0)
    );

    assert_eq!(gpx.tracks[1].leg, 2);
    assert_eq!(gpx.tracks[1].desc, "");
}

#[test]
fn load_waypoints() {
    let gpx = gpx::load("./tests/data/waypoints.gpx").unwrap();
    let names: Vec<&str> = gpx.waypoints.iter().map(|w| w.name.as_str()).collect();
    assert_eq!(names, ["Ambleside", "Grasmere Church", "Parking"]);
    assert_eq!(gpx.waypoints[0].sym, "Lodging");
    assert_eq!(gpx.waypoints[2].desc, "car park");
    assert_eq!(gpx.waypoints[2].point.ele.0, 512.0);
}

#[test]
fn encode_format() {
    let gpx = Gpx {
        version: 1.1,
        waypoints: vec![Waypoint {
            point: Pos::new(51.123456, -0.1, 12.6).into(),
            name: "A & B".to_owned(),
            sym: String::new(),
            desc: "d".to_owned(),
        }],
        tracks: vec![Track {
            leg: 3,
            name: "T".to_owned(),
            desc: String::new(),
            segments: vec![TrackSegment {
                points: vec![
                    TrackPoint {
                        point: Pos::new(1.0, 2.0, 0.0).into(),
                        time: Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()),
                    },
                    TrackPoint {
                        point: Pos::new(1.5, 2.5, 0.0).into(),
                        time: None,
                    },
                ],
            }],
        }],
        routes: vec![Route {
            name: "R".to_owned(),
            desc: String::new(),
            points: vec![Pos::new(0.000004, 0.0, 0.0).into()],
        }],
    };

    let out = String::from_utf8(gpx::encode(&gpx).unwrap()).unwrap();
    assert_eq!(
        out,
        r#"<?xml version="1.0" encoding="UTF-8"?>
<gpx version="1.1">
	<wpt lat="51.12346" lon="-0.10000">
		<ele>13</ele>
		<name>A &amp; B</name>
		<desc>d</desc>
	</wpt>
	<trk leg="3">
		<name>T</name>
		<desc></desc>
		<trkseg>
			<trkpt lat="1.00000" lon="2.00000">
				<time>2024-05-01T10:00:00Z</time>
			</trkpt>
			<trkpt lat="1.50000" lon="2.50000"/>
		</trkseg>
	</trk>
	<rte>
		<name>R</name>
		<desc></desc>
		<rtept lat="0.00000" lon="0.00000"/>
	</rte>
</gpx>"#
    );
}

#[test]
fn track_without_leg() {
    let gpx = Gpx {
        version: 1.1,
        tracks: vec![Track::default()],
        ..Default::default()
    };
    let out = String::from_utf8(gpx::encode(&gpx).unwrap()).unwrap();
    assert!(out.contains("\t<trk>\n"));
    assert!(!out.contains("leg="));
}

#[test]
fn precision_survives_round_trip() {
    let positions = [
        Pos::new(54.428523, -2.963271, 45.4),
        Pos::new(-33.793291910360125, 151.1435370795134, 0.0),
        Pos::new(89.999999, -179.999996, 8848.86),
    ];
    let gpx = Gpx {
        version: 1.1,
        routes: vec![Route {
            points: positions.iter().copied().map(Point::from).collect(),
            ..Default::default()
        }],
        ..Default::default()
    };
    let decoded = gpx::decode(&gpx::encode(&gpx).unwrap()).unwrap();
    let line = decoded.routes[0].line();
    assert_eq!(line.len(), positions.len());
    for (a, b) in line.iter().zip(positions.iter()) {
        assert!((a.lat - b.lat).abs() <= 0.5e-5 + 1e-12);
        assert!((a.lon - b.lon).abs() <= 0.5e-5 + 1e-12);
        assert!((a.ele - b.ele).abs() <= 0.5);
    }
}

#[test]
fn save_and_load() {
    let dir = TempDir::new("gpx-save_and_load").unwrap();
    let path = dir.path().join("nested/out.gpx");

    let original = gpx::load("./tests/data/routes.gpx").unwrap();
    original.save(&path).unwrap();
    let reloaded = gpx::load(&path).unwrap();
    assert_eq!(reloaded, original);
}

#[test]
fn readable_by_other_gpx_libraries() {
    let mut original = gpx::load("./tests/data/waypoints.gpx").unwrap();
    original.tracks = gpx::load("./tests/data/routes.gpx").unwrap().tracks;
    for track in original.tracks.iter_mut() {
        track.leg = 0;
        track.desc = format!("{} km", track.line().length().round());
    }
    original.routes.push(Route {
        name: "Direct".to_owned(),
        desc: "As the crow flies".to_owned(),
        points: original.waypoints.iter().map(|w| w.point).collect(),
    });

    let bytes = gpx::encode(&original).unwrap();
    let parsed = ::gpx::read(bytes.as_slice()).unwrap();
    assert_eq!(parsed.waypoints.len(), 3);
    assert_eq!(parsed.waypoints[1].name.as_deref(), Some("Grasmere Church"));
    assert!((parsed.waypoints[0].point().y() - 54.42852).abs() < 1e-9);
    assert_eq!(parsed.tracks.len(), 2);
    assert_eq!(parsed.tracks[0].segments.len(), 2);
    assert_eq!(parsed.tracks[0].segments[0].points.len(), 3);
    assert_eq!(parsed.routes.len(), 1);
    assert_eq!(parsed.routes[0].points.len(), 3);
}

#[test]
fn decode_errors() {
    assert!(matches!(gpx::decode(b""), Err(DecodeError::Empty)));
    assert!(matches!(
        gpx::decode(b"<kml></kml>"),
        Err(DecodeError::UnexpectedRoot { .. })
    ));
    assert!(matches!(
        gpx::decode(br#"<gpx><wpt lat="north" lon="1"/></gpx>"#),
        Err(DecodeError::InvalidValue { .. })
    ));
    assert!(matches!(
        gpx::decode(br#"<gpx><trk><trkseg><trkpt lat="1" lon="1"><time>noon</time></trkpt></trkseg></trk></gpx>"#),
        Err(DecodeError::InvalidValue { .. })
    ));

    // missing fields decode as zero values
    let gpx = gpx::decode(br#"<gpx><wpt/><trk><trkseg/></trk></gpx>"#).unwrap();
    assert_eq!(gpx.version, 0.0);
    assert_eq!(gpx.waypoints[0], Waypoint::default());
    assert_eq!(gpx.tracks[0].leg, 0);
    assert!(gpx.tracks[0].line().is_empty());
}

#[test]
fn load_errors() {
    let dir = TempDir::new("gpx-load_errors").unwrap();
    assert!(matches!(
        gpx::load(dir.path().join("missing.gpx")),
        Err(Error::Open { .. })
    ));

    let broken = dir.path().join("broken.gpx");
    std::fs::write(&broken, "<gpx><wpt lat=\"1\" lon=\"x\"/></gpx>").unwrap();
    assert!(matches!(gpx::load(&broken), Err(Error::Decode { .. })));
}
