use geotrack_core::{
    annotate::{annotate, annotate_waypoints, describe_routes, LegData, MappingData, Metadata},
    gpx::{self, Track},
};

fn metadata() -> Metadata {
    Metadata::load("./tests/data/metadata.json").unwrap()
}

#[test]
fn load_metadata() {
    let metadata = metadata();
    assert_eq!(metadata.legs.len(), 2);
    assert_eq!(metadata.legs[1].to, "Helvellyn");
    assert_eq!(metadata.waypoints.len(), 3);
    assert_eq!(metadata.waypoints[1].terrain, "");
    assert_eq!(metadata.mapping.len(), 3);
    assert_eq!(metadata.mapping[1].data, "");
}

#[test]
fn routes_from_legs() {
    let tracks = gpx::load("./tests/data/routes.gpx").unwrap();
    let routes = describe_routes(&tracks.tracks, &metadata()).unwrap();

    assert_eq!(routes.len(), 2);
    assert_eq!(routes[0].name, "Leg 1 / 2: Ambleside to Grasmere");
    assert_eq!(
        routes[0].desc,
        "★ Rydal Water\n★ Dove Cottage\n\nA gentle start along the lakes."
    );
    // both segments of the first track end up in its route
    assert_eq!(routes[0].points.len(), 5);
    assert_eq!(routes[0].line(), tracks.tracks[0].line());
    assert_eq!(routes[1].name, "Leg 2 / 2: Grasmere to Helvellyn");
}

#[test]
fn routes_need_leg_metadata() {
    let tracks = gpx::load("./tests/data/routes.gpx").unwrap();
    let mut metadata = metadata();
    metadata.legs.retain(|leg| leg.leg != 2);
    let err = describe_routes(&tracks.tracks, &metadata).unwrap_err();
    assert!(err.to_string().contains("leg 2"));

    let empty = Track {
        leg: 1,
        name: "empty".to_owned(),
        ..Default::default()
    };
    assert!(describe_routes(&[empty], &self::metadata()).is_err());
}

#[test]
fn waypoints_renamed_and_described() {
    let waypoints = gpx::load("./tests/data/waypoints.gpx").unwrap();
    let annotated = annotate_waypoints(&waypoints.waypoints, &metadata()).unwrap();

    assert_eq!(annotated.len(), 3);
    assert_eq!(annotated[0].name, "Ambleside (Start)");
    assert_eq!(
        annotated[0].desc,
        "★ Town at the head of Windermere.\n\nTerrain: Road"
    );
    assert_eq!(annotated[0].sym, "Lodging");
    assert_eq!(annotated[0].point, waypoints.waypoints[0].point);

    assert_eq!(annotated[1].name, "Grasmere");
    assert_eq!(annotated[1].desc, "★ Village.");

    // listed as gpx-only, left untouched
    assert_eq!(annotated[2], waypoints.waypoints[2]);
}

#[test]
fn every_waypoint_needs_metadata() {
    let waypoints = gpx::load("./tests/data/waypoints.gpx").unwrap();
    let mut metadata = metadata();
    metadata.mapping.retain(|m| m.gpx != "Grasmere Church");

    let err = annotate_waypoints(&waypoints.waypoints, &metadata).unwrap_err();
    assert!(err.to_string().contains("Grasmere Church"));
}

#[test]
fn every_record_must_be_used() {
    let waypoints = gpx::load("./tests/data/waypoints.gpx").unwrap();
    let mut metadata = metadata();
    metadata.mapping.retain(|m| !m.gpx.is_empty());

    let err = annotate_waypoints(&waypoints.waypoints, &metadata).unwrap_err();
    assert!(err.to_string().contains("Elterwater"));
}

#[test]
fn annotate_document() {
    let tracks = gpx::load("./tests/data/routes.gpx").unwrap();
    let waypoints = gpx::load("./tests/data/waypoints.gpx").unwrap();
    let out = annotate(&metadata(), &tracks, &waypoints).unwrap();

    assert_eq!(out.version, 1.1);
    assert!(out.tracks.is_empty());
    assert_eq!(out.routes.len(), 2);
    assert_eq!(out.waypoints.len(), 3);

    let decoded = gpx::decode(&gpx::encode(&out).unwrap()).unwrap();
    assert_eq!(decoded, out);
}

#[test]
fn metadata_fields_default() {
    let metadata: Metadata = serde_json::from_str(r#"{"Legs": [{"Leg": 4}]}"#).unwrap();
    assert!(metadata.waypoints.is_empty());
    let LegData { leg, from, .. } = &metadata.legs[0];
    assert_eq!(*leg, 4);
    assert!(from.is_empty());

    let mapping: MappingData = serde_json::from_str(r#"{"Gpx": "a"}"#).unwrap();
    assert_eq!(mapping.data, "");
}
