use std::collections::BTreeMap;

use geo::Point;
use gtfs::{parse_date, DateFilter, DaysOfWeek, RouteID, StopID, Time, GTFS};
use model::{
    export_network, find_interchanges, nearest_stop, Districts, InterchangeOptions, NetworkView,
    RouteSelection, StopReport,
};

// Route A and B both pass through the piazza, four minutes apart on the first run. Route C only
// runs on Sundays.
fn files() -> BTreeMap<String, String> {
    let mut files: BTreeMap<String, String> = BTreeMap::new();
    for (name, contents) in [
        (
            "stops.txt",
            "stop_id,stop_name,stop_lat,stop_lon\n\
             P,Piazza della Repubblica,43.5225,13.2433\n\
             S,Stazione FS,43.5170,13.2370\n\
             O,Ospedale,43.5300,13.2550\n\
             M,Minonna,43.5120,13.2500\n\
             X,Deposito,43.5000,13.2000\n",
        ),
        (
            "routes.txt",
            "route_id,route_short_name,route_long_name,route_type\n\
             A,A,Stazione - Ospedale,3\n\
             B,B,Minonna - Stazione,3\n\
             C,C,Festiva,3\n",
        ),
        (
            "trips.txt",
            "route_id,service_id,trip_id,shape_id\n\
             A,FER,A1,SHA\n\
             A,FER,A2,SHA\n\
             B,FER,B1,\n\
             C,FES,C1,\n",
        ),
        (
            "stop_times.txt",
            "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
             A1,08:00:00,08:00:00,S,1\n\
             A1,08:06:00,08:06:00,P,2\n\
             A1,08:15:00,08:15:00,O,3\n\
             A2,09:00:00,09:00:00,S,1\n\
             A2,09:06:00,09:06:00,P,2\n\
             A2,09:15:00,09:15:00,O,3\n\
             B1,07:55:00,07:55:00,M,1\n\
             B1,08:10:00,08:10:00,P,2\n\
             B1,08:20:00,08:20:00,S,3\n\
             C1,08:06:00,08:06:00,P,1\n\
             C1,12:00:00,12:00:00,O,2\n",
        ),
        (
            "shapes.txt",
            "shape_id,shape_pt_lat,shape_pt_lon,shape_pt_sequence\n\
             SHA,43.5170,13.2370,1\n\
             SHA,43.5200,13.2400,2\n\
             SHA,43.5225,13.2433,3\n\
             SHA,43.5300,13.2550,4\n",
        ),
        (
            "calendar.txt",
            "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date\n\
             FER,1,1,1,1,1,1,0,20240101,20241231\n\
             FES,0,0,0,0,0,0,1,20240101,20241231\n",
        ),
    ] {
        files.insert(name.to_string(), contents.to_string());
    }
    files
}

fn feed() -> GTFS {
    GTFS::load(&mut files()).unwrap()
}

fn select(ids: &[&str]) -> RouteSelection {
    RouteSelection::from_ids(ids.iter().map(|id| RouteID::new(*id)))
}

fn reports(gtfs: &GTFS, ids: &[&str], filter: &DateFilter, tolerance: u32) -> Vec<StopReport> {
    let view = NetworkView::build(gtfs, &select(ids), filter);
    find_interchanges(
        gtfs,
        &view,
        &InterchangeOptions {
            tolerance_seconds: tolerance,
        },
    )
}

fn interchanges(reports: &[StopReport]) -> Vec<&str> {
    reports
        .iter()
        .filter(|r| r.is_interchange)
        .map(|r| r.stop_id.as_str())
        .collect()
}

fn find<'a>(reports: &'a [StopReport], stop: &str) -> &'a StopReport {
    reports
        .iter()
        .find(|r| r.stop_id.as_str() == stop)
        .unwrap()
}

#[test]
fn two_routes_meet_at_the_piazza() {
    let gtfs = feed();
    let reports = reports(&gtfs, &["A", "B"], &DateFilter::None, 300);

    // The depot isn't served by A or B, and C isn't selected
    let stops: Vec<&str> = reports.iter().map(|r| r.stop_id.as_str()).collect();
    assert_eq!(stops, vec!["M", "O", "P", "S"]);
    assert_eq!(interchanges(&reports), vec!["P"]);

    let piazza = find(&reports, "P");
    assert_eq!(piazza.name.as_deref(), Some("Piazza della Repubblica"));
    assert_eq!(piazza.routes.len(), 2);
    assert_eq!(piazza.routes[0].route_id, RouteID::new("A"));
    let a: Vec<(Time, bool)> = piazza.routes[0]
        .arrivals
        .iter()
        .map(|a| (a.time, a.matched))
        .collect();
    assert_eq!(
        a,
        vec![(Time::hms(8, 6, 0), true), (Time::hms(9, 6, 0), false)]
    );
    assert!(piazza.routes[1].arrivals[0].matched);
    assert_eq!(piazza.connecting_routes().len(), 2);

    // Both routes serve the station, but 20 minutes apart
    let station = find(&reports, "S");
    assert_eq!(station.routes.len(), 2);
    assert!(!station.is_interchange);
}

#[test]
fn selection_order_doesnt_change_the_answer() {
    let gtfs = feed();
    let ab = reports(&gtfs, &["A", "B"], &DateFilter::None, 300);
    let ba = reports(&gtfs, &["B", "A"], &DateFilter::None, 300);
    assert_eq!(interchanges(&ab), interchanges(&ba));
    // But the routes are listed in selection order
    assert_eq!(find(&ba, "P").routes[0].route_id, RouteID::new("B"));
}

#[test]
fn one_route_alone_never_interchanges() {
    let gtfs = feed();
    // A visits the piazza twice an hour apart; that's not a connection with itself
    let reports = reports(&gtfs, &["A"], &DateFilter::None, 7200);
    assert!(interchanges(&reports).is_empty());
}

#[test]
fn tolerance_controls_matching() {
    let gtfs = feed();
    // 240 seconds apart
    assert_eq!(
        interchanges(&reports(&gtfs, &["A", "B"], &DateFilter::None, 240)),
        vec!["P"]
    );
    assert!(interchanges(&reports(&gtfs, &["A", "B"], &DateFilter::None, 239)).is_empty());
    // The station arrivals are 20 minutes apart
    assert_eq!(
        interchanges(&reports(&gtfs, &["A", "B"], &DateFilter::None, 1200)),
        vec!["P", "S"]
    );
}

#[test]
fn date_filter_drops_services() {
    let gtfs = feed();
    // Identical times at the piazza
    assert_eq!(
        interchanges(&reports(&gtfs, &["A", "C"], &DateFilter::None, 0)),
        vec!["P"]
    );

    // 2024-03-11 is a Monday, so C doesn't run
    let monday = DateFilter::SingleDay(parse_date("2024-03-11").unwrap());
    let view = NetworkView::build(&gtfs, &select(&["A", "C"]), &monday);
    assert_eq!(view.routes[1].num_trips, 0);
    assert!(view.stops.values().all(|v| v.per_route.len() == 1));
    assert!(interchanges(&reports(&gtfs, &["A", "C"], &monday, 300)).is_empty());
}

#[test]
fn days_of_week_filter() {
    let gtfs = feed();
    let sunday = DateFilter::Daily(DaysOfWeek::parse("sun").unwrap());
    let view = NetworkView::build(&gtfs, &select(&["A", "C"]), &sunday);
    assert_eq!(view.routes[0].num_trips, 0);
    assert_eq!(view.routes[1].num_trips, 1);
    assert!(interchanges(&reports(&gtfs, &["A", "C"], &sunday, 0)).is_empty());

    let weekend = DateFilter::Daily(DaysOfWeek::parse("sat,sun").unwrap());
    assert_eq!(
        interchanges(&reports(&gtfs, &["A", "C"], &weekend, 0)),
        vec!["P"]
    );
}

#[test]
fn trips_on_services_missing_from_the_calendar() {
    let mut files = files();
    files.insert(
        "trips.txt".to_string(),
        "route_id,service_id,trip_id,shape_id\n\
         A,FER,A1,SHA\n\
         A,FER,A2,SHA\n\
         B,ODD,B1,\n\
         C,FES,C1,\n"
            .to_string(),
    );
    // Only a warning
    let gtfs = GTFS::load(&mut files).unwrap();

    // Without a date filter, every trip counts
    assert_eq!(gtfs.trips_of_route(&RouteID::new("B"), &DateFilter::None).len(), 1);
    let unfiltered = reports(&gtfs, &["A", "B"], &DateFilter::None, 300);
    assert_eq!(find(&unfiltered, "P").routes.len(), 2);
    assert_eq!(interchanges(&unfiltered), vec!["P"]);

    // No specific date includes them
    let monday = DateFilter::SingleDay(parse_date("2024-03-11").unwrap());
    assert!(interchanges(&reports(&gtfs, &["A", "B"], &monday, 300)).is_empty());
}

#[test]
fn unknown_routes_are_skipped() {
    let gtfs = feed();
    let view = NetworkView::build(&gtfs, &select(&["nope", "A"]), &DateFilter::None);
    assert_eq!(view.routes.len(), 1);
    assert_eq!(view.routes[0].route_id, RouteID::new("A"));
    assert_eq!(view.routes[0].num_trips, 2);
    assert_eq!(view.routes[0].shapes.len(), 1);
    assert_eq!(
        view.stops[&StopID::new("P")].arrivals(&RouteID::new("A")).unwrap().len(),
        2
    );
}

#[test]
fn every_referenced_stop_exists() {
    let gtfs = feed();
    for route in gtfs.routes.values() {
        for variant in &route.variants {
            for stop_id in variant.stops() {
                assert!(gtfs.stops.contains_key(&stop_id));
            }
        }
    }
}

#[test]
fn export_routes_and_stops() {
    let gtfs = feed();
    let view = NetworkView::build(&gtfs, &select(&["A", "B"]), &DateFilter::None);
    let reports = find_interchanges(&gtfs, &view, &InterchangeOptions::default());
    let fc = export_network(&gtfs, &view, &reports);

    fn kind(f: &geojson::Feature) -> &str {
        f.property("type").and_then(|x| x.as_str()).unwrap()
    }
    // A uses its shape; B has none, so it's drawn between its stops
    assert_eq!(fc.features.iter().filter(|f| kind(f) == "route").count(), 2);
    assert_eq!(fc.features.iter().filter(|f| kind(f) == "stop").count(), 4);

    let piazza = fc
        .features
        .iter()
        .find(|f| f.property("stop_id").and_then(|x| x.as_str()) == Some("P"))
        .unwrap();
    assert_eq!(
        piazza.property("interchange").and_then(|x| x.as_bool()),
        Some(true)
    );
    assert_eq!(
        piazza.property("matched_arrivals").unwrap()["A"],
        serde_json::json!(["08:06"])
    );
}

#[test]
fn nearest_stop_and_district() {
    let gtfs = feed();
    let (stop, _) = nearest_stop(&gtfs, Point::new(13.2431, 43.5224)).unwrap();
    assert_eq!(stop.stop_id, StopID::new("P"));

    let districts = Districts::from_geojson(
        r#"{"type": "FeatureCollection", "features": [{
            "type": "Feature",
            "properties": {"layer": "Centro Storico"},
            "geometry": {"type": "Polygon", "coordinates": [[[13.24, 43.52], [13.25, 43.52], [13.25, 43.525], [13.24, 43.525], [13.24, 43.52]]]}
        }]}"#,
        "layer",
    )
    .unwrap();
    let buckets = districts.bucket_stops(&gtfs);
    assert_eq!(
        buckets[&Some("Centro Storico".to_string())],
        vec![&StopID::new("P")]
    );
    assert_eq!(buckets[&None].len(), 4);
}
