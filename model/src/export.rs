use std::collections::BTreeSet;

use anyhow::Result;
use geojson::{Feature, FeatureCollection, GeoJson};
use serde_json::{Map, Value};

use gtfs::{StopID, GTFS};

use crate::{NetworkView, StopReport};

/// Route geometry and stops as plain GeoJSON, for a map to style however it likes.
///
/// Each selected route becomes one LineString per shape it uses. Routes without any shapes fall
/// back to straight lines between stops, one per distinct stop pattern. Each reported stop becomes
/// a Point, with its arrivals per route and whether it's an interchange.
pub fn export_network(
    gtfs: &GTFS,
    view: &NetworkView,
    reports: &[StopReport],
) -> FeatureCollection {
    let mut features = Vec::new();

    for selected in &view.routes {
        let mut num_lines = 0;
        for shape_id in &selected.shapes {
            let pl = match gtfs.shapes.get(shape_id) {
                Some(pl) => pl,
                None => continue,
            };
            let mut feature = feature(geojson::Value::from(pl));
            feature.set_property("type", "route");
            feature.set_property("route_id", selected.route_id.to_string());
            feature.set_property("shape_id", shape_id.to_string());
            features.push(feature);
            num_lines += 1;
        }
        if num_lines > 0 {
            continue;
        }

        let mut seen_patterns: BTreeSet<Vec<StopID>> = BTreeSet::new();
        for id in &selected.variants {
            let variant = match gtfs.variant(*id) {
                Ok(variant) => variant,
                Err(err) => {
                    warn!("{err}");
                    continue;
                }
            };
            if !seen_patterns.insert(variant.stops()) {
                continue;
            }
            match variant.polyline(gtfs) {
                Ok(pl) => {
                    let mut feature = feature(geojson::Value::from(&pl));
                    feature.set_property("type", "route");
                    feature.set_property("route_id", selected.route_id.to_string());
                    features.push(feature);
                }
                Err(err) => warn!("No line for {}: {err}", selected.route_id),
            }
        }
    }

    for report in reports {
        let mut arrivals = Map::new();
        let mut matched = Map::new();
        for route in &report.routes {
            arrivals.insert(
                route.route_id.to_string(),
                route
                    .arrivals
                    .iter()
                    .map(|a| Value::from(a.time.hh_mm()))
                    .collect(),
            );
            matched.insert(
                route.route_id.to_string(),
                route
                    .arrivals
                    .iter()
                    .filter(|a| a.matched)
                    .map(|a| Value::from(a.time.hh_mm()))
                    .collect(),
            );
        }

        let mut feature = feature(geojson::Value::Point(vec![report.lon, report.lat]));
        feature.set_property("type", "stop");
        feature.set_property("stop_id", report.stop_id.to_string());
        feature.set_property("name", report.name.clone());
        feature.set_property("interchange", report.is_interchange);
        feature.set_property("arrivals", Value::Object(arrivals));
        feature.set_property("matched_arrivals", Value::Object(matched));
        features.push(feature);
    }

    FeatureCollection {
        features,
        bbox: None,
        foreign_members: None,
    }
}

pub fn write_geojson(path: &str, fc: FeatureCollection) -> Result<()> {
    let gj = GeoJson::FeatureCollection(fc);
    fs_err::write(path, serde_json::to_string_pretty(&gj)?)?;
    info!("Wrote {path}");
    Ok(())
}

fn feature(value: geojson::Value) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(value)),
        id: None,
        properties: None,
        foreign_members: None,
    }
}
