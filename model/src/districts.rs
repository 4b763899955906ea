use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use geo::{Centroid, Intersects, MultiPolygon, Point};
use geojson::{Feature, GeoJson};

use gtfs::{StopID, GTFS};

/// Used when a feature has no usable name
pub const UNKNOWN_DISTRICT: &str = "unknown";

/// A named part of the city, like a quartiere
pub struct District {
    pub name: String,
    pub area: MultiPolygon<f64>,
    /// Where to put a label. None only for degenerate polygons.
    pub centroid: Option<Point<f64>>,
}

pub struct Districts {
    pub districts: Vec<District>,
}

impl Districts {
    pub fn load<P: AsRef<Path>>(path: P, name_property: &str) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs_err::read_to_string(path)?;
        Self::from_geojson(&raw, name_property).map_err(|err| anyhow!("{}: {err}", path.display()))
    }

    /// Each Polygon or MultiPolygon feature becomes one district. The name comes from
    /// `name_property`, then `name`.
    pub fn from_geojson(raw: &str, name_property: &str) -> Result<Self> {
        let features = match raw.parse::<GeoJson>()? {
            GeoJson::FeatureCollection(fc) => fc.features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(_) => bail!("Expected features with names, not a bare geometry"),
        };

        let mut districts = Vec::new();
        for feature in features {
            let name = feature_name(&feature, name_property);
            let geometry = match feature.geometry {
                Some(geometry) => geometry,
                None => {
                    warn!("District {name} has no geometry, skipping");
                    continue;
                }
            };
            let area = match geo::Geometry::<f64>::try_from(geometry)? {
                geo::Geometry::Polygon(polygon) => MultiPolygon::new(vec![polygon]),
                geo::Geometry::MultiPolygon(mp) => mp,
                _ => {
                    warn!("District {name} isn't a polygon, skipping");
                    continue;
                }
            };
            districts.push(District {
                centroid: area.centroid(),
                name,
                area,
            });
        }
        if districts.is_empty() {
            bail!("No polygon districts found");
        }
        Ok(Self { districts })
    }

    /// The first district covering the point. Points right on a shared boundary belong to
    /// whichever district comes first in the input.
    pub fn district_of(&self, pt: Point<f64>) -> Option<&District> {
        self.districts.iter().find(|d| d.area.intersects(&pt))
    }

    /// Groups every stop by district name. Stops outside every district are under `None`.
    pub fn bucket_stops<'a>(&self, gtfs: &'a GTFS) -> BTreeMap<Option<String>, Vec<&'a StopID>> {
        let mut buckets: BTreeMap<Option<String>, Vec<&StopID>> = BTreeMap::new();
        for stop in gtfs.stops.values() {
            let name = self.district_of(stop.pos).map(|d| d.name.clone());
            buckets
                .entry(name)
                .or_insert_with(Vec::new)
                .push(&stop.stop_id);
        }
        buckets
    }
}

fn feature_name(feature: &Feature, name_property: &str) -> String {
    for key in [name_property, "name"] {
        match feature.property(key) {
            Some(serde_json::Value::String(x)) if !x.is_empty() => return x.clone(),
            Some(serde_json::Value::Number(x)) => return x.to_string(),
            _ => {}
        }
    }
    UNKNOWN_DISTRICT.to_string()
}
