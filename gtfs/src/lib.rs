#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod calendar;
mod ids;
mod routes;
mod shapes;
mod source;
mod stop_times;
mod stops;
mod time;
mod trips;
pub mod validate;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use geo::{BoundingRect, LineString, MultiPoint};

pub use calendar::{parse_date, Calendar, DateFilter, DaysOfWeek, Service};
pub use ids::{RouteID, RouteVariantID, ServiceID, ShapeID, StopID, TripID};
pub use routes::{Route, RouteType, RouteVariant};
pub use source::{DirSource, FeedSource, ZipSource};
pub use stop_times::StopTime;
pub use stops::Stop;
pub use time::Time;
pub use trips::Trip;
pub use validate::{Issue, Severity};

pub struct GTFS {
    pub stops: BTreeMap<StopID, Stop>,
    pub routes: BTreeMap<RouteID, Route>,
    pub calendar: Calendar,
    pub shapes: BTreeMap<ShapeID, LineString<f64>>,
}

/// Every row of the feed, exactly as read. Nothing has been cross-checked yet.
pub struct Tables {
    pub stops: Vec<Stop>,
    pub routes: Vec<Route>,
    pub trips: Vec<Trip>,
    pub stop_times: Vec<(TripID, StopTime)>,
    /// None if shapes.txt is absent
    pub shapes: Option<BTreeMap<ShapeID, LineString<f64>>>,
    /// None if both calendar.txt and calendar_dates.txt are absent
    pub calendar: Option<Calendar>,
}

impl Tables {
    pub fn read<S: FeedSource>(source: &mut S) -> Result<Self> {
        let stops = stops::load(&source.require_file("stops.txt")?[..])
            .map_err(|err| anyhow!("stops.txt: {err}"))?;
        let routes = routes::load(&source.require_file("routes.txt")?[..])
            .map_err(|err| anyhow!("routes.txt: {err}"))?;
        let trips = trips::load(&source.require_file("trips.txt")?[..])
            .map_err(|err| anyhow!("trips.txt: {err}"))?;
        let stop_times = stop_times::load(&source.require_file("stop_times.txt")?[..])
            .map_err(|err| anyhow!("stop_times.txt: {err}"))?;

        let shapes = match source.read_file("shapes.txt")? {
            Some(bytes) => {
                Some(shapes::load(&bytes[..]).map_err(|err| anyhow!("shapes.txt: {err}"))?)
            }
            None => None,
        };

        let mut calendar = match source.read_file("calendar.txt")? {
            Some(bytes) => {
                Some(calendar::load(&bytes[..]).map_err(|err| anyhow!("calendar.txt: {err}"))?)
            }
            None => None,
        };
        if let Some(bytes) = source.read_file("calendar_dates.txt")? {
            let calendar = calendar.get_or_insert_with(Calendar::default);
            calendar::load_exceptions(calendar, &bytes[..])
                .map_err(|err| anyhow!("calendar_dates.txt: {err}"))?;
        }

        Ok(Self {
            stops,
            routes,
            trips,
            stop_times,
            shapes,
            calendar,
        })
    }

    /// A directory or a .zip file
    pub fn read_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            Self::read(&mut DirSource::new(path))
        } else {
            Self::read(&mut ZipSource::open(path)?)
        }
    }
}

impl GTFS {
    /// A directory or a .zip file
    pub fn load_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.is_dir() {
            Self::load(&mut DirSource::new(path))
        } else {
            Self::load(&mut ZipSource::open(path)?)
        }
    }

    /// Reads every table and refuses to continue if there are any integrity errors. Warnings are
    /// just logged.
    pub fn load<S: FeedSource>(source: &mut S) -> Result<Self> {
        let tables = Tables::read(source)?;

        let mut errors = Vec::new();
        for issue in validate::check(&tables) {
            match issue.severity() {
                Severity::Warning => warn!("{issue}"),
                Severity::Error => {
                    error!("{issue}");
                    errors.push(issue);
                }
            }
        }
        if !errors.is_empty() {
            bail!(
                "{} has {} integrity errors. The first: {}",
                source.describe(),
                errors.len(),
                errors[0]
            );
        }

        let gtfs = Self::from_tables(tables)?;
        info!(
            "Loaded {} stops and {} routes from {}",
            gtfs.stops.len(),
            gtfs.routes.len(),
            source.describe()
        );
        Ok(gtfs)
    }

    /// Assumes `validate::check` found no errors.
    pub fn from_tables(tables: Tables) -> Result<Self> {
        let mut gtfs = Self::empty();
        for stop in tables.stops {
            gtfs.stops.insert(stop.stop_id.clone(), stop);
        }
        for route in tables.routes {
            gtfs.routes.insert(route.route_id.clone(), route);
        }
        gtfs.shapes = tables.shapes.unwrap_or_default();
        match tables.calendar {
            Some(calendar) => {
                gtfs.calendar = calendar;
            }
            None => {
                info!("No calendar in this feed; every trip will be treated as running every day");
            }
        }

        let mut stop_times: BTreeMap<TripID, Vec<StopTime>> = BTreeMap::new();
        for (trip_id, st) in tables.stop_times {
            stop_times.entry(trip_id).or_insert_with(Vec::new).push(st);
        }
        // Sort by stop_sequence, in case the file isn't in order
        for list in stop_times.values_mut() {
            list.sort_by_key(|st| st.stop_sequence);
        }

        let mut trips_per_route: BTreeMap<RouteID, Vec<Trip>> = BTreeMap::new();
        for mut trip in tables.trips {
            trip.stop_times = match stop_times.remove(&trip.trip_id) {
                Some(list) => list,
                None => continue,
            };
            trips_per_route
                .entry(trip.route_id.clone())
                .or_insert_with(Vec::new)
                .push(trip);
        }

        let mut id_counter = 0;
        let mut empty = Vec::new();
        for route in gtfs.routes.values_mut() {
            if let Some(trips) = trips_per_route.remove(&route.route_id) {
                group_variants(&mut id_counter, route, trips);
            } else {
                empty.push(route.route_id.clone());
            }
        }
        for id in empty {
            gtfs.routes.remove(&id);
        }
        if !trips_per_route.is_empty() {
            bail!(
                "Trips belong to unknown routes: {:?}",
                trips_per_route.keys().collect::<Vec<_>>()
            );
        }

        // Find all routes per stop
        for route in gtfs.routes.values() {
            for variant in &route.variants {
                for stop_id in variant.stops() {
                    match gtfs.stops.get_mut(&stop_id) {
                        Some(stop) => {
                            stop.routes.insert(route.route_id.clone());
                        }
                        None => bail!("{:?} visits unknown {stop_id}", variant.variant_id),
                    }
                }
            }
        }

        dump_bounding_box(&gtfs);

        Ok(gtfs)
    }

    pub fn empty() -> Self {
        Self {
            stops: BTreeMap::new(),
            routes: BTreeMap::new(),
            calendar: Calendar::default(),
            shapes: BTreeMap::new(),
        }
    }

    /// Trips of a route that run according to the filter, in no particular order
    pub fn trips_of_route(&self, route_id: &RouteID, filter: &DateFilter) -> Vec<&Trip> {
        let route = match self.routes.get(route_id) {
            Some(route) => route,
            None => return Vec::new(),
        };
        route
            .variants
            .iter()
            .filter(|v| self.calendar.service_matches(&v.service_id, filter))
            .flat_map(|v| v.trips.iter())
            .collect()
    }

    pub fn variant(&self, id: RouteVariantID) -> Result<&RouteVariant> {
        for route in self.routes.values() {
            for variant in &route.variants {
                if variant.variant_id == id {
                    return Ok(variant);
                }
            }
        }
        bail!("Unknown {:?}", id)
    }

    pub fn parent_of_variant(&self, id: RouteVariantID) -> Result<&Route> {
        let variant = self.variant(id)?;
        self.routes
            .get(&variant.route_id)
            .ok_or_else(|| anyhow!("{:?} has unknown parent {}", id, variant.route_id))
    }

    pub fn all_variants(&self) -> Vec<RouteVariantID> {
        self.routes
            .values()
            .flat_map(|route| route.variants.iter().map(|v| v.variant_id))
            .collect()
    }

    /// Sorted, like the legend of a map
    pub fn route_ids(&self) -> Vec<RouteID> {
        self.routes.keys().cloned().collect()
    }
}

fn group_variants(id_counter: &mut usize, route: &mut Route, trips: Vec<Trip>) {
    // (Stops, headsign, service, shape)
    type Key = (Vec<StopID>, Option<String>, ServiceID, Option<ShapeID>);

    let mut variants: BTreeMap<Key, Vec<Trip>> = BTreeMap::new();
    for trip in trips {
        let stops: Vec<StopID> = trip.stop_times.iter().map(|st| st.stop_id.clone()).collect();
        let key = (
            stops,
            trip.headsign.clone(),
            trip.service_id.clone(),
            trip.shape_id.clone(),
        );
        variants.entry(key).or_insert_with(Vec::new).push(trip);
    }

    for ((_, headsign, service_id, shape_id), mut trips) in variants {
        trips.sort_by_key(|t| t.stop_times[0].arrival_time);

        route.variants.push(RouteVariant {
            route_id: route.route_id.clone(),
            variant_id: RouteVariantID(*id_counter),
            trips,
            headsign,
            service_id,
            shape_id,
        });
        *id_counter += 1;
    }
}

fn dump_bounding_box(gtfs: &GTFS) {
    use geojson::{Feature, FeatureCollection, GeoJson};

    let pts: MultiPoint<f64> = gtfs.stops.values().map(|s| s.pos).collect();
    let rect = match pts.bounding_rect() {
        Some(rect) => rect,
        None => return,
    };
    let feature = Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::from(
            &rect.to_polygon(),
        ))),
        id: None,
        properties: None,
        foreign_members: None,
    };
    let gj = GeoJson::FeatureCollection(FeatureCollection {
        features: vec![feature],
        bbox: None,
        foreign_members: None,
    });
    match serde_json::to_string(&gj) {
        Ok(json) => info!("GeoJSON covering the bounding box: {json}"),
        Err(err) => warn!("Couldn't describe the bounding box: {err}"),
    }
}

fn csv_reader<R: std::io::Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}
