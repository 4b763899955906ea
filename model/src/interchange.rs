//! Flags stops where two selected routes are scheduled to arrive close enough together for a
//! passenger to change from one to the other.

use serde::Serialize;

use gtfs::{RouteID, StopID, Time, GTFS};

use crate::NetworkView;

#[derive(Clone, Debug)]
pub struct InterchangeOptions {
    /// Two arrivals this close together, inclusive, count as a connection
    pub tolerance_seconds: u32,
}

impl Default for InterchangeOptions {
    fn default() -> Self {
        Self {
            tolerance_seconds: 300,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct StopReport {
    pub stop_id: StopID,
    pub name: Option<String>,
    pub lon: f64,
    pub lat: f64,
    pub is_interchange: bool,
    /// In selection order
    pub routes: Vec<RouteArrivals>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RouteArrivals {
    pub route_id: RouteID,
    /// Sorted by time
    pub arrivals: Vec<Arrival>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Arrival {
    pub time: Time,
    /// True if another selected route arrives at this stop within the tolerance
    pub matched: bool,
}

impl StopReport {
    /// The routes with at least one matched arrival here
    pub fn connecting_routes(&self) -> Vec<&RouteID> {
        self.routes
            .iter()
            .filter(|r| r.arrivals.iter().any(|a| a.matched))
            .map(|r| &r.route_id)
            .collect()
    }
}

/// Is there some time in `others` within `tolerance_seconds` of `time`? `others` must be sorted.
pub fn arrival_matches(time: Time, others: &[Time], tolerance_seconds: u32) -> bool {
    // Only the neighbors on either side of where `time` would be inserted can be closest
    let idx = others.partition_point(|t| *t < time);
    let after = others
        .get(idx)
        .map(|t| t.abs_diff(time) <= tolerance_seconds)
        .unwrap_or(false);
    let before = idx > 0 && others[idx - 1].abs_diff(time) <= tolerance_seconds;
    after || before
}

/// True if any arrival of one route is within the tolerance of any arrival of the other. Both
/// slices must be sorted. The answer doesn't depend on the order of the arguments.
pub fn routes_connect(route1: &[Time], route2: &[Time], tolerance_seconds: u32) -> bool {
    route1
        .iter()
        .any(|t| arrival_matches(*t, route2, tolerance_seconds))
}

/// One report per stop in the view, in stop ID order. Arrivals of the same route never match each
/// other; a stop served by just one selected route is never an interchange.
pub fn find_interchanges(
    gtfs: &GTFS,
    view: &NetworkView,
    opts: &InterchangeOptions,
) -> Vec<StopReport> {
    let mut reports = Vec::new();
    for (stop_id, visits) in &view.stops {
        let stop = match gtfs.stops.get(stop_id) {
            Some(stop) => stop,
            None => {
                warn!("{stop_id} has arrivals but no coordinates, skipping it");
                continue;
            }
        };

        let mut is_interchange = false;
        let mut routes = Vec::new();
        for (route_id, times) in &visits.per_route {
            let mut arrivals = Vec::new();
            for time in times {
                let matched = visits
                    .per_route
                    .iter()
                    .filter(|(other, _)| other != route_id)
                    .any(|(_, other_times)| {
                        arrival_matches(*time, other_times, opts.tolerance_seconds)
                    });
                is_interchange |= matched;
                arrivals.push(Arrival {
                    time: *time,
                    matched,
                });
            }
            routes.push(RouteArrivals {
                route_id: route_id.clone(),
                arrivals,
            });
        }

        reports.push(StopReport {
            stop_id: stop_id.clone(),
            name: stop.name.clone(),
            lon: stop.pos.x(),
            lat: stop.pos.y(),
            is_interchange,
            routes,
        });
    }

    let num_interchanges = reports.iter().filter(|r| r.is_interchange).count();
    info!(
        "{num_interchanges} of {} stops are interchanges, with a tolerance of {}s",
        reports.len(),
        opts.tolerance_seconds
    );
    reports
}
