use std::collections::BTreeMap;

use gtfs::{DateFilter, RouteID, RouteVariantID, ShapeID, StopID, Time, GTFS};

use crate::RouteSelection;

/// Everything needed to draw a handful of selected routes together: their shapes, and every stop
/// they serve with the scheduled arrivals per route.
pub struct NetworkView {
    /// In selection order. Routes unknown to the feed are omitted.
    pub routes: Vec<SelectedRoute>,
    /// Every stop served by at least one selected route
    pub stops: BTreeMap<StopID, StopVisits>,
}

pub struct SelectedRoute {
    pub route_id: RouteID,
    /// Deduplicated, in order of first use
    pub shapes: Vec<ShapeID>,
    /// Only the variants running according to the date filter
    pub variants: Vec<RouteVariantID>,
    pub num_trips: usize,
}

/// The arrivals at one stop. Routes are in selection order; each list of times is sorted, with
/// one entry per trip visiting the stop.
#[derive(Default)]
pub struct StopVisits {
    pub per_route: Vec<(RouteID, Vec<Time>)>,
}

impl StopVisits {
    pub fn arrivals(&self, route_id: &RouteID) -> Option<&Vec<Time>> {
        self.per_route
            .iter()
            .find(|(id, _)| id == route_id)
            .map(|(_, times)| times)
    }

    fn add(&mut self, route_id: &RouteID, time: Time) {
        if let Some((_, times)) = self.per_route.iter_mut().find(|(id, _)| id == route_id) {
            times.push(time);
        } else {
            self.per_route.push((route_id.clone(), vec![time]));
        }
    }
}

impl NetworkView {
    pub fn build(gtfs: &GTFS, selection: &RouteSelection, filter: &DateFilter) -> Self {
        let mut routes = Vec::new();
        let mut stops: BTreeMap<StopID, StopVisits> = BTreeMap::new();

        for route_id in selection.iter() {
            let route = match gtfs.routes.get(route_id) {
                Some(route) => route,
                None => {
                    warn!("Selected {route_id} isn't in the feed (or has no trips), skipping");
                    continue;
                }
            };

            let mut shapes: Vec<ShapeID> = Vec::new();
            let mut variants = Vec::new();
            let mut num_trips = 0;
            for variant in &route.variants {
                if !gtfs.calendar.service_matches(&variant.service_id, filter) {
                    continue;
                }
                variants.push(variant.variant_id);
                if let Some(ref shape_id) = variant.shape_id {
                    if !shapes.contains(shape_id) {
                        shapes.push(shape_id.clone());
                    }
                }
                for trip in &variant.trips {
                    num_trips += 1;
                    for st in &trip.stop_times {
                        stops
                            .entry(st.stop_id.clone())
                            .or_insert_with(StopVisits::default)
                            .add(route_id, st.arrival_time);
                    }
                }
            }
            if num_trips == 0 {
                info!("{route_id} has no trips matching {filter:?}");
            }

            routes.push(SelectedRoute {
                route_id: route_id.clone(),
                shapes,
                variants,
                num_trips,
            });
        }

        for visits in stops.values_mut() {
            for (_, times) in &mut visits.per_route {
                times.sort();
            }
        }

        Self { routes, stops }
    }
}
