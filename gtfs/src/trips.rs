use anyhow::Result;
use serde::Deserialize;

use super::{RouteID, ServiceID, ShapeID, StopID, StopTime, Time, TripID};

pub struct Trip {
    pub trip_id: TripID,
    pub route_id: RouteID,
    pub shape_id: Option<ShapeID>,
    pub service_id: ServiceID,
    pub headsign: Option<String>,
    /// true is 0 in GTFS, false is 1. Inbound/outbound are arbitrary.
    pub outbound_direction: bool,

    /// Sorted by stop_sequence
    pub stop_times: Vec<StopTime>,
}

impl Trip {
    /// The first arrival at this stop, if the trip visits it at all
    pub fn arrival_at(&self, stop_id: &StopID) -> Option<Time> {
        self.stop_times
            .iter()
            .find(|st| &st.stop_id == stop_id)
            .map(|st| st.arrival_time)
    }

    /// Assumes the trip has at least one stop time, which loading guarantees.
    pub fn time_range(&self) -> (Time, Time) {
        (
            self.stop_times[0].arrival_time,
            self.stop_times[self.stop_times.len() - 1].departure_time,
        )
    }
}

pub fn load<R: std::io::Read>(reader: R) -> Result<Vec<Trip>> {
    let mut trips = Vec::new();
    for rec in super::csv_reader(reader).deserialize() {
        let rec: Record = rec?;
        trips.push(Trip {
            outbound_direction: match rec.direction_id {
                Some(0) => true,
                Some(1) => false,
                // outbound_direction is just used for grouping, so if there's no direction, that's
                // fine
                None => true,
                Some(x) => bail!("{} has unknown direction_id {x}", rec.trip_id),
            },
            trip_id: rec.trip_id,
            route_id: rec.route_id,
            shape_id: rec.shape_id,
            service_id: rec.service_id,
            headsign: rec.trip_headsign,

            stop_times: Vec::new(),
        });
    }
    Ok(trips)
}

#[derive(Deserialize)]
struct Record {
    trip_id: TripID,
    route_id: RouteID,
    service_id: ServiceID,
    #[serde(default)]
    trip_headsign: Option<String>,
    #[serde(default)]
    direction_id: Option<usize>,
    #[serde(default)]
    shape_id: Option<ShapeID>,
}
