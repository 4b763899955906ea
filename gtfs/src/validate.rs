//! Referential and sanity checks over the raw tables, before anything is assembled.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::{RouteID, ServiceID, ShapeID, StopID, StopTime, Tables, Time, TripID};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Issue {
    DuplicateStop(StopID),
    DuplicateRoute(RouteID),
    DuplicateTrip(TripID),
    BadCoordinates {
        stop_id: StopID,
        lon: f64,
        lat: f64,
    },
    /// Only the first trip referencing the stop is recorded
    UnknownStop {
        trip_id: TripID,
        stop_id: StopID,
    },
    UnknownTrip(TripID),
    UnknownRoute {
        trip_id: TripID,
        route_id: RouteID,
    },
    ArrivalAfterDeparture {
        trip_id: TripID,
        stop_sequence: usize,
        arrival: Time,
        departure: Time,
    },
    DuplicateStopSequence {
        trip_id: TripID,
        stop_sequence: usize,
    },

    TripWithoutStopTimes(TripID),
    RouteWithoutTrips(RouteID),
    UnknownService {
        trip_id: TripID,
        service_id: ServiceID,
    },
    UnknownShape {
        trip_id: TripID,
        shape_id: ShapeID,
    },
    TimeGoesBackwards {
        trip_id: TripID,
        stop_sequence: usize,
    },
}

impl Issue {
    pub fn severity(&self) -> Severity {
        match self {
            Issue::TripWithoutStopTimes(_)
            | Issue::RouteWithoutTrips(_)
            | Issue::UnknownService { .. }
            | Issue::UnknownShape { .. }
            | Issue::TimeGoesBackwards { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Issue::DuplicateStop(id) => write!(f, "stops.txt: duplicate stop_id {id}"),
            Issue::DuplicateRoute(id) => write!(f, "routes.txt: duplicate route_id {id}"),
            Issue::DuplicateTrip(id) => write!(f, "trips.txt: duplicate trip_id {id}"),
            Issue::BadCoordinates { stop_id, lon, lat } => {
                write!(f, "stops.txt: {stop_id} has bad coordinates ({lat}, {lon})")
            }
            Issue::UnknownStop { trip_id, stop_id } => write!(
                f,
                "stop_times.txt: {trip_id} references {stop_id}, which isn't in stops.txt"
            ),
            Issue::UnknownTrip(id) => {
                write!(f, "stop_times.txt: {id} isn't in trips.txt")
            }
            Issue::UnknownRoute { trip_id, route_id } => write!(
                f,
                "trips.txt: {trip_id} belongs to {route_id}, which isn't in routes.txt"
            ),
            Issue::ArrivalAfterDeparture {
                trip_id,
                stop_sequence,
                arrival,
                departure,
            } => write!(
                f,
                "stop_times.txt: {trip_id} at stop_sequence {stop_sequence} arrives at {arrival}, after departing at {departure}"
            ),
            Issue::DuplicateStopSequence {
                trip_id,
                stop_sequence,
            } => write!(
                f,
                "stop_times.txt: {trip_id} has stop_sequence {stop_sequence} more than once"
            ),
            Issue::TripWithoutStopTimes(id) => write!(f, "trips.txt: {id} has no stop times"),
            Issue::RouteWithoutTrips(id) => write!(f, "routes.txt: {id} has no trips"),
            Issue::UnknownService {
                trip_id,
                service_id,
            } => write!(
                f,
                "trips.txt: {trip_id} uses {service_id}, which isn't in the calendar. It'll only \
                 be used without a date filter"
            ),
            Issue::UnknownShape { trip_id, shape_id } => write!(
                f,
                "trips.txt: {trip_id} uses {shape_id}, which isn't in shapes.txt"
            ),
            Issue::TimeGoesBackwards {
                trip_id,
                stop_sequence,
            } => write!(
                f,
                "stop_times.txt: {trip_id} goes back in time at stop_sequence {stop_sequence}"
            ),
        }
    }
}

pub fn check(tables: &Tables) -> Vec<Issue> {
    let mut issues = Vec::new();

    let mut stop_ids = BTreeSet::new();
    for stop in &tables.stops {
        if !stop_ids.insert(&stop.stop_id) {
            issues.push(Issue::DuplicateStop(stop.stop_id.clone()));
        }
        let (lon, lat) = (stop.pos.x(), stop.pos.y());
        if !lon.is_finite() || !lat.is_finite() || lon.abs() > 180.0 || lat.abs() > 90.0 {
            issues.push(Issue::BadCoordinates {
                stop_id: stop.stop_id.clone(),
                lon,
                lat,
            });
        }
    }

    let mut route_ids = BTreeSet::new();
    for route in &tables.routes {
        if !route_ids.insert(&route.route_id) {
            issues.push(Issue::DuplicateRoute(route.route_id.clone()));
        }
    }

    let mut trip_ids = BTreeSet::new();
    let mut routes_with_trips = BTreeSet::new();
    for trip in &tables.trips {
        if !trip_ids.insert(&trip.trip_id) {
            issues.push(Issue::DuplicateTrip(trip.trip_id.clone()));
        }
        if route_ids.contains(&trip.route_id) {
            routes_with_trips.insert(&trip.route_id);
        } else {
            issues.push(Issue::UnknownRoute {
                trip_id: trip.trip_id.clone(),
                route_id: trip.route_id.clone(),
            });
        }
        if let Some(ref calendar) = tables.calendar {
            if !calendar.services.contains_key(&trip.service_id) {
                issues.push(Issue::UnknownService {
                    trip_id: trip.trip_id.clone(),
                    service_id: trip.service_id.clone(),
                });
            }
        }
        if let (Some(shapes), Some(shape_id)) = (&tables.shapes, &trip.shape_id) {
            if !shapes.contains_key(shape_id) {
                issues.push(Issue::UnknownShape {
                    trip_id: trip.trip_id.clone(),
                    shape_id: shape_id.clone(),
                });
            }
        }
    }
    for route in &tables.routes {
        if !routes_with_trips.contains(&route.route_id) {
            issues.push(Issue::RouteWithoutTrips(route.route_id.clone()));
        }
    }

    let mut unknown_stops: BTreeMap<&StopID, &TripID> = BTreeMap::new();
    let mut unknown_trips = BTreeSet::new();
    let mut per_trip: BTreeMap<&TripID, Vec<&StopTime>> = BTreeMap::new();
    for (trip_id, st) in &tables.stop_times {
        if !stop_ids.contains(&st.stop_id) {
            unknown_stops.entry(&st.stop_id).or_insert(trip_id);
        }
        if !trip_ids.contains(trip_id) {
            unknown_trips.insert(trip_id);
        }
        if st.arrival_time > st.departure_time {
            issues.push(Issue::ArrivalAfterDeparture {
                trip_id: trip_id.clone(),
                stop_sequence: st.stop_sequence,
                arrival: st.arrival_time,
                departure: st.departure_time,
            });
        }
        per_trip.entry(trip_id).or_insert_with(Vec::new).push(st);
    }
    for (stop_id, trip_id) in unknown_stops {
        issues.push(Issue::UnknownStop {
            trip_id: trip_id.clone(),
            stop_id: stop_id.clone(),
        });
    }
    for trip_id in unknown_trips {
        issues.push(Issue::UnknownTrip(trip_id.clone()));
    }

    for (trip_id, mut stop_times) in per_trip {
        stop_times.sort_by_key(|st| st.stop_sequence);
        for pair in stop_times.windows(2) {
            if pair[0].stop_sequence == pair[1].stop_sequence {
                issues.push(Issue::DuplicateStopSequence {
                    trip_id: trip_id.clone(),
                    stop_sequence: pair[1].stop_sequence,
                });
            } else if pair[1].arrival_time < pair[0].departure_time {
                issues.push(Issue::TimeGoesBackwards {
                    trip_id: trip_id.clone(),
                    stop_sequence: pair[1].stop_sequence,
                });
            }
        }
    }

    let trips_with_stop_times: BTreeSet<&TripID> =
        tables.stop_times.iter().map(|(id, _)| id).collect();
    for trip in &tables.trips {
        if !trips_with_stop_times.contains(&trip.trip_id) {
            issues.push(Issue::TripWithoutStopTimes(trip.trip_id.clone()));
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn feed(stop_times: &str) -> BTreeMap<String, String> {
        let mut files = BTreeMap::new();
        files.insert(
            "stops.txt".to_string(),
            "stop_id,stop_name,stop_lat,stop_lon\nS1,Piazza,43.52,13.24\nS2,Stazione,43.51,13.23\n"
                .to_string(),
        );
        files.insert(
            "routes.txt".to_string(),
            "route_id,route_long_name,route_type\nR1,Circolare,3\nR2,Empty,3\n".to_string(),
        );
        files.insert(
            "trips.txt".to_string(),
            "route_id,service_id,trip_id\nR1,FER,T1\nR1,FER,T2\n".to_string(),
        );
        files.insert("stop_times.txt".to_string(), stop_times.to_string());
        files
    }

    fn issues_for(stop_times: &str) -> Vec<Issue> {
        let tables = Tables::read(&mut feed(stop_times)).unwrap();
        check(&tables)
    }

    #[test]
    fn clean_feed_only_warns() {
        let issues = issues_for(
            "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
             T1,08:00:00,08:00:00,S1,1\n\
             T1,08:05:00,08:05:00,S2,2\n\
             T2,09:00:00,09:00:00,S2,1\n",
        );
        assert_eq!(issues, vec![Issue::RouteWithoutTrips(RouteID::new("R2"))]);
        assert!(issues.iter().all(|i| i.severity() == Severity::Warning));
    }

    #[test]
    fn every_stop_time_references_a_known_stop() {
        let issues = issues_for(
            "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
             T1,08:00:00,08:00:00,S1,1\n\
             T1,08:05:00,08:05:00,NOPE,2\n\
             T2,09:00:00,09:00:00,NOPE,1\n",
        );
        let unknown: Vec<&Issue> = issues
            .iter()
            .filter(|i| matches!(i, Issue::UnknownStop { .. }))
            .collect();
        assert_eq!(
            unknown,
            vec![&Issue::UnknownStop {
                trip_id: TripID::new("T1"),
                stop_id: StopID::new("NOPE"),
            }]
        );
        assert_eq!(unknown[0].severity(), Severity::Error);
    }

    #[test]
    fn schedule_problems() {
        let issues = issues_for(
            "trip_id,arrival_time,departure_time,stop_id,stop_sequence\n\
             T1,08:10:00,08:00:00,S1,1\n\
             T1,07:55:00,07:55:00,S2,2\n\
             T1,08:06:00,08:06:00,S1,2\n\
             GHOST,09:00:00,09:00:00,S2,1\n",
        );
        assert!(issues.contains(&Issue::ArrivalAfterDeparture {
            trip_id: TripID::new("T1"),
            stop_sequence: 1,
            arrival: Time::hms(8, 10, 0),
            departure: Time::hms(8, 0, 0),
        }));
        assert!(issues.contains(&Issue::TimeGoesBackwards {
            trip_id: TripID::new("T1"),
            stop_sequence: 2,
        }));
        assert!(issues.contains(&Issue::DuplicateStopSequence {
            trip_id: TripID::new("T1"),
            stop_sequence: 2,
        }));
        assert!(issues.contains(&Issue::UnknownTrip(TripID::new("GHOST"))));
        assert!(issues.contains(&Issue::TripWithoutStopTimes(TripID::new("T2"))));
    }

    #[test]
    fn duplicates_and_coordinates() {
        let mut files = feed("trip_id,arrival_time,departure_time,stop_id,stop_sequence\n");
        files.insert(
            "stops.txt".to_string(),
            "stop_id,stop_lat,stop_lon\nS1,43.5,13.2\nS1,43.5,13.2\nS3,143.5,13.2\n".to_string(),
        );
        let issues = check(&Tables::read(&mut files).unwrap());
        assert!(issues.contains(&Issue::DuplicateStop(StopID::new("S1"))));
        assert!(issues
            .iter()
            .any(|i| matches!(i, Issue::BadCoordinates { stop_id, .. } if stop_id.as_str() == "S3")));
    }
}
