use geo::{Distance, Haversine, Point};

use gtfs::{Stop, GTFS};

/// The closest `limit` stops to a point, with distances in meters. Ties go to the lower stop ID.
/// Brute force over every stop.
pub fn nearest_stops(gtfs: &GTFS, pt: Point<f64>, limit: usize) -> Vec<(&Stop, f64)> {
    let mut results: Vec<(&Stop, f64)> = gtfs
        .stops
        .values()
        .map(|stop| (stop, Haversine.distance(pt, stop.pos)))
        .collect();
    results.sort_by(|(s1, d1), (s2, d2)| {
        d1.total_cmp(d2).then_with(|| s1.stop_id.cmp(&s2.stop_id))
    });
    results.truncate(limit);
    results
}

pub fn nearest_stop(gtfs: &GTFS, pt: Point<f64>) -> Option<(&Stop, f64)> {
    nearest_stops(gtfs, pt, 1).into_iter().next()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use gtfs::StopID;

    use super::*;

    fn stop(id: &str, lon: f64, lat: f64) -> Stop {
        Stop {
            stop_id: StopID::new(id),
            pos: Point::new(lon, lat),
            code: None,
            name: None,
            description: None,
            routes: BTreeSet::new(),
        }
    }

    #[test]
    fn closest_first() {
        let mut gtfs = GTFS::empty();
        for s in [
            stop("far", 13.30, 43.55),
            stop("near", 13.2435, 43.5226),
            stop("twin_b", 13.25, 43.52),
            stop("twin_a", 13.25, 43.52),
        ] {
            gtfs.stops.insert(s.stop_id.clone(), s);
        }

        let here = Point::new(13.2433, 43.5225);
        let (closest, dist) = nearest_stop(&gtfs, here).unwrap();
        assert_eq!(closest.stop_id.as_str(), "near");
        // About 20m away
        assert!(dist > 10.0 && dist < 30.0, "{dist}");

        let ids: Vec<&str> = nearest_stops(&gtfs, here, 3)
            .into_iter()
            .map(|(s, _)| s.stop_id.as_str())
            .collect();
        assert_eq!(ids, vec!["near", "twin_a", "twin_b"]);

        assert!(nearest_stop(&GTFS::empty(), here).is_none());
    }
}
