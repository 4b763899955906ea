use anyhow::Result;
use serde::Deserialize;

use super::{StopID, Time, TripID};

#[derive(Clone, Debug, PartialEq)]
pub struct StopTime {
    pub stop_id: StopID,
    pub stop_sequence: usize,
    pub arrival_time: Time,
    pub departure_time: Time,
}

/// Rows are returned in file order. Grouping per trip and sorting by stop_sequence happens later,
/// after validation.
pub fn load<R: std::io::Read>(reader: R) -> Result<Vec<(TripID, StopTime)>> {
    let mut stop_times = Vec::new();
    for (idx, rec) in super::csv_reader(reader).deserialize().enumerate() {
        let rec: Record = rec?;
        // Only one of the two is often filled out. Use it for both.
        let (arrival_time, departure_time) = match (rec.arrival_time, rec.departure_time) {
            (Some(arrival), Some(departure)) => (Time::parse(&arrival)?, Time::parse(&departure)?),
            (Some(x), None) | (None, Some(x)) => {
                let t = Time::parse(&x)?;
                (t, t)
            }
            (None, None) => bail!(
                "Row {} for {} at {} has neither arrival_time nor departure_time",
                idx + 1,
                rec.trip_id,
                rec.stop_id
            ),
        };
        stop_times.push((
            rec.trip_id,
            StopTime {
                stop_id: rec.stop_id,
                stop_sequence: rec.stop_sequence,
                arrival_time,
                departure_time,
            },
        ));
    }
    Ok(stop_times)
}

#[derive(Deserialize)]
struct Record {
    trip_id: TripID,
    #[serde(default)]
    arrival_time: Option<String>,
    #[serde(default)]
    departure_time: Option<String>,
    stop_id: StopID,
    stop_sequence: usize,
}
