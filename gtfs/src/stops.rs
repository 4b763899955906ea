use std::collections::BTreeSet;

use anyhow::Result;
use geo::Point;
use serde::Deserialize;

use super::{RouteID, StopID};

pub struct Stop {
    pub stop_id: StopID,
    /// x is longitude, y is latitude
    pub pos: Point<f64>,
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,

    /// Every route with at least one trip visiting this stop
    pub routes: BTreeSet<RouteID>,
}

impl Stop {
    pub fn describe(&self) -> String {
        match self.name {
            Some(ref name) => format!("{name} ({})", self.stop_id),
            None => self.stop_id.to_string(),
        }
    }
}

pub fn load<R: std::io::Read>(reader: R) -> Result<Vec<Stop>> {
    let mut stops = Vec::new();
    for rec in super::csv_reader(reader).deserialize() {
        let rec: Record = rec?;
        stops.push(Stop {
            stop_id: rec.stop_id,
            pos: Point::new(rec.stop_lon, rec.stop_lat),
            code: rec.stop_code,
            name: rec.stop_name,
            description: rec.stop_desc,

            routes: BTreeSet::new(),
        });
    }
    Ok(stops)
}

#[derive(Deserialize)]
struct Record {
    stop_id: StopID,
    #[serde(default)]
    stop_code: Option<String>,
    #[serde(default)]
    stop_name: Option<String>,
    #[serde(default)]
    stop_desc: Option<String>,
    stop_lon: f64,
    stop_lat: f64,
    // TODO Parent stations (location_type = 1) are loaded like any other stop
}
