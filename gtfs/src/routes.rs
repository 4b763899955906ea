use anyhow::Result;
use geo::{Coord, LineString};
use serde::Deserialize;

use super::{RouteID, RouteVariantID, ServiceID, ShapeID, StopID, Trip, GTFS};

pub struct Route {
    pub route_id: RouteID,
    pub route_type: RouteType,
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub description: Option<String>,

    pub variants: Vec<RouteVariant>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "u16")]
pub enum RouteType {
    Tram,
    Subway,
    Rail,
    Bus,
    Ferry,
    CableTram,
    AerialLift,
    Furnicular,
    Trolleybus,
    Monorail,
    /// Extended route types and anything else
    Other(u16),
}

impl From<u16> for RouteType {
    fn from(x: u16) -> Self {
        use RouteType::*;
        match x {
            0 => Tram,
            1 => Subway,
            2 => Rail,
            3 => Bus,
            4 => Ferry,
            5 => CableTram,
            6 => AerialLift,
            7 => Furnicular,
            11 => Trolleybus,
            12 => Monorail,
            x => Other(x),
        }
    }
}

pub struct RouteVariant {
    pub route_id: RouteID,
    pub variant_id: RouteVariantID,
    // Sorted by time
    pub trips: Vec<Trip>,
    pub headsign: Option<String>,
    pub service_id: ServiceID,
    pub shape_id: Option<ShapeID>,
}

impl Route {
    pub fn describe(&self) -> String {
        let name = self
            .short_name
            .as_ref()
            .or(self.long_name.as_ref())
            .or(self.description.as_ref())
            .map(|x| x.to_string())
            .unwrap_or_else(|| self.route_id.to_string());
        format!("{name} ({:?})", self.route_type)
    }

    pub fn num_trips(&self) -> usize {
        self.variants.iter().map(|v| v.trips.len()).sum()
    }

    /// Shapes used by any variant, deduplicated, in order of first use
    pub fn shape_ids(&self) -> Vec<ShapeID> {
        let mut result: Vec<ShapeID> = Vec::new();
        for variant in &self.variants {
            if let Some(ref id) = variant.shape_id {
                if !result.contains(id) {
                    result.push(id.clone());
                }
            }
        }
        result
    }
}

impl RouteVariant {
    pub fn describe(&self, gtfs: &GTFS) -> String {
        let headsign = match self.headsign {
            Some(ref x) => format!("{:?} ({x})", self.variant_id),
            None => format!("{:?}", self.variant_id),
        };
        let days = gtfs
            .calendar
            .services
            .get(&self.service_id)
            .map(|s| s.days_of_week.describe())
            .unwrap_or_else(|| self.service_id.to_string());
        format!(
            "{} {} - {}, {} trips",
            gtfs.routes[&self.route_id].describe(),
            headsign,
            days,
            self.trips.len()
        )
    }

    pub fn stops(&self) -> Vec<StopID> {
        self.trips[0]
            .stop_times
            .iter()
            .map(|st| st.stop_id.clone())
            .collect()
    }

    /// If GTFS has an original shape, use that. Otherwise calculated from straight lines between
    /// stops.
    pub fn polyline(&self, gtfs: &GTFS) -> Result<LineString<f64>> {
        if let Some(pl) = self.shape_id.as_ref().and_then(|id| gtfs.shapes.get(id)) {
            return Ok(pl.clone());
        }

        let mut pts: Vec<Coord<f64>> = Vec::new();
        for stop_id in self.stops() {
            match gtfs.stops.get(&stop_id) {
                Some(stop) => pts.push(stop.pos.into()),
                None => bail!("{:?} visits unknown {stop_id}", self.variant_id),
            }
        }
        pts.dedup();
        if pts.len() < 2 {
            bail!("{:?} doesn't visit enough distinct stops", self.variant_id);
        }
        Ok(LineString::new(pts))
    }
}

pub fn load<R: std::io::Read>(reader: R) -> Result<Vec<Route>> {
    let mut routes = Vec::new();
    for rec in super::csv_reader(reader).deserialize() {
        let rec: Record = rec?;
        routes.push(Route {
            route_id: rec.route_id,
            route_type: rec.route_type.unwrap_or(RouteType::Bus),
            short_name: rec.route_short_name,
            long_name: rec.route_long_name,
            description: rec.route_desc,

            variants: Vec::new(),
        });
    }
    Ok(routes)
}

#[derive(Deserialize)]
struct Record {
    route_id: RouteID,
    #[serde(default)]
    route_type: Option<RouteType>,
    #[serde(default)]
    route_short_name: Option<String>,
    #[serde(default)]
    route_long_name: Option<String>,
    #[serde(default)]
    route_desc: Option<String>,
}
