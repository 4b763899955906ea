#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

mod districts;
mod export;
mod interchange;
mod nearest;
mod network;
mod selection;

pub use self::districts::{District, Districts, UNKNOWN_DISTRICT};
pub use self::export::{export_network, write_geojson};
pub use self::interchange::{
    arrival_matches, find_interchanges, routes_connect, Arrival, InterchangeOptions,
    RouteArrivals, StopReport,
};
pub use self::nearest::{nearest_stop, nearest_stops};
pub use self::network::{NetworkView, SelectedRoute, StopVisits};
pub use self::selection::RouteSelection;
