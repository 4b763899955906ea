#[macro_use]
extern crate anyhow;
#[macro_use]
extern crate log;

use anyhow::Result;
use geo::Point;
use structopt::StructOpt;

use gtfs::{parse_date, validate, DateFilter, DaysOfWeek, RouteID, Severity, Tables, GTFS};
use model::{
    export_network, find_interchanges, nearest_stops, write_geojson, Districts,
    InterchangeOptions, NetworkView, RouteSelection, StopReport,
};

#[derive(StructOpt)]
#[structopt(
    name = "bus_interchanges",
    about = "Find where selected bus routes meet in a GTFS feed"
)]
struct Args {
    /// The path to a GTFS directory or .zip file
    #[structopt(long)]
    gtfs: String,
    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt)]
enum Command {
    /// List every route with at least one trip
    Routes,
    /// Check the feed for broken references and bad schedules
    Validate,
    /// Show the arrivals of some routes at every stop they serve, and which stops are interchanges
    Interchanges {
        /// A route_id to include. Repeat for more routes.
        #[structopt(long = "route", required = true)]
        routes: Vec<String>,
        /// Arrivals of two different routes this many seconds apart or closer count as a
        /// connection
        #[structopt(long, default_value = "300")]
        tolerance: u32,
        /// Only use trips running on this day, as YYYY-MM-DD
        #[structopt(long)]
        date: Option<String>,
        /// Only use trips running on some days of the week, like "weekdays", "sat,sun" or "all"
        #[structopt(long, conflicts_with = "date")]
        days: Option<String>,
        /// Print the reports as JSON instead of text
        #[structopt(long)]
        json: bool,
        /// Also write routes and stops to this GeoJSON file
        #[structopt(long)]
        geojson: Option<String>,
    },
    /// Find the stops closest to a point
    Nearest {
        #[structopt(long, allow_hyphen_values = true)]
        lat: f64,
        #[structopt(long, allow_hyphen_values = true)]
        lon: f64,
        #[structopt(long, default_value = "5")]
        limit: usize,
    },
    /// Look up which district a point is in, or group every stop by district
    Districts {
        /// A GeoJSON file with one polygon feature per district
        #[structopt(long)]
        districts: String,
        /// The feature property holding the district's name
        #[structopt(long, default_value = "layer")]
        name_property: String,
        #[structopt(long, allow_hyphen_values = true, requires = "lon")]
        lat: Option<f64>,
        #[structopt(long, allow_hyphen_values = true, requires = "lat")]
        lon: Option<f64>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::from_args();
    match args.cmd {
        Command::Validate => validate_feed(&args.gtfs),
        Command::Routes => list_routes(&GTFS::load_path(&args.gtfs)?),
        Command::Interchanges {
            routes,
            tolerance,
            date,
            days,
            json,
            geojson,
        } => {
            let gtfs = GTFS::load_path(&args.gtfs)?;
            let filter = match (date, days) {
                (Some(raw), _) => DateFilter::SingleDay(parse_date(&raw)?),
                (None, Some(raw)) => DateFilter::Daily(DaysOfWeek::parse(&raw)?),
                (None, None) => DateFilter::None,
            };
            let selection = RouteSelection::from_ids(routes.into_iter().map(RouteID::new));
            let view = NetworkView::build(&gtfs, &selection, &filter);
            if view.routes.is_empty() {
                bail!("None of the selected routes are in the feed. Try the routes command.");
            }
            let reports = find_interchanges(
                &gtfs,
                &view,
                &InterchangeOptions {
                    tolerance_seconds: tolerance,
                },
            );

            if json {
                println!("{}", serde_json::to_string_pretty(&reports)?);
            } else {
                print_reports(&reports);
            }
            if let Some(path) = geojson {
                write_geojson(&path, export_network(&gtfs, &view, &reports))?;
            }
            Ok(())
        }
        Command::Nearest { lat, lon, limit } => {
            let gtfs = GTFS::load_path(&args.gtfs)?;
            let results = nearest_stops(&gtfs, Point::new(lon, lat), limit);
            if results.is_empty() {
                warn!("The feed has no stops");
            }
            for (stop, dist) in results {
                println!("{:.0}m\t{}", dist, stop.describe());
            }
            Ok(())
        }
        Command::Districts {
            districts,
            name_property,
            lat,
            lon,
        } => {
            let districts = Districts::load(&districts, &name_property)?;
            if let (Some(lat), Some(lon)) = (lat, lon) {
                match districts.district_of(Point::new(lon, lat)) {
                    Some(d) => println!("{}", d.name),
                    None => bail!("({lat}, {lon}) isn't in any district"),
                }
                return Ok(());
            }

            let gtfs = GTFS::load_path(&args.gtfs)?;
            for (name, stops) in districts.bucket_stops(&gtfs) {
                let name = name.unwrap_or_else(|| "(outside every district)".to_string());
                println!("{name}: {} stops", stops.len());
                for stop_id in stops {
                    println!("  {}", gtfs.stops[stop_id].describe());
                }
            }
            Ok(())
        }
    }
}

fn validate_feed(path: &str) -> Result<()> {
    let tables = Tables::read_path(path)?;
    let issues = validate::check(&tables);
    let mut errors = 0;
    for issue in &issues {
        let label = match issue.severity() {
            Severity::Error => {
                errors += 1;
                "error"
            }
            Severity::Warning => "warning",
        };
        println!("{label}: {issue}");
    }
    println!("{} errors, {} warnings", errors, issues.len() - errors);
    if errors > 0 {
        bail!("{path} failed validation");
    }
    Ok(())
}

fn list_routes(gtfs: &GTFS) -> Result<()> {
    for route in gtfs.routes.values() {
        println!(
            "{}\t{}\t{} variants, {} trips",
            route.route_id,
            route.describe(),
            route.variants.len(),
            route.num_trips()
        );
        for variant in &route.variants {
            println!("    {}", variant.describe(gtfs));
        }
    }
    Ok(())
}

// Matched arrivals are marked with a *
fn print_reports(reports: &[StopReport]) {
    for report in reports {
        let name = report.name.as_deref().unwrap_or("");
        if report.is_interchange {
            println!("{} {name} [interchange]", report.stop_id);
        } else {
            println!("{} {name}", report.stop_id);
        }
        for route in &report.routes {
            let times: Vec<String> = route
                .arrivals
                .iter()
                .map(|a| {
                    if a.matched {
                        format!("{}*", a.time.hh_mm())
                    } else {
                        a.time.hh_mm()
                    }
                })
                .collect();
            println!("  {}: {}", route.route_id, times.join(" "));
        }
    }
    let num = reports.iter().filter(|r| r.is_interchange).count();
    println!("{num} interchanges among {} stops", reports.len());
}
