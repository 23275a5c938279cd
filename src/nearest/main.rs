//! One-shot nearest marker lookup from the command line.
//!
//! Loads the KML directory, resolves a decimal or DMS coordinate and prints
//! the same result panel the query server renders.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use milepost::config::Config;
use milepost::dms::{Axis, Dms};
use milepost::kml::{load_markers, MarkerCache};
use milepost::report::{LookupReport, Verdict};
use milepost::GeoPoint;

#[derive(Parser, Debug)]
#[command(name = "nearest")]
#[command(about = "Find the highway mileage marker nearest to a coordinate")]
struct Args {
    /// Latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true, requires = "lon", conflicts_with = "dms_lat")]
    lat: Option<f64>,

    /// Longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    lon: Option<f64>,

    /// Latitude as DMS text, e.g. 25°2'53"N
    #[arg(long, allow_hyphen_values = true, requires = "dms_lon")]
    dms_lat: Option<String>,

    /// Longitude as DMS text, e.g. 121°35'4"E
    #[arg(long, allow_hyphen_values = true, requires = "dms_lat")]
    dms_lon: Option<String>,

    /// Directory holding the KML marker files (overrides config)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Optional TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Log loader details
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Query point from whichever input format was given, else the config default
    fn query(&self, config: &Config) -> Result<GeoPoint> {
        if let (Some(lat), Some(lon)) = (self.lat, self.lon) {
            return GeoPoint::checked(lat, lon).context("Invalid coordinate");
        }

        if let (Some(lat), Some(lon)) = (&self.dms_lat, &self.dms_lon) {
            let lat = Dms::parse(Axis::Latitude, lat).context("Invalid DMS latitude")?;
            let lon = Dms::parse(Axis::Longitude, lon).context("Invalid DMS longitude")?;
            let point = GeoPoint::checked(lat.to_decimal(), lon.to_decimal())?;
            info!("Converted (DD): {}", point);
            return Ok(point);
        }

        let point = config.default_point();
        warn!("No coordinate given, using default {}", point);
        Ok(point)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::WARN })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(dir) = &args.data_dir {
        config.data.dir = dir.clone();
    }

    let query = args.query(&config)?;

    let mut cache = MarkerCache::new();
    let loaded = load_markers(&config.data.dir, &mut cache).with_context(|| {
        format!(
            "No mileage markers available. Put KML files into {}.",
            config.data.dir.display()
        )
    })?;

    let nearest = loaded.table.nearest(query)?;
    let report = LookupReport::build(query, &nearest, &config.report_options());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, loaded.table.len());
    }

    Ok(())
}

fn print_report(report: &LookupReport, marker_count: usize) {
    println!("Searched {} mileage markers", marker_count);
    println!(
        "Query:     {} ({} / {})",
        report.query, report.query_dms[0], report.query_dms[1]
    );
    println!("Highway:   {}", report.highway);
    println!("Marker:    {}", report.marker);
    println!("Distance:  {}", report.distance_text);
    match report.verdict {
        Verdict::Precise => println!("OK:        {}", report.message),
        Verdict::TooFar => println!("WARNING:   {}", report.message),
    }
    println!("Maps:      {}", report.maps_url);
}
