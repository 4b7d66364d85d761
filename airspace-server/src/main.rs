//! airspace: CLI + web server for the Airspace map demos.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};

use airspace_core::aircraft::Aircraft;
use airspace_core::airports::{label, parse_airports_csv, AirportIndex, AIRPORTS_CSV_URL};
use airspace_core::config::{self, Config};
use airspace_core::geo::{compute_bounding_box, DEFAULT_RADIUS_MILES, RADIUS_MILES_VALUES};
use airspace_core::traffic::TrafficMonitor;
use airspace_core::types::format_clock;

mod opensky;
mod poller;
mod web;

use opensky::OpenSkyClient;
use poller::TrafficPoller;

#[derive(Parser)]
#[command(name = "airspace", version, about = "Geospatial map demos and live air traffic")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the map pages and the JSON API
    Serve {
        /// Bind address (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port (overrides config)
        #[arg(long)]
        port: Option<u16>,

        /// Mapbox access token
        #[arg(long, env = "MAPBOX_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },

    /// Fetch live traffic around an airport and print it
    Traffic {
        /// IATA code
        #[arg(long)]
        airport: String,

        /// Search radius in miles (10, 25 or 50)
        #[arg(long, default_value_t = DEFAULT_RADIUS_MILES)]
        radius: u32,

        /// Keep polling on the configured interval
        #[arg(long)]
        watch: bool,
    },

    /// Search the airport table
    Airports {
        /// Typeahead query; lists the first results when omitted
        query: Option<String>,
    },

    /// Build an airport table from an OurAirports CSV
    GenAirports {
        /// CSV path or http(s) URL
        #[arg(long, default_value = AIRPORTS_CSV_URL)]
        input: String,

        /// Output JSON path
        #[arg(long, default_value = "data/airports.json")]
        output: PathBuf,
    },

    /// Show configuration, or write the defaults
    Config {
        /// Create ~/.airspace/config.yaml if it does not exist
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let _ = tracing_subscriber::fmt::try_init();
    let cli = Cli::parse();
    let config = config::load_config();

    match cli.command {
        Commands::Serve { host, port, token } => cmd_serve(config, host, port, token).await,
        Commands::Traffic {
            airport,
            radius,
            watch,
        } => cmd_traffic(&config, &airport, radius, watch).await,
        Commands::Airports { query } => cmd_airports(&config, query.as_deref()),
        Commands::GenAirports { input, output } => cmd_gen_airports(&input, &output).await,
        Commands::Config { init } => cmd_config(&config, init),
    }
}

fn poll_interval(config: &Config) -> Duration {
    Duration::from_secs(config.traffic.poll_interval_secs.max(1))
}

async fn cmd_serve(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
    token: Option<String>,
) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.dashboard.host = host;
    }
    if let Some(port) = port {
        config.dashboard.port = port;
    }
    let token = token
        .filter(|t| !t.trim().is_empty())
        .or_else(|| config::resolve_token(&config));

    let source = Arc::new(OpenSkyClient::new(&config.traffic.api_url)?);
    let poller = TrafficPoller::new(source, poll_interval(&config));
    web::serve(&config, token, poller).await
}

async fn cmd_traffic(config: &Config, airport: &str, radius: u32, watch: bool) -> anyhow::Result<()> {
    if !RADIUS_MILES_VALUES.contains(&radius) {
        bail!("radius must be one of {RADIUS_MILES_VALUES:?}");
    }
    let airports = web::load_airports(config.data.airports.as_deref())?;
    let airport = airports.require(&airport.to_uppercase())?;
    let bbox = compute_bounding_box(airport.coordinates, f64::from(radius));

    let client = OpenSkyClient::new(&config.traffic.api_url)?;
    let monitor = Mutex::new(TrafficMonitor::new());
    monitor
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .select(Some(bbox));

    println!();
    println!("{} within {radius} mi", label(airport));

    let mut ticker = tokio::time::interval(poll_interval(config));
    loop {
        ticker.tick().await;
        poller::poll_once(&monitor, &client).await;
        let snapshot = monitor
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .snapshot();

        println!();
        match (&snapshot.error, snapshot.last_updated) {
            (Some(error), _) => println!("  {error}"),
            (None, Some(t)) => println!(
                "  {} aircraft, updated {}",
                snapshot.aircraft.len(),
                format_clock(t)
            ),
            (None, None) => println!("  No data"),
        }
        print_aircraft(&snapshot.aircraft);

        if !watch {
            if let Some(error) = snapshot.error {
                bail!(error);
            }
            return Ok(());
        }
    }
}

fn print_aircraft(aircraft: &[Aircraft]) {
    if aircraft.is_empty() {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec![
        "ICAO", "Callsign", "Country", "Alt (ft)", "Speed (kts)", "Hdg", "Phase", "Lat", "Lon",
    ]);

    let mut sorted: Vec<&Aircraft> = aircraft.iter().collect();
    sorted.sort_by(|a, b| b.altitude_ft.total_cmp(&a.altitude_ft));

    for ac in sorted {
        table.add_row(vec![
            Cell::new(&ac.icao24),
            Cell::new(&ac.callsign),
            Cell::new(&ac.origin_country),
            Cell::new(format!("{:.0}", ac.altitude_ft)),
            Cell::new(format!("{:.0}", ac.velocity_kts)),
            Cell::new(format!("{:.0}", ac.heading_deg)),
            Cell::new(ac.phase),
            Cell::new(format!("{:.4}", ac.latitude)),
            Cell::new(format!("{:.4}", ac.longitude)),
        ]);
    }

    println!("{table}");
}

fn cmd_airports(config: &Config, query: Option<&str>) -> anyhow::Result<()> {
    let airports = web::load_airports(config.data.airports.as_deref())?;
    let results = airports.search(query.unwrap_or(""));

    println!();
    println!("{} match(es) of {} airports", results.len(), airports.len());
    if results.is_empty() {
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["IATA", "Name", "Municipality", "Country", "Lat", "Lon"]);
    for airport in results {
        table.add_row(vec![
            Cell::new(&airport.id),
            Cell::new(&airport.name),
            Cell::new(&airport.municipality),
            Cell::new(&airport.iso_country),
            Cell::new(format!("{:.4}", airport.coordinates.lat)),
            Cell::new(format!("{:.4}", airport.coordinates.lng)),
        ]);
    }
    println!("{table}");
    Ok(())
}

async fn cmd_gen_airports(input: &str, output: &Path) -> anyhow::Result<()> {
    let text = if input.starts_with("http://") || input.starts_with("https://") {
        let response = reqwest::get(input)
            .await
            .with_context(|| format!("downloading {input}"))?;
        if !response.status().is_success() {
            bail!("downloading {input}: {}", response.status());
        }
        response.text().await?
    } else {
        std::fs::read_to_string(input).with_context(|| format!("reading {input}"))?
    };

    let index = AirportIndex::new(parse_airports_csv(&text)?);
    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(output, index.to_json()?)
        .with_context(|| format!("writing {}", output.display()))?;

    println!("Wrote {} airports to {}", index.len(), output.display());
    Ok(())
}

fn cmd_config(config: &Config, init: bool) -> anyhow::Result<()> {
    let path = config::config_file();
    if init {
        if path.exists() {
            println!("Config already exists: {}", path.display());
        } else {
            let path = config::save_config(&Config::default())?;
            println!("Wrote default config to {}", path.display());
        }
        return Ok(());
    }

    let token = match config::resolve_token(config) {
        Some(_) => "set",
        None => "missing",
    };
    println!();
    println!("Config: {}", path.display());
    println!();
    println!(
        "  Map style:      {}",
        config.map.style.as_deref().unwrap_or("(per page)")
    );
    println!("  Mapbox token:   {token}");
    println!("  Traffic API:    {}", config.traffic.api_url);
    println!("  Poll interval:  {}s", config.traffic.poll_interval_secs);
    println!(
        "  Airports:       {}",
        config.data.airports.as_deref().unwrap_or("(built-in)")
    );
    println!(
        "  Subway stops:   {}",
        config.data.stations.as_deref().unwrap_or("(bundled)")
    );
    println!(
        "  Subway routes:  {}",
        config.data.routes.as_deref().unwrap_or("(bundled)")
    );
    println!(
        "  Dashboard:      http://{}:{}",
        config.dashboard.host, config.dashboard.port
    );
    println!();
    Ok(())
}
