//! Query server for mileage marker lookups.
//!
//! Serves an HTML form (decimal or DMS input) with a result panel and a
//! two-point map, plus a JSON API over the same lookup.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use anyhow::{Context, Result};
use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use milepost::config::Config;
use milepost::dms::{Axis, Dms};
use milepost::kml::{load_markers, FileWarning, LoadReport, MarkerCache};
use milepost::report::{LookupReport, ReportOptions};
use milepost::{GeoPoint, MarkerTable};

mod page;
use page::{FormDefaults, FormParams, FormState, LookupPage, Outcome};

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "Highway mileage marker lookup server")]
struct Args {
    /// Optional TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (overrides config)
    #[arg(short, long)]
    listen: Option<String>,

    /// Directory holding the KML marker files (overrides config)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Distance in meters above which a match is flagged as too far
    #[arg(long)]
    threshold: Option<f64>,
}

/// Application state shared across handlers
struct AppState {
    data_dir: PathBuf,
    options: ReportOptions,
    defaults: FormDefaults,
    table: RwLock<Arc<MarkerTable>>,
    cache: Mutex<MarkerCache>,
}

impl AppState {
    fn new(config: &Config, report: LoadReport, cache: MarkerCache) -> Result<Self> {
        let [lat_dms, lon_dms] = config.default_dms()?;

        Ok(Self {
            data_dir: config.data.dir.clone(),
            options: config.report_options(),
            defaults: FormDefaults {
                point: config.default_point(),
                lat_dms,
                lon_dms,
            },
            table: RwLock::new(Arc::new(report.table)),
            cache: Mutex::new(cache),
        })
    }

    /// Current table snapshot
    fn table(&self) -> Result<Arc<MarkerTable>, (StatusCode, String)> {
        self.table.read().map(|t| Arc::clone(&*t)).map_err(|_| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "marker table lock poisoned".to_string(),
            )
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(dir) = args.data_dir {
        config.data.dir = dir;
    }
    if let Some(listen) = args.listen {
        config.server.listen = listen;
    }
    if let Some(threshold) = args.threshold {
        config.report.precision_threshold_m = threshold;
    }
    config.validate()?;

    info!("Milepost Query Server");
    info!("Loading markers from {}", config.data.dir.display());

    let mut cache = MarkerCache::new();
    let report = load_markers(&config.data.dir, &mut cache).with_context(|| {
        format!(
            "No mileage markers available. Put KML files into {} and restart.",
            config.data.dir.display()
        )
    })?;

    if !report.warnings.is_empty() {
        warn!(
            "{} KML files could not be read and are excluded",
            report.warnings.len()
        );
    }
    info!(
        "Serving {} markers from {} files",
        report.table.len(),
        report.table.sources().len()
    );

    let state = Arc::new(AppState::new(&config, report, cache)?);

    // Build router
    let app = Router::new()
        .route("/", get(form_handler))
        .route("/lookup", get(lookup_form_handler))
        .route("/health", get(health_handler))
        .route("/v1/nearest", get(nearest_handler))
        .route("/v1/nearest/dms", get(nearest_dms_handler))
        .route("/v1/reload", post(reload_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("Starting server on {}", config.server.listen);

    let listener = tokio::net::TcpListener::bind(&config.server.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Empty form
async fn form_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FormParams>,
) -> Result<Html<String>, (StatusCode, String)> {
    let table = state.table()?;
    let form = FormState::from_params(&params, &state.defaults);

    render(LookupPage::new(&form, &table, None, Outcome::Empty))
}

/// Form submission: resolve input, look up, render the result panel
async fn lookup_form_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FormParams>,
) -> Result<Html<String>, (StatusCode, String)> {
    let table = state.table()?;
    let form = FormState::from_params(&params, &state.defaults);

    let (query, report, problem) = match form.resolve() {
        Ok(query) => match table.nearest(query) {
            Ok(nearest) => (
                Some(query),
                Some(LookupReport::build(query, &nearest, &state.options)),
                None,
            ),
            Err(e) => (Some(query), None, Some(e.to_string())),
        },
        Err(message) => (None, None, Some(message)),
    };

    let outcome = match (&report, &problem) {
        (Some(report), _) => Outcome::Result(report),
        (None, Some(message)) => Outcome::Error(message),
        (None, None) => Outcome::Empty,
    };

    render(LookupPage::new(&form, &table, query, outcome))
}

fn render(page: LookupPage<'_>) -> Result<Html<String>, (StatusCode, String)> {
    page.render().map(Html).map_err(|e| {
        error!("Template rendering failed: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    markers: usize,
    sources: Vec<String>,
    loaded_at: DateTime<Utc>,
}

/// Health check endpoint
async fn health_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, (StatusCode, String)> {
    let table = state.table()?;

    Ok(Json(HealthResponse {
        status: "ok",
        markers: table.len(),
        sources: table.sources().to_vec(),
        loaded_at: table.loaded_at(),
    }))
}

#[derive(Deserialize)]
struct NearestParams {
    lat: f64,
    lon: f64,
}

#[derive(Deserialize)]
struct DmsParams {
    /// e.g. `25°2'53"N`
    lat: String,
    /// e.g. `121°35'4"E`
    lon: String,
}

/// Nearest marker for a decimal-degree coordinate
async fn nearest_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NearestParams>,
) -> Result<Json<LookupReport>, (StatusCode, String)> {
    let query = GeoPoint::checked(params.lat, params.lon)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    lookup(&state, query).map(Json)
}

/// Nearest marker for a DMS coordinate
async fn nearest_dms_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DmsParams>,
) -> Result<Json<LookupReport>, (StatusCode, String)> {
    let lat = Dms::parse(Axis::Latitude, &params.lat)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let lon = Dms::parse(Axis::Longitude, &params.lon)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let query = GeoPoint::checked(lat.to_decimal(), lon.to_decimal())
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    lookup(&state, query).map(Json)
}

fn lookup(state: &AppState, query: GeoPoint) -> Result<LookupReport, (StatusCode, String)> {
    let table = state.table()?;
    let nearest = table.nearest(query).map_err(|e| {
        error!("Lookup failed: {}", e);
        (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
    })?;

    Ok(LookupReport::build(query, &nearest, &state.options))
}

#[derive(Debug, Serialize)]
struct ReloadResponse {
    markers: usize,
    sources: usize,
    cache_hits: usize,
    warnings: Vec<FileWarning>,
}

impl AppState {
    /// Re-scan the data directory; unchanged files come from the parse cache.
    ///
    /// The served table is only replaced when the new scan produced markers.
    fn reload(&self) -> Result<ReloadResponse, (StatusCode, String)> {
        let report = {
            let mut cache = self.cache.lock().map_err(|_| {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "marker cache lock poisoned".to_string(),
                )
            })?;
            load_markers(&self.data_dir, &mut cache).map_err(|e| {
                error!("Reload failed: {}", e);
                (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
            })?
        };

        let response = ReloadResponse {
            markers: report.table.len(),
            sources: report.table.sources().len(),
            cache_hits: report.cache_hits,
            warnings: report.warnings,
        };

        let mut table = self.table.write().map_err(|_| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "marker table lock poisoned".to_string(),
            )
        })?;
        *table = Arc::new(report.table);

        info!(
            "Reloaded {} markers from {} files ({} cached)",
            response.markers, response.sources, response.cache_hits
        );

        Ok(response)
    }
}

async fn reload_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReloadResponse>, (StatusCode, String)> {
    let worker = Arc::clone(&state);
    tokio::task::spawn_blocking(move || worker.reload())
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map(Json)
}
