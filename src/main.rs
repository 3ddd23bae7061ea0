use axum::extract::{Path as AxumPath, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use serde_json::json;
use sgz_ingest::charts::{build_dashboard, DashboardCharts, WorkOrderFilter};
use sgz_ingest::config::{AppConfig, IngestSettings};
use sgz_ingest::domain::UploadBatch;
use sgz_ingest::error::AppError;
use sgz_ingest::ingest::engine::IngestionReport;
use sgz_ingest::ingest::progress::{LogNotifier, NullNotifier};
use sgz_ingest::ingest::IngestionService;
use sgz_ingest::store::{MemoryStore, WorkOrderStore};
use sgz_ingest::telemetry;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
    store: Arc<MemoryStore>,
    ingest: IngestSettings,
}

#[derive(Parser, Debug)]
#[command(
    name = "SGZ Ingestion Service",
    about = "Ingest municipal service-order spreadsheets and build dashboard aggregates",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Ingest a spreadsheet export and print the run report
    Ingest(IngestArgs),
    /// Ingest a spreadsheet export and print dashboard chart series
    Dashboard(DashboardArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct IngestArgs {
    /// Spreadsheet export to ingest (.xlsx, .xls, or CSV)
    #[arg(long)]
    file: PathBuf,
    /// Override the configured upsert chunk size
    #[arg(long)]
    chunk_size: Option<usize>,
    /// Uploader recorded on the batch row
    #[arg(long)]
    uploaded_by: Option<String>,
}

#[derive(Args, Debug)]
struct DashboardArgs {
    /// Spreadsheet export to aggregate (.xlsx, .xls, or CSV)
    #[arg(long)]
    file: PathBuf,
    /// How many companies the completed-order ranking keeps
    #[arg(long, default_value_t = 5)]
    top: usize,
    /// Keep only these status codes (repeatable)
    #[arg(long = "status")]
    statuses: Vec<String>,
    /// Keep only these districts (repeatable)
    #[arg(long = "district")]
    districts: Vec<String>,
    /// Keep only orders opened on or after this date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    from: Option<NaiveDate>,
    /// Keep only orders opened on or before this date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    to: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct UploadRequest {
    #[serde(default = "default_filename")]
    filename: String,
    /// Inline CSV content of the export.
    csv: String,
    #[serde(default)]
    uploaded_by: Option<String>,
}

fn default_filename() -> String {
    "upload.csv".to_string()
}

#[derive(Debug, Deserialize)]
struct DashboardRequest {
    #[serde(default)]
    filter: WorkOrderFilter,
    #[serde(default = "default_top_companies")]
    top_companies: usize,
}

fn default_top_companies() -> usize {
    5
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Ingest(args) => run_ingest(args),
        Command::Dashboard(args) => run_dashboard(args),
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
        store: Arc::new(MemoryStore::new()),
        ingest: config.ingest,
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route(
            "/api/v1/uploads",
            post(upload_endpoint).get(list_uploads_endpoint),
        )
        .route("/api/v1/uploads/:id", delete(delete_upload_endpoint))
        .route("/api/v1/dashboard", post(dashboard_endpoint))
        .layer(prometheus_layer)
        .with_state(state);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "sgz ingestion service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_ingest(args: IngestArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(chunk_size) = args.chunk_size {
        config.ingest.chunk_size = chunk_size.max(1);
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let store = MemoryStore::new();
    let service = IngestionService::new(&store, &LogNotifier, config.ingest);
    let report = service.ingest_path(&args.file, args.uploaded_by)?;

    render_ingestion_report(&report);
    Ok(())
}

fn run_dashboard(args: DashboardArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;

    let store = MemoryStore::new();
    let service = IngestionService::new(&store, &NullNotifier, config.ingest);
    let report = service.ingest_path(&args.file, None)?;

    let filter = WorkOrderFilter {
        statuses: (!args.statuses.is_empty()).then(|| args.statuses.clone()),
        districts: (!args.districts.is_empty()).then(|| args.districts.clone()),
        opened_from: args.from,
        opened_to: args.to,
        ..WorkOrderFilter::default()
    };

    let orders = store.orders()?;
    let charts = build_dashboard(&orders, &filter, args.top);

    render_ingestion_report(&report);
    render_dashboard(&charts);
    Ok(())
}

fn render_ingestion_report(report: &IngestionReport) {
    println!("Ingestion run for batch {}", report.batch_id);
    println!(
        "Rows: {} processed, {} accepted ({:.1}s)",
        report.qty_processed,
        report.qty_valid,
        report.elapsed.as_secs_f64()
    );

    if report.failed_chunks.is_empty() {
        println!("Failed chunks: none");
    } else {
        println!("Failed chunks:");
        for failure in &report.failed_chunks {
            println!(
                "- rows {}..{}: {}",
                failure.offset,
                failure.offset + failure.len,
                failure.error
            );
        }
    }

    if !report.metadata_persisted {
        println!("Warning: final batch counters could not be written");
    }
}

fn render_dashboard(charts: &DashboardCharts) {
    let sections = [
        ("Orders by status", &charts.by_status),
        ("Orders by technical area", &charts.by_technical_area),
        ("Top companies (completed orders)", &charts.top_companies),
        ("Orders by district", &charts.by_district),
        ("Average days open by status", &charts.avg_days_open_by_status),
        ("Orders opened by month", &charts.opened_by_month),
    ];

    for (title, series) in sections {
        if series.points.is_empty() {
            println!("\n{title}: no data");
            continue;
        }
        println!("\n{title}");
        for point in &series.points {
            println!("- {}: {:.1}", point.label, point.value);
        }
    }
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

async fn upload_endpoint(
    State(state): State<AppState>,
    Json(payload): Json<UploadRequest>,
) -> Result<Json<IngestionReport>, AppError> {
    let service = IngestionService::new(state.store.as_ref(), &LogNotifier, state.ingest);
    let report = service.ingest_csv(
        Cursor::new(payload.csv.into_bytes()),
        payload.filename,
        payload.uploaded_by,
    )?;
    Ok(Json(report))
}

async fn list_uploads_endpoint(
    State(state): State<AppState>,
) -> Result<Json<Vec<UploadBatch>>, AppError> {
    Ok(Json(state.store.batches()?))
}

async fn delete_upload_endpoint(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<u64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let removed = state.store.delete_batch(id)?;
    Ok(Json(json!({ "deleted_batch": id, "removed_orders": removed })))
}

async fn dashboard_endpoint(
    State(state): State<AppState>,
    Json(payload): Json<DashboardRequest>,
) -> Result<Json<DashboardCharts>, AppError> {
    let orders = state.store.orders()?;
    let charts = build_dashboard(&orders, &payload.filter, payload.top_companies);
    Ok(Json(charts))
}
