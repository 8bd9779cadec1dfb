use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use axum::extract::{Path, Query, RawQuery, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;
use vendor_directory_core::{
    render, review_queue, vendor_profile, CardListing, Catalog, DirectoryError, QueryOptions,
    RequestParams, ReviewItem, VendorProfile, FRESHNESS_WINDOW_DAYS,
};

const SERVICE_CONTRACT_VERSION: &str = "service.v1";
const LOG_ENV: &str = "VENDOR_DIRECTORY_LOG";

#[derive(Debug, Clone)]
struct ServiceState {
    catalog: Arc<Catalog>,
    fixed_now: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceEnvelope<T>
where
    T: Serialize,
{
    service_contract_version: &'static str,
    data: T,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceError {
    #[serde(skip)]
    status: StatusCode,
    service_contract_version: &'static str,
    error: String,
}

#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    status: &'static str,
    records: usize,
}

#[derive(Debug, Clone, Serialize)]
struct CatalogSummary {
    localities: Vec<String>,
    records: usize,
}

#[derive(Debug, Clone, Serialize)]
struct ReviewResponse {
    window_days: i64,
    stale: Vec<ReviewItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CardsQuery {
    max_cards: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ProfileQuery {
    from: Option<String>,
}

#[derive(Debug, Parser)]
#[command(name = "vendor-directory-service")]
#[command(about = "Local HTTP service for the vendor directory")]
struct Args {
    /// Catalog file (.json, .yaml or .yml). Defaults to the bundled catalog.
    #[arg(long)]
    catalog: Option<PathBuf>,
    #[arg(long, default_value = "127.0.0.1:4020")]
    bind: SocketAddr,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

impl ServiceState {
    fn error(status: StatusCode, message: impl Into<String>) -> ServiceError {
        ServiceError {
            status,
            service_contract_version: SERVICE_CONTRACT_VERSION,
            error: message.into(),
        }
    }

    /// One sample per request; every card in a response shares it.
    fn now(&self) -> OffsetDateTime {
        self.fixed_now.unwrap_or_else(OffsetDateTime::now_utc)
    }
}

fn envelope<T>(data: T) -> ServiceEnvelope<T>
where
    T: Serialize,
{
    ServiceEnvelope { service_contract_version: SERVICE_CONTRACT_VERSION, data }
}

fn app(state: ServiceState) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/cards", get(cards))
        .route("/v1/vendors/:id", get(vendor))
        .route("/v1/catalog", get(catalog_summary))
        .route("/v1/catalog/review", get(catalog_review))
        .with_state(state)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();
    let catalog = match &args.catalog {
        Some(path) => Catalog::load(path)
            .with_context(|| format!("failed to load catalog {}", path.display()))?,
        None => Catalog::builtin().map_err(|err| anyhow!("bundled catalog is invalid: {err}"))?,
    };
    let state = ServiceState { catalog: Arc::new(catalog), fixed_now: None };
    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    tracing::info!(bind = %args.bind, "vendor directory service listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

async fn health(State(state): State<ServiceState>) -> Json<ServiceEnvelope<HealthResponse>> {
    Json(envelope(HealthResponse { status: "ok", records: state.catalog.len() }))
}

async fn cards(
    State(state): State<ServiceState>,
    RawQuery(raw_query): RawQuery,
    Query(query): Query<CardsQuery>,
) -> Result<Json<ServiceEnvelope<CardListing>>, ServiceError> {
    let max_cards = match query.max_cards.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<usize>().map_err(|err| {
            ServiceState::error(StatusCode::BAD_REQUEST, format!("invalid max_cards `{raw}`: {err}"))
        })?),
    };
    let options = QueryOptions { max_cards, ..QueryOptions::default() };
    let params = RequestParams::from_query_string(raw_query.as_deref().unwrap_or_default());
    let listing = render(&state.catalog, &options, &params, state.now());
    Ok(Json(envelope(listing)))
}

async fn vendor(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<ServiceEnvelope<VendorProfile>>, ServiceError> {
    let from = query.from.unwrap_or_default();
    let profile = vendor_profile(&state.catalog, &id, &from, state.now()).map_err(|err| {
        let status = match err {
            DirectoryError::UnknownVendor(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        };
        ServiceState::error(status, err.to_string())
    })?;
    Ok(Json(envelope(profile)))
}

async fn catalog_summary(State(state): State<ServiceState>) -> Json<ServiceEnvelope<CatalogSummary>> {
    Json(envelope(CatalogSummary {
        localities: state.catalog.localities().map(ToString::to_string).collect(),
        records: state.catalog.len(),
    }))
}

async fn catalog_review(State(state): State<ServiceState>) -> Json<ServiceEnvelope<ReviewResponse>> {
    Json(envelope(ReviewResponse {
        window_days: FRESHNESS_WINDOW_DAYS,
        stale: review_queue(&state.catalog, state.now()),
    }))
}
