use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::api::stocks::{create_stock, delete_stock, get_stock, update_stock};
use crate::auth::{AuthorizationPolicy, Identity, IdentityVerifier, MaybeIdentity, Operator};
use crate::calculator::{derive, SectorRules};
use crate::config::{Config, EXPORT_CSV_FILE_NAME, EXPORT_FILE_NAME};
use crate::db::StockRepo;
use crate::error::{AppError, Result};
use crate::listing::{build_tables, export, ListingState, SectorFilter, SectorTable, SortKey, SortOrder};
use crate::price::PriceLookup;
use crate::types::{DerivedFields, PriceQuote, Sector, StockRecord};

#[derive(Clone)]
pub struct AppState {
    pub repo: StockRepo,
    pub prices: PriceLookup,
    pub identity: IdentityVerifier,
    pub policy: Arc<AuthorizationPolicy>,
    pub rules: Arc<SectorRules>,
    pub strict_validation: bool,
    pub health: Arc<HealthState>,
    pub latency: Arc<LatencyStats>,
}

impl AppState {
    /// Wire the adapters from configuration around an already-migrated store.
    pub fn new(cfg: &Config, repo: StockRepo) -> Result<Self> {
        let latency = Arc::new(LatencyStats::new()?);
        Ok(Self {
            repo,
            prices: PriceLookup::new(cfg, Arc::clone(&latency))?,
            identity: IdentityVerifier::new(cfg)?,
            policy: Arc::new(AuthorizationPolicy::new(cfg.allowed_operators.iter().cloned())),
            rules: Arc::new(cfg.sector_rules.clone()),
            strict_validation: cfg.strict_validation,
            health: Arc::new(HealthState::new()),
            latency,
        })
    }
}

pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(get_listing))
        .route("/entry", get(get_entry_form))
        .route("/edit", get(get_edit_form))
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .route("/api/session", get(get_session))
        .route("/api/sectors", get(get_sectors))
        .route("/api/derive", post(post_derive))
        .route("/api/stocks", get(get_listing).post(create_stock))
        .route("/api/stocks/export.xlsx", get(get_export_xlsx))
        .route("/api/stocks/export.csv", get(get_export_csv))
        .route(
            "/api/stocks/:id",
            get(get_stock).put(update_stock).delete(delete_stock),
        )
        .route("/api/prices/:symbol", get(get_price))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Any origin when none are configured.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}

// ---------------------------------------------------------------------------
// Query param structs
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub sort: Option<SortKey>,
    pub order: Option<SortOrder>,
    pub sector: Option<String>,
    /// Fetch live prices for the LTP column (default true).
    pub prices: Option<bool>,
}

impl ListingQuery {
    fn state(&self) -> Result<ListingState> {
        let filter = match &self.sector {
            Some(raw) => SectorFilter::parse(raw).map_err(AppError::BadRequest)?,
            None => SectorFilter::All,
        };
        Ok(ListingState {
            sort: self.sort.map(|k| (k, self.order.unwrap_or_default())),
            filter,
        })
    }

    fn with_prices(&self) -> bool {
        self.prices.unwrap_or(true)
    }
}

#[derive(Debug, Deserialize)]
pub struct DeriveRequest {
    pub sector: Sector,
    #[serde(default)]
    pub listed_date: Option<NaiveDate>,
    pub total_listed_shares: i64,
    pub promoter_share: i64,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub sort: Option<SortKey>,
    pub order: Option<SortOrder>,
    pub sector: String,
    /// Sectors present in the data, in first-appearance order; the filter options.
    pub sectors: Vec<Sector>,
    /// Every record in store order, for clients that sort and filter locally.
    pub stocks: Vec<StockRecord>,
    /// Live quotes keyed by stock name. Empty when prices were not requested.
    pub prices: HashMap<String, PriceQuote>,
    pub groups: Vec<SectorTable>,
}

#[derive(Debug, Serialize)]
pub struct SectorInfo {
    pub sector: Sector,
    pub requires_listed_date: bool,
}

#[derive(Debug, Serialize)]
pub struct FormSchema {
    pub form: &'static str,
    pub operator: String,
    pub sectors: Vec<SectorInfo>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub signed_in: bool,
    pub operator: bool,
    pub identity: Option<Identity>,
}

#[derive(Debug, Serialize)]
pub struct DeriveResponse {
    #[serde(flatten)]
    pub derived: DerivedFields,
    pub promoter_public_display: String,
    pub lock_in_display: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PriceResponse {
    pub symbol: String,
    pub quote: PriceQuote,
    pub display: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store_reachable: bool,
    pub stocks: Option<i64>,
    pub store_errors: u64,
    pub price_placeholders: u64,
    pub last_listing_at_ms: Option<u64>,
    pub operators_configured: usize,
}

#[derive(Debug, Serialize)]
pub struct LatencyResponse {
    pub sample_count: u64,
    pub p50_ms: Option<u64>,
    pub p95_ms: Option<u64>,
    pub p99_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Listing and export
// ---------------------------------------------------------------------------

async fn get_listing(
    State(state): State<AppState>,
    Query(params): Query<ListingQuery>,
) -> Result<Json<ListingResponse>> {
    let view = params.state()?;
    let stocks = load_all(&state).await?;
    let prices = fetch_prices(&state, &stocks, params.with_prices()).await;

    let groups = build_tables(&view.apply(&stocks, &state.rules), &prices);
    let mut sectors: Vec<Sector> = Vec::new();
    for s in &stocks {
        if !sectors.contains(&s.sector) {
            sectors.push(s.sector);
        }
    }

    state.health.set_last_listing_at_ms(crate::db::repo::now_ms() as u64);
    Ok(Json(ListingResponse {
        sort: view.sort.map(|(k, _)| k),
        order: view.sort.map(|(_, o)| o),
        sector: view.filter.label().to_string(),
        sectors,
        stocks,
        prices,
        groups,
    }))
}

async fn get_export_xlsx(
    State(state): State<AppState>,
    Query(params): Query<ListingQuery>,
) -> Result<Response> {
    let tables = export_tables(&state, &params).await?;
    let bytes = export::to_xlsx_bytes(&tables)?;
    Ok(attachment(
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        EXPORT_FILE_NAME,
        bytes,
    ))
}

async fn get_export_csv(
    State(state): State<AppState>,
    Query(params): Query<ListingQuery>,
) -> Result<Response> {
    let tables = export_tables(&state, &params).await?;
    let bytes = export::to_csv_bytes(&tables)?;
    Ok(attachment("text/csv; charset=utf-8", EXPORT_CSV_FILE_NAME, bytes))
}

/// Exports cover the sorted set; the sector filter is ignored.
async fn export_tables(state: &AppState, params: &ListingQuery) -> Result<Vec<SectorTable>> {
    let mut view = params.state()?;
    view.set_filter(SectorFilter::All);
    let stocks = load_all(state).await?;
    let prices = fetch_prices(state, &stocks, params.with_prices()).await;
    Ok(build_tables(&view.apply(&stocks, &state.rules), &prices))
}

fn attachment(content_type: &'static str, file_name: &str, bytes: Vec<u8>) -> Response {
    let disposition = format!("attachment; filename=\"{file_name}\"");
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

async fn load_all(state: &AppState) -> Result<Vec<StockRecord>> {
    state.repo.list().await.map_err(|e| {
        error!("listing load failed: {e}");
        state.health.inc_store_errors();
        AppError::Failed("Error fetching data")
    })
}

async fn fetch_prices(
    state: &AppState,
    stocks: &[StockRecord],
    enabled: bool,
) -> HashMap<String, PriceQuote> {
    if !enabled || stocks.is_empty() {
        return HashMap::new();
    }
    let prices = state.prices.lookup_all(stocks.iter().map(|s| s.name.as_str())).await;
    let placeholders = prices
        .values()
        .filter(|q| !matches!(q, PriceQuote::Price(_)))
        .count();
    if placeholders > 0 {
        debug!(placeholders, total = prices.len(), "listing served with price placeholders");
        state.health.add_price_placeholders(placeholders as u64);
    }
    prices
}

async fn get_price(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Json<PriceResponse> {
    let quote = state.prices.lookup(&symbol).await;
    if !matches!(quote, PriceQuote::Price(_)) {
        state.health.add_price_placeholders(1);
    }
    Json(PriceResponse {
        display: quote.display().to_string(),
        symbol,
        quote,
    })
}

// ---------------------------------------------------------------------------
// Forms, session, sectors
// ---------------------------------------------------------------------------

async fn get_entry_form(
    State(state): State<AppState>,
    operator: std::result::Result<Operator, AppError>,
) -> Response {
    form_or_redirect(&state, "entry", operator)
}

async fn get_edit_form(
    State(state): State<AppState>,
    operator: std::result::Result<Operator, AppError>,
) -> Response {
    form_or_redirect(&state, "edit", operator)
}

/// Non-operators are sent back to the public listing.
fn form_or_redirect(
    state: &AppState,
    form: &'static str,
    operator: std::result::Result<Operator, AppError>,
) -> Response {
    match operator {
        Ok(Operator(identity)) => Json(FormSchema {
            form,
            operator: identity.email,
            sectors: sector_infos(&state.rules),
        })
        .into_response(),
        Err(e) => {
            debug!(form, "redirecting non-operator: {e}");
            Redirect::to("/").into_response()
        }
    }
}

async fn get_session(
    State(state): State<AppState>,
    MaybeIdentity(identity): MaybeIdentity,
) -> Json<SessionResponse> {
    let operator = identity
        .as_ref()
        .is_some_and(|id| state.policy.permits(&id.email));
    Json(SessionResponse {
        signed_in: identity.is_some(),
        operator,
        identity,
    })
}

async fn get_sectors(State(state): State<AppState>) -> Json<Vec<SectorInfo>> {
    Json(sector_infos(&state.rules))
}

fn sector_infos(rules: &SectorRules) -> Vec<SectorInfo> {
    Sector::ALL
        .iter()
        .map(|&sector| SectorInfo {
            sector,
            requires_listed_date: rules.requires_listed_date(sector),
        })
        .collect()
}

async fn post_derive(
    State(state): State<AppState>,
    Json(req): Json<DeriveRequest>,
) -> Json<DeriveResponse> {
    let derived = derive(
        req.total_listed_shares,
        req.promoter_share,
        req.sector,
        req.listed_date,
        &state.rules,
    );
    Json(DeriveResponse {
        promoter_public_display: derived.promoter_public_percent.to_string(),
        lock_in_display: derived
            .lock_in_period
            .map(crate::listing::format::format_locale_date),
        derived,
    })
}

// ---------------------------------------------------------------------------
// Health and stats
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stocks = state.repo.count().await.ok();
    let last = state.health.last_listing_at_ms();
    Json(HealthResponse {
        status: if stocks.is_some() { "ok" } else { "degraded" },
        store_reachable: stocks.is_some(),
        stocks,
        store_errors: state.health.store_errors(),
        price_placeholders: state.health.price_placeholders(),
        last_listing_at_ms: (last > 0).then_some(last),
        operators_configured: state.policy.len(),
    })
}

async fn get_stats_latency(State(state): State<AppState>) -> Json<LatencyResponse> {
    let (p50_ms, p95_ms, p99_ms) = state.latency.percentiles();
    Json(LatencyResponse {
        sample_count: state.latency.len(),
        p50_ms,
        p95_ms,
        p99_ms,
    })
}
