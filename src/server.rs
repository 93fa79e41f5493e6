use crate::config::AppConfig;
use crate::data;
use crate::error::ApiError;
use crate::hit::HitTester;
use crate::info::{self, EvalClient, InfoSource, LocalEval};
use crate::tiles::{self, TileUrls};
use crate::types::ClickPoint;
use crate::urban::{self, EvalResponse, TigerWeb, UrbanLookup};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path as FsPath;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};

const LOAD_FAILED: &str = "Failed to load boundary data.";

pub struct AppState {
    // None when the boundary documents could not be loaded.
    pub hits: Option<HitTester>,
    pub view: Option<ViewResponse>,
    pub tiles: TileUrls,
    pub max_zoom: u8,
    pub urban: Arc<dyn UrbanLookup>,
    pub info: Arc<dyn InfoSource>,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        hits: Option<HitTester>,
        urban: Arc<dyn UrbanLookup>,
        info: Arc<dyn InfoSource>,
    ) -> Self {
        let view = hits
            .as_ref()
            .and_then(|h| data::view_bounds(&h.boundaries().states, config.boundaries.bounds_padding))
            .map(|rect| ViewResponse {
                bounds: [[rect.min().y, rect.min().x], [rect.max().y, rect.max().x]],
                min_zoom: config.tiles.min_zoom,
                max_zoom: config.tiles.max_zoom,
            });

        Self {
            hits,
            view,
            tiles: TileUrls::new(&config.tiles),
            max_zoom: config.tiles.max_zoom.min(tiles::MAX_ZOOM),
            urban,
            info,
        }
    }

    fn hits(&self) -> Result<&HitTester, ApiError> {
        self.hits
            .as_ref()
            .ok_or_else(|| ApiError::Unavailable(LOAD_FAILED.to_string()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewResponse {
    /// `[[south, west], [north, east]]`
    pub bounds: [[f64; 2]; 2],
    pub min_zoom: u8,
    pub max_zoom: u8,
}

// Coordinates arrive as strings so bad input gets the JSON error body
// instead of axum's plain-text rejection.
#[derive(Deserialize)]
pub struct EvalParams {
    lat: Option<String>,
    lng: Option<String>,
    fips: Option<String>,
}

#[derive(Deserialize)]
pub struct ClickParams {
    lat: Option<String>,
    lng: Option<String>,
}

#[derive(Serialize)]
pub struct ClickResponse {
    fips: u32,
    state: &'static str,
    lat: f64,
    lng: f64,
    popup: PopupBody,
}

#[derive(Serialize)]
pub struct PopupBody {
    title: String,
    lines: Vec<(String, String)>,
    html: String,
}

pub async fn start_server(config: AppConfig) -> Result<()> {
    let hits = match data::load_boundaries(&config.boundaries).await {
        Ok(boundaries) => {
            info!("Building spatial index for {} states...", boundaries.states.len());
            Some(HitTester::new(boundaries))
        }
        Err(e) => {
            error!("{} {:#}", LOAD_FAILED, e);
            None
        }
    };

    let urban: Arc<dyn UrbanLookup> = Arc::new(TigerWeb::new(&config.urban)?);
    let info: Arc<dyn InfoSource> = match &config.info.endpoint {
        Some(endpoint) => {
            info!("Forwarding info requests to {}", endpoint);
            Arc::new(EvalClient::new(endpoint, config.info.timeout_secs)?)
        }
        None => Arc::new(LocalEval::new(urban.clone())),
    };

    let state = Arc::new(AppState::new(&config, hits, urban, info));
    let app = router(state, &config.server.static_dir);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(state: Arc<AppState>, static_dir: &FsPath) -> Router {
    Router::new()
        .route("/eval", get(eval_handler))
        .route("/api/click", get(click_handler))
        .route("/api/boundaries", get(boundaries_handler))
        .route("/api/view", get(view_handler))
        .route("/tiles/:z/:x/:y", get(tile_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn coordinate(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn click_point(lat: Option<&str>, lng: Option<&str>) -> Result<ClickPoint, ApiError> {
    match (coordinate(lat), coordinate(lng)) {
        (Some(lat), Some(lng)) => Ok(ClickPoint::new(lng, lat)),
        _ => Err(ApiError::BadRequest("missing lat/lng".to_string())),
    }
}

async fn eval_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EvalParams>,
) -> Result<Json<EvalResponse>, ApiError> {
    let click = click_point(params.lat.as_deref(), params.lng.as_deref())?;
    debug!(fips = ?params.fips, "Evaluating {}, {}", click.lat, click.lng);

    let query = state
        .urban
        .query(click.lat, click.lng)
        .await
        .map_err(|e| ApiError::Upstream(format!("{:#}", e)))?;

    let response = urban::evaluate(click.lat, click.lng, &query);
    debug!("{}", serde_json::to_string(&response).unwrap_or_default());
    Ok(Json(response))
}

async fn click_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ClickParams>,
) -> Result<Json<Option<ClickResponse>>, ApiError> {
    let click = click_point(params.lat.as_deref(), params.lng.as_deref())?;
    let hits = state.hits()?;

    let Some(feature) = hits.locate(click) else {
        return Ok(Json(None));
    };

    let Some(popup) = info::open_popup(state.info.as_ref(), feature, click).await else {
        return Ok(Json(None));
    };

    let request = info::EvalRequest::new(click, feature.fips);
    Ok(Json(Some(ClickResponse {
        fips: feature.fips,
        state: feature.name,
        lat: request.lat,
        lng: request.lng,
        popup: PopupBody {
            html: popup.to_html(),
            title: popup.title,
            lines: popup.lines,
        },
    })))
}

async fn boundaries_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<geojson::FeatureCollection>, ApiError> {
    let hits = state.hits()?;
    Ok(Json(data::to_feature_collection(&hits.boundaries().states)))
}

async fn view_handler(State(state): State<Arc<AppState>>) -> Result<Json<ViewResponse>, ApiError> {
    state
        .view
        .clone()
        .map(Json)
        .ok_or_else(|| ApiError::Unavailable(LOAD_FAILED.to_string()))
}

async fn tile_handler(
    State(state): State<Arc<AppState>>,
    Path((z, x, y)): Path<(String, String, String)>,
) -> Result<Response, ApiError> {
    let not_found = || ApiError::NotFound(format!("No tile {}/{}/{}", z, x, y));

    let zoom: u8 = z.parse().map_err(|_| not_found())?;
    if zoom > state.max_zoom {
        return Err(not_found());
    }
    let column: i64 = x.parse().map_err(|_| not_found())?;
    let row: i64 = y.trim_end_matches(".png").parse().map_err(|_| not_found())?;
    if !(0..tiles::tile_count(zoom)).contains(&row) {
        return Err(not_found());
    }

    let url = state.tiles.url(zoom, column, row);
    Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
}
