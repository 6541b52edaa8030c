use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use wp_api_types::{Account, FeedResponse, HasWavedResponse, TotalWavesResponse};
use wp_contract_client::{ContractGateway, GatewayError};
use wp_contract_http::HttpContractGateway;
use wp_feed_cache::WaveFeedCache;

#[derive(Debug, Serialize)]
struct HealthResponse {
    service: &'static str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct VersionResponse {
    service: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Deserialize)]
struct HasWavedQuery {
    account: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

// Read-only mirror of the wave feed. No signer is ever configured here:
// this is the degraded path that keeps the feed reachable when no wallet
// exists on the client.
#[derive(Clone)]
struct AppState {
    gateway: Arc<dyn ContractGateway>,
    feed: Arc<WaveFeedCache>,
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/feed", get(feed))
        .route("/waves/total", get(waves_total))
        .route("/waves/has-waved", get(waves_has_waved))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let state = AppState {
        gateway: Arc::new(HttpContractGateway::default()),
        feed: Arc::new(WaveFeedCache::new()),
    };

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], 8080));
    info!("portal-service listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        service: "portal-service",
        status: "ok",
    })
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        service: "portal-service",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn feed(State(state): State<AppState>) -> ApiResult<FeedResponse> {
    let snapshot = state
        .feed
        .refresh(state.gateway.as_ref())
        .await
        .map_err(gateway_error)?;

    Ok(Json(FeedResponse {
        total: snapshot.total,
        waves: snapshot.waves,
    }))
}

async fn waves_total(State(state): State<AppState>) -> ApiResult<TotalWavesResponse> {
    let total = state.gateway.total_waves().await.map_err(gateway_error)?;
    Ok(Json(TotalWavesResponse { total }))
}

async fn waves_has_waved(
    State(state): State<AppState>,
    Query(query): Query<HasWavedQuery>,
) -> ApiResult<HasWavedResponse> {
    if query.account.trim().is_empty() {
        return Err(bad_request("account is required"));
    }

    let has_waved = state
        .gateway
        .has_waved(&Account(query.account.clone()))
        .await
        .map_err(gateway_error)?;

    Ok(Json(HasWavedResponse {
        account: query.account,
        has_waved,
    }))
}

fn bad_request(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_owned(),
        }),
    )
}

fn gateway_error(err: GatewayError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &err {
        GatewayError::Unavailable(_) => StatusCode::BAD_GATEWAY,
        GatewayError::Rejected(_) => StatusCode::BAD_REQUEST,
        GatewayError::NoSigner | GatewayError::Reverted(_) | GatewayError::Unknown(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}
