use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use super::{AppState, WalletAddress};
use crate::community::FeedQuery;
use crate::error::Error;
use crate::models::*;

// ============================================================
// Error Handling
// ============================================================

type ApiError = (StatusCode, String);

/// Map a domain error onto a status code. Persistence failures are logged in
/// full but only a generic message goes back to the client.
fn api_error(e: Error) -> ApiError {
    match e {
        Error::Validation(_) => {
            tracing::warn!("Validation error: {}", e);
            (StatusCode::BAD_REQUEST, e.to_string())
        }
        Error::NotFound { .. } => (StatusCode::NOT_FOUND, e.to_string()),
        Error::InvalidTransition { .. } => (StatusCode::CONFLICT, e.to_string()),
        Error::Persistence(_) => {
            tracing::error!("Internal error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Identity
// ============================================================

/// First call for a wallet creates its user; later calls return the same row.
pub async fn authenticate(
    State(state): State<AppState>,
    wallet: WalletAddress,
) -> Result<Json<User>, ApiError> {
    let store = state.open_store(&wallet).await.map_err(api_error)?;
    Ok(Json(store.user().clone()))
}

pub async fn get_me(
    State(state): State<AppState>,
    wallet: WalletAddress,
) -> Result<Json<User>, ApiError> {
    authenticate(State(state), wallet).await
}

// ============================================================
// Manifestations
// ============================================================

#[derive(Debug, Deserialize)]
pub struct ListManifestationsQuery {
    pub state: Option<ManifestationState>,
}

pub async fn list_manifestations(
    State(state): State<AppState>,
    wallet: WalletAddress,
    Query(query): Query<ListManifestationsQuery>,
) -> Result<Json<Vec<Manifestation>>, ApiError> {
    let store = state.open_store(&wallet).await.map_err(api_error)?;
    let manifestations = match query.state {
        Some(s) => store.list_by_state(s).into_iter().cloned().collect(),
        None => store.list().to_vec(),
    };
    Ok(Json(manifestations))
}

pub async fn create_manifestation(
    State(state): State<AppState>,
    wallet: WalletAddress,
    Json(input): Json<CreateManifestationInput>,
) -> Result<(StatusCode, Json<Manifestation>), ApiError> {
    let mut store = state.open_store(&wallet).await.map_err(api_error)?;
    store
        .create(input)
        .map(|m| (StatusCode::CREATED, Json(m)))
        .map_err(api_error)
}

pub async fn get_manifestation(
    State(state): State<AppState>,
    wallet: WalletAddress,
    Path(id): Path<Uuid>,
) -> Result<Json<Manifestation>, ApiError> {
    let store = state.open_store(&wallet).await.map_err(api_error)?;
    store.get(id).cloned().map(Json).map_err(api_error)
}

pub async fn edit_manifestation(
    State(state): State<AppState>,
    wallet: WalletAddress,
    Path(id): Path<Uuid>,
    Json(input): Json<EditManifestationInput>,
) -> Result<Json<Manifestation>, ApiError> {
    let mut store = state.open_store(&wallet).await.map_err(api_error)?;
    store.edit(id, input).map(Json).map_err(api_error)
}

pub async fn delete_manifestation(
    State(state): State<AppState>,
    wallet: WalletAddress,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let mut store = state.open_store(&wallet).await.map_err(api_error)?;
    store
        .delete(id)
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(api_error)
}

pub async fn advance_manifestation(
    State(state): State<AppState>,
    wallet: WalletAddress,
    Path(id): Path<Uuid>,
    Json(input): Json<AdvanceStateInput>,
) -> Result<Json<Manifestation>, ApiError> {
    let mut store = state.open_store(&wallet).await.map_err(api_error)?;
    store.advance(id, input.state).map(Json).map_err(api_error)
}

/// Mark the entry public and publish a snapshot of it to the community pool.
pub async fn share_manifestation(
    State(state): State<AppState>,
    wallet: WalletAddress,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<CommunityManifestation>), ApiError> {
    let mut store = state.open_store(&wallet).await.map_err(api_error)?;
    store
        .share(id, &state.community)
        .map(|c| (StatusCode::CREATED, Json(c)))
        .map_err(api_error)
}

pub async fn get_stats(
    State(state): State<AppState>,
    wallet: WalletAddress,
) -> Result<Json<ManifestationStats>, ApiError> {
    let store = state.open_store(&wallet).await.map_err(api_error)?;
    Ok(Json(store.stats()))
}

// ============================================================
// Daily intent and energy
// ============================================================

pub async fn set_daily_intent(
    State(state): State<AppState>,
    wallet: WalletAddress,
    Json(input): Json<SetDailyIntentInput>,
) -> Result<Json<User>, ApiError> {
    let mut store = state.open_store(&wallet).await.map_err(api_error)?;
    store
        .set_daily_intent(&input.intent)
        .map(Json)
        .map_err(api_error)
}

pub async fn list_daily_intents(
    State(state): State<AppState>,
    wallet: WalletAddress,
) -> Result<Json<Vec<DailyIntent>>, ApiError> {
    let store = state.open_store(&wallet).await.map_err(api_error)?;
    state
        .db
        .get_daily_intents(store.user().id)
        .map(Json)
        .map_err(|e| api_error(Error::Persistence(e)))
}

pub async fn boost_energy(
    State(state): State<AppState>,
    wallet: WalletAddress,
    Json(input): Json<BoostEnergyInput>,
) -> Result<Json<User>, ApiError> {
    let mut store = state.open_store(&wallet).await.map_err(api_error)?;
    store.boost_energy(input.amount).map(Json).map_err(api_error)
}

// ============================================================
// Community
// ============================================================

pub async fn list_community(
    State(state): State<AppState>,
    _wallet: WalletAddress,
    Query(query): Query<FeedQuery>,
) -> Json<Vec<CommunityManifestation>> {
    Json(state.community.query(&query))
}

pub async fn get_community_stats(
    State(state): State<AppState>,
    _wallet: WalletAddress,
) -> Json<CommunityStats> {
    Json(state.community.stats())
}

pub async fn get_community_manifestation(
    State(state): State<AppState>,
    _wallet: WalletAddress,
    Path(id): Path<Uuid>,
) -> Result<Json<CommunityManifestation>, ApiError> {
    state.community.get(id).map(Json).map_err(api_error)
}

pub async fn toggle_like(
    State(state): State<AppState>,
    wallet: WalletAddress,
    Path(id): Path<Uuid>,
) -> Result<Json<CommunityManifestation>, ApiError> {
    state
        .community
        .toggle_like(id, &wallet.0)
        .map(Json)
        .map_err(api_error)
}

pub async fn toggle_support(
    State(state): State<AppState>,
    wallet: WalletAddress,
    Path(id): Path<Uuid>,
) -> Result<Json<CommunityManifestation>, ApiError> {
    state
        .community
        .toggle_support(id, &wallet.0)
        .map(Json)
        .map_err(api_error)
}

pub async fn add_comment(
    State(state): State<AppState>,
    wallet: WalletAddress,
    Path(id): Path<Uuid>,
    Json(input): Json<AddCommentInput>,
) -> Result<(StatusCode, Json<CommunityComment>), ApiError> {
    let store = state.open_store(&wallet).await.map_err(api_error)?;
    state
        .community
        .add_comment(id, CommentAuthor::from_user(store.user()), &input.content)
        .map(|c| (StatusCode::CREATED, Json(c)))
        .map_err(api_error)
}
