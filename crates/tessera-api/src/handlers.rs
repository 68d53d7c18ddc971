//! Request handlers.
//!
//! Handlers read a snapshot from the store, hand it to the suggestion
//! pipeline, and serialize the ephemeral result. Only the explicit commit
//! endpoints write to the store.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use tessera_core::defaults::PAGE_LIMIT_MAX;
use tessera_core::{
    ClusterKeyKind, ClusterSuggestion, ConnectionCandidate, Item, ItemFilter, NewBoard,
    PromptBubble, Suggestion, SynthesisResult,
};
use tessera_suggest::{
    accept_cluster, accept_connection, board_name, create_synthesis_item, ClusterCommit,
    ConnectionCommit, RefreshOutcome,
};

use crate::error::ApiError;
use crate::state::AppState;

/// Clamp a caller-supplied `limit`/`max` into `1..=PAGE_LIMIT_MAX`.
fn clamp_limit(requested: Option<i64>, default: usize) -> usize {
    requested
        .map(|n| n.clamp(1, PAGE_LIMIT_MAX) as usize)
        .unwrap_or(default)
}

async fn all_items(state: &AppState) -> Result<Vec<Item>, ApiError> {
    Ok(state.store.fetch_items(ItemFilter::default()).await?)
}

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "model": state.model,
    }))
}

// =============================================================================
// CONNECTIONS
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

pub async fn suggest_connections(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<ConnectionCandidate>>, ApiError> {
    let item = state.store.fetch_item(id).await?;
    let pool = all_items(&state).await?;
    let limit = clamp_limit(query.limit, state.connections.config().limit);

    let dismissals = state.dismissals.lock().await;
    let candidates = state
        .connections
        .suggest(&item, &pool, limit, Some(&*dismissals));
    Ok(Json(candidates))
}

#[derive(Debug, Deserialize)]
pub struct CreateConnectionBody {
    pub target_id: Uuid,
    #[serde(default)]
    pub reason: Option<String>,
}

pub async fn create_connection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateConnectionBody>,
) -> Result<(StatusCode, Json<ConnectionCommit>), ApiError> {
    let commit =
        accept_connection(state.store.as_ref(), id, body.target_id, body.reason.as_deref()).await?;
    let status = match commit {
        ConnectionCommit::Created(_) => StatusCode::CREATED,
        ConnectionCommit::AlreadyConnected => StatusCode::OK,
    };
    Ok((status, Json(commit)))
}

#[derive(Debug, Deserialize)]
pub struct DismissBody {
    pub target_id: Uuid,
}

pub async fn dismiss_connection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<DismissBody>,
) -> Result<StatusCode, ApiError> {
    if id == body.target_id {
        return Err(ApiError::BadRequest(
            "cannot dismiss an item against itself".to_string(),
        ));
    }
    state.dismissals.lock().await.dismiss(id, body.target_id);
    info!(item_id = %id, target_id = %body.target_id, "Connection suggestion dismissed");
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// CLUSTERS
// =============================================================================

pub async fn suggest_clusters(
    State(state): State<AppState>,
) -> Result<Json<Vec<ClusterSuggestion>>, ApiError> {
    let unassigned = state.store.fetch_unassigned_items().await?;
    Ok(Json(state.clusters.suggest(&unassigned)))
}

fn default_cluster_kind() -> ClusterKeyKind {
    ClusterKeyKind::Tag
}

#[derive(Debug, Deserialize)]
pub struct AcceptClusterBody {
    pub key: String,
    #[serde(default = "default_cluster_kind")]
    pub kind: ClusterKeyKind,
    pub member_ids: Vec<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

pub async fn accept_cluster_suggestion(
    State(state): State<AppState>,
    Json(body): Json<AcceptClusterBody>,
) -> Result<(StatusCode, Json<ClusterCommit>), ApiError> {
    let suggestion = ClusterSuggestion {
        board_name: board_name(&body.key),
        key: body.key,
        kind: body.kind,
        member_ids: body.member_ids,
    };
    let board = NewBoard {
        name: body.name.unwrap_or_default(),
        icon: body.icon,
        color: body.color,
    };
    let commit = accept_cluster(state.store.as_ref(), &suggestion, board).await?;
    Ok((StatusCode::CREATED, Json(commit)))
}

// =============================================================================
// STARTERS
// =============================================================================

pub async fn refresh_starters(
    State(state): State<AppState>,
) -> Result<Json<RefreshOutcome>, ApiError> {
    let items = all_items(&state).await?;
    Ok(Json(state.starters.refresh(&items).await))
}

#[derive(Debug, Deserialize)]
pub struct StartersQuery {
    pub board_id: Option<Uuid>,
    pub max: Option<i64>,
}

pub async fn list_starters(
    State(state): State<AppState>,
    Query(query): Query<StartersQuery>,
) -> Json<Vec<PromptBubble>> {
    let max = clamp_limit(query.max, usize::MAX);
    Json(state.starters.bubbles(query.board_id, max).await)
}

// =============================================================================
// SYNTHESIS
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SynthesisBody {
    pub item_ids: Vec<Uuid>,
    #[serde(default)]
    pub scope_title: String,
}

pub async fn generate_synthesis(
    State(state): State<AppState>,
    Json(body): Json<SynthesisBody>,
) -> Result<Json<SynthesisResult>, ApiError> {
    let mut items = Vec::with_capacity(body.item_ids.len());
    for id in body.item_ids {
        items.push(state.store.fetch_item(id).await?);
    }
    let result = state.synthesis.generate(&items, &body.scope_title).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct CommitSynthesisBody {
    pub result: SynthesisResult,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub board_id: Option<Uuid>,
}

pub async fn commit_synthesis(
    State(state): State<AppState>,
    Json(body): Json<CommitSynthesisBody>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let item =
        create_synthesis_item(state.store.as_ref(), &body.result, &body.title, body.board_id)
            .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

// =============================================================================
// FEED
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub max: Option<i64>,
}

pub async fn suggestion_feed(
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<Vec<Suggestion>>, ApiError> {
    let items = all_items(&state).await?;
    let boards = state.store.list_boards().await?;

    let dismissals = state.dismissals.lock().await;
    let mut feed = state.feed.lock().await;
    let max = clamp_limit(query.max, feed.config().max_results);
    let suggestions = feed.build(&items, &boards, Some(&*dismissals), Utc::now(), max);
    Ok(Json(suggestions))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None, 5), 5);
        assert_eq!(clamp_limit(Some(0), 5), 1);
        assert_eq!(clamp_limit(Some(-3), 5), 1);
        assert_eq!(clamp_limit(Some(10_000), 5), PAGE_LIMIT_MAX as usize);
        assert_eq!(clamp_limit(Some(7), 5), 7);
    }
}
