//! Explicit commit steps that turn accepted suggestions into store writes.
//!
//! Suggestions are computed from snapshots, so every helper here relies on
//! the store to re-check invariants at write time instead of trusting the
//! suggestion it was handed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use tessera_core::{
    Board, ClusterSuggestion, Connection, Error, Item, ItemStore, NewBoard, NewItem, Result,
    SynthesisResult, META_GENERATED_BY, META_SYNTHESIS_SOURCES,
};

/// Outcome of accepting a connection suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "connection", rename_all = "snake_case")]
pub enum ConnectionCommit {
    Created(Connection),
    /// The pair was connected by someone else since the suggestion was made.
    AlreadyConnected,
}

/// Outcome of accepting a cluster suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterCommit {
    pub board: Board,
    /// Memberships actually added; members already on the board are skipped.
    pub added: usize,
}

/// Create the suggested connection; an existing edge counts as success.
#[instrument(skip(store, reason), fields(subsystem = "suggest", component = "commit", op = "accept_connection"))]
pub async fn accept_connection(
    store: &dyn ItemStore,
    a: Uuid,
    b: Uuid,
    reason: Option<&str>,
) -> Result<ConnectionCommit> {
    match store.create_connection(a, b, reason).await {
        Ok(connection) => {
            info!(connection_id = %connection.id, "Connection created");
            Ok(ConnectionCommit::Created(connection))
        }
        Err(e) if e.is_already_exists() => {
            debug!("Pair already connected, treating as accepted");
            Ok(ConnectionCommit::AlreadyConnected)
        }
        Err(e) => Err(e),
    }
}

/// Create a board for `suggestion` and add its members to it.
///
/// Members keep their other board memberships. A blank `board.name` falls
/// back to the suggested name.
#[instrument(skip_all, fields(subsystem = "suggest", component = "commit", op = "accept_cluster", key = %suggestion.key, member_count = suggestion.member_ids.len()))]
pub async fn accept_cluster(
    store: &dyn ItemStore,
    suggestion: &ClusterSuggestion,
    mut board: NewBoard,
) -> Result<ClusterCommit> {
    if suggestion.member_ids.is_empty() {
        return Err(Error::InvalidInput("cluster has no members".to_string()));
    }
    if board.name.trim().is_empty() {
        board.name = suggestion.board_name.clone();
    }
    let board = store.create_board(board).await?;
    let added = store
        .add_items_to_board(board.id, &suggestion.member_ids)
        .await?;
    info!(board_id = %board.id, added, "Cluster accepted");
    Ok(ClusterCommit { board, added })
}

/// Persist a synthesis as a new item, optionally on `board_id`.
#[instrument(skip_all, fields(subsystem = "suggest", component = "commit", op = "create_synthesis_item", source_count = result.source_item_ids.len()))]
pub async fn create_synthesis_item(
    store: &dyn ItemStore,
    result: &SynthesisResult,
    title: &str,
    board_id: Option<Uuid>,
) -> Result<Item> {
    if result.markdown.trim().is_empty() {
        return Err(Error::InvalidInput("synthesis is empty".to_string()));
    }
    let title = match title.trim() {
        "" => "Synthesis".to_string(),
        t => t.to_string(),
    };

    let mut metadata = BTreeMap::new();
    metadata.insert(
        META_SYNTHESIS_SOURCES.to_string(),
        result
            .source_item_ids
            .iter()
            .map(Uuid::to_string)
            .collect::<Vec<_>>()
            .join(","),
    );
    metadata.insert(
        META_GENERATED_BY.to_string(),
        if result.is_llm_generated { "llm" } else { "local" }.to_string(),
    );

    let item = store
        .create_item(NewItem {
            title,
            body: result.markdown.clone(),
            source_url: None,
            tags: Vec::new(),
            board_ids: board_id.into_iter().collect(),
            metadata,
        })
        .await?;
    info!(item_id = %item.id, "Synthesis item created");
    Ok(item)
}

/// Source ids recorded on a synthesis item, in original order.
pub fn synthesis_sources(item: &Item) -> Vec<Uuid> {
    item.metadata
        .get(META_SYNTHESIS_SOURCES)
        .map(|raw| {
            raw.split(',')
                .filter_map(|id| Uuid::parse_str(id.trim()).ok())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_commit_serializes_with_status() {
        let json = serde_json::to_value(ConnectionCommit::AlreadyConnected).unwrap();
        assert_eq!(json["status"], "already_connected");
    }

    #[test]
    fn test_synthesis_sources_parses_metadata() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let item = Item::new("s", "")
            .with_metadata(META_SYNTHESIS_SOURCES, format!("{},not-a-uuid, {}", a, b));
        assert_eq!(synthesis_sources(&item), vec![a, b]);
        assert!(synthesis_sources(&Item::new("plain", "")).is_empty());
    }
}
