//! Core traits for tessera abstractions.
//!
//! The pipeline consumes two external capabilities: a durable item store and
//! a text-completion provider. Both are traits so production and test
//! implementations are interchangeable.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// STORE TRAITS
// =============================================================================

/// Durable store for items, boards, tags, and connections.
///
/// Reads return snapshots; the pipeline never assumes the store is unchanged
/// between a read and a later write, so every mutation re-validates its
/// invariants at commit time.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// List items matching `filter`, most recently updated first.
    async fn fetch_items(&self, filter: ItemFilter) -> Result<Vec<Item>>;

    /// Fetch one item by id.
    async fn fetch_item(&self, id: Uuid) -> Result<Item>;

    /// List items that belong to no board, most recently updated first.
    async fn fetch_unassigned_items(&self) -> Result<Vec<Item>>;

    /// Persist a new item.
    async fn create_item(&self, item: NewItem) -> Result<Item>;

    /// Persist a new board, appended after the existing ones.
    async fn create_board(&self, board: NewBoard) -> Result<Board>;

    /// List boards in sort order.
    async fn list_boards(&self) -> Result<Vec<Board>>;

    /// Create a connection between two items.
    ///
    /// Fails with `Error::AlreadyExists` if the unordered pair is already
    /// connected, and with `Error::InvalidInput` for a self-connection.
    async fn create_connection(&self, a: Uuid, b: Uuid, reason: Option<&str>)
        -> Result<Connection>;

    /// Add items to a board, leaving their other memberships untouched.
    ///
    /// Returns the number of memberships actually added.
    async fn add_items_to_board(&self, board_id: Uuid, item_ids: &[Uuid]) -> Result<usize>;

    /// Create a tag if its normalized name is new; returns the stored tag.
    async fn upsert_tag(&self, name: &str, category: TagCategory) -> Result<Tag>;
}

// =============================================================================
// COMPLETION TRAITS
// =============================================================================

/// An opaque asynchronous text-completion capability (LLM).
///
/// Implementations report failures as errors; callers in the pipeline treat
/// every failure cause the same way and fall back to deterministic output.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Complete `prompt` under the given system instructions.
    async fn complete(&self, system: &str, prompt: &str) -> Result<Completion>;

    /// Get the model name being used.
    fn model_name(&self) -> &str;
}
