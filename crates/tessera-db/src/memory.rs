//! In-process item store.
//!
//! Backs tests and single-user deployments that run without PostgreSQL. All
//! state lives behind one `tokio::sync::RwLock`, so every trait operation is
//! atomic with respect to the others.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use tessera_core::{
    normalize_tag_name, Board, Connection, ConnectionDirection, ConnectionRef, Error, Item,
    ItemFilter, ItemStore, NewBoard, NewItem, Result, Tag, TagCategory,
};

#[derive(Default)]
struct StoreState {
    /// Items without their `connections`; those are joined in on read.
    items: HashMap<Uuid, Item>,
    boards: Vec<Board>,
    tags: HashMap<String, Tag>,
    connections: HashMap<(Uuid, Uuid), Connection>,
}

impl StoreState {
    fn ensure_tag(&mut self, name: &str, category: TagCategory) -> Tag {
        self.tags
            .entry(name.to_string())
            .or_insert_with(|| Tag {
                id: Uuid::now_v7(),
                name: name.to_string(),
                category,
            })
            .clone()
    }

    fn has_board(&self, id: Uuid) -> bool {
        self.boards.iter().any(|b| b.id == id)
    }

    /// Copy of `item` with its connection refs filled in.
    fn materialize(&self, item: &Item) -> Item {
        let mut connections: Vec<ConnectionRef> = self
            .connections
            .values()
            .filter(|c| c.involves(item.id))
            .map(|c| {
                let (other, direction) = if c.from_item_id == item.id {
                    (c.to_item_id, ConnectionDirection::Outgoing)
                } else {
                    (c.from_item_id, ConnectionDirection::Incoming)
                };
                ConnectionRef {
                    connection_id: c.id,
                    item_id: other,
                    direction,
                    reason: c.reason.clone(),
                }
            })
            .collect();
        connections.sort_by_key(|c| c.connection_id);

        let mut out = item.clone();
        out.connections = connections;
        out
    }

    fn sorted_items<'a>(&self, items: impl Iterator<Item = &'a Item>) -> Vec<Item> {
        let mut out: Vec<Item> = items.map(|i| self.materialize(i)).collect();
        out.sort_by(|a, b| {
            b.updated_at_utc
                .cmp(&a.updated_at_utc)
                .then(a.id.cmp(&b.id))
        });
        out
    }
}

/// `ItemStore` kept entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed item, keeping its id and timestamps.
    ///
    /// Tags are created as needed. Board ids must already exist. Any
    /// `connections` on the item are ignored; use `create_connection`.
    pub async fn insert_item(&self, mut item: Item) -> Result<Item> {
        let mut state = self.state.write().await;
        if let Some(missing) = item.board_ids.iter().find(|b| !state.has_board(**b)) {
            return Err(Error::BoardNotFound(*missing));
        }
        for tag in &item.tags {
            state.ensure_tag(tag, TagCategory::default());
        }
        item.connections.clear();
        state.items.insert(item.id, item.clone());
        Ok(state.materialize(&item))
    }

    /// Remove a board and every membership in it.
    pub async fn delete_board(&self, board_id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        let before = state.boards.len();
        state.boards.retain(|b| b.id != board_id);
        if state.boards.len() == before {
            return Err(Error::BoardNotFound(board_id));
        }
        for item in state.items.values_mut() {
            item.board_ids.remove(&board_id);
        }
        Ok(())
    }

    /// Every stored connection, oldest first.
    pub async fn connections(&self) -> Vec<Connection> {
        let state = self.state.read().await;
        let mut out: Vec<Connection> = state.connections.values().cloned().collect();
        out.sort_by(|a, b| a.created_at_utc.cmp(&b.created_at_utc).then(a.id.cmp(&b.id)));
        out
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn fetch_items(&self, filter: ItemFilter) -> Result<Vec<Item>> {
        let state = self.state.read().await;
        let mut items = state.sorted_items(state.items.values().filter(|i| filter.matches(i)));
        if let Some(limit) = filter.limit {
            items.truncate(limit.max(0) as usize);
        }
        Ok(items)
    }

    async fn fetch_item(&self, id: Uuid) -> Result<Item> {
        let state = self.state.read().await;
        state
            .items
            .get(&id)
            .map(|i| state.materialize(i))
            .ok_or(Error::ItemNotFound(id))
    }

    async fn fetch_unassigned_items(&self) -> Result<Vec<Item>> {
        let state = self.state.read().await;
        Ok(state.sorted_items(state.items.values().filter(|i| i.is_unassigned())))
    }

    async fn create_item(&self, req: NewItem) -> Result<Item> {
        let mut item = Item::new(req.title, req.body)
            .with_tags(&req.tags)
            .with_boards(req.board_ids);
        item.source_url = req.source_url;
        item.metadata = req.metadata;
        self.insert_item(item).await
    }

    async fn create_board(&self, req: NewBoard) -> Result<Board> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Board name cannot be empty".to_string()));
        }

        let mut state = self.state.write().await;
        let sort_order = state
            .boards
            .iter()
            .map(|b| b.sort_order + 1)
            .max()
            .unwrap_or(0);
        let board = Board {
            id: Uuid::now_v7(),
            name: name.to_string(),
            icon: req.icon,
            color: req.color,
            sort_order,
            created_at_utc: Utc::now(),
        };
        state.boards.push(board.clone());
        debug!(board_id = %board.id, sort_order, "Board created");
        Ok(board)
    }

    async fn list_boards(&self) -> Result<Vec<Board>> {
        let state = self.state.read().await;
        let mut boards = state.boards.clone();
        boards.sort_by_key(|b| b.sort_order);
        Ok(boards)
    }

    async fn create_connection(
        &self,
        a: Uuid,
        b: Uuid,
        reason: Option<&str>,
    ) -> Result<Connection> {
        if a == b {
            return Err(Error::InvalidInput(
                "An item cannot be connected to itself".to_string(),
            ));
        }

        let mut state = self.state.write().await;
        for id in [a, b] {
            if !state.items.contains_key(&id) {
                return Err(Error::ItemNotFound(id));
            }
        }

        let key = Connection::pair_key(a, b);
        if state.connections.contains_key(&key) {
            return Err(Error::AlreadyExists(format!("connection {} <-> {}", a, b)));
        }

        let connection = Connection {
            id: Uuid::now_v7(),
            from_item_id: a,
            to_item_id: b,
            reason: reason.map(str::to_string),
            created_at_utc: Utc::now(),
        };
        state.connections.insert(key, connection.clone());
        Ok(connection)
    }

    async fn add_items_to_board(&self, board_id: Uuid, item_ids: &[Uuid]) -> Result<usize> {
        let mut state = self.state.write().await;
        if !state.has_board(board_id) {
            return Err(Error::BoardNotFound(board_id));
        }

        let unique: BTreeSet<Uuid> = item_ids.iter().copied().collect();
        let mut added = 0;
        for id in unique {
            if let Some(item) = state.items.get_mut(&id) {
                if item.board_ids.insert(board_id) {
                    added += 1;
                }
            }
        }
        Ok(added)
    }

    async fn upsert_tag(&self, name: &str, category: TagCategory) -> Result<Tag> {
        let normalized = normalize_tag_name(name);
        if normalized.is_empty() {
            return Err(Error::InvalidInput("Tag name cannot be empty".to_string()));
        }
        let mut state = self.state.write().await;
        Ok(state.ensure_tag(&normalized, category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_fetch_items_orders_by_updated_desc() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let old = Item::new("old", "").with_timestamps(now - Duration::days(3), now - Duration::days(3));
        let new = Item::new("new", "").with_timestamps(now, now);
        store.insert_item(old.clone()).await.unwrap();
        store.insert_item(new.clone()).await.unwrap();

        let items = store.fetch_items(ItemFilter::default()).await.unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![new.id, old.id]);
    }

    #[tokio::test]
    async fn test_connections_visible_from_both_ends() {
        let store = MemoryStore::new();
        let a = store.insert_item(Item::new("a", "")).await.unwrap();
        let b = store.insert_item(Item::new("b", "")).await.unwrap();
        store.create_connection(a.id, b.id, Some("related")).await.unwrap();

        let a = store.fetch_item(a.id).await.unwrap();
        let b = store.fetch_item(b.id).await.unwrap();
        assert!(a.is_connected_to(b.id));
        assert!(b.is_connected_to(a.id));
        assert_eq!(a.connections[0].direction, ConnectionDirection::Outgoing);
        assert_eq!(b.connections[0].direction, ConnectionDirection::Incoming);
        assert_eq!(b.connections[0].reason.as_deref(), Some("related"));
    }

    #[tokio::test]
    async fn test_insert_item_rejects_unknown_board() {
        let store = MemoryStore::new();
        let board = Uuid::new_v4();
        let err = store
            .insert_item(Item::new("a", "").with_boards([board]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BoardNotFound(id) if id == board));
    }

    #[tokio::test]
    async fn test_upsert_tag_is_idempotent() {
        let store = MemoryStore::new();
        let first = store.upsert_tag(" Stoicism ", TagCategory::Topic).await.unwrap();
        let second = store.upsert_tag("stoicism", TagCategory::Person).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "stoicism");
        assert_eq!(second.category, TagCategory::Topic);
    }
}
