//! PostgreSQL item store.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

use tessera_core::{
    normalize_tag_name, Board, Connection, ConnectionDirection, ConnectionRef, Error, Item,
    ItemFilter, ItemStore, NewBoard, NewItem, Result, Tag, TagCategory,
};

use crate::pool::{open_pool, PoolConfig};

/// Postgres error code for foreign-key violations.
const FOREIGN_KEY_VIOLATION: &str = "23503";

const ITEM_COLUMNS: &str =
    "i.id, i.title, i.body, i.source_url, i.metadata, i.created_at_utc, i.updated_at_utc";

/// PostgreSQL implementation of `ItemStore`.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub async fn connect(url: &str, config: &PoolConfig) -> Result<Self> {
        Ok(Self::new(open_pool(url, config).await?))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    /// Attach tags, boards, and connections to bare item rows.
    async fn hydrate(&self, rows: Vec<PgRow>) -> Result<Vec<Item>> {
        let mut items: Vec<Item> = rows.iter().map(item_from_row).collect();
        if items.is_empty() {
            return Ok(items);
        }
        let ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();

        let tag_rows = sqlx::query(
            "SELECT it.item_id, t.name
             FROM item_tag it
             JOIN tag t ON t.id = it.tag_id
             WHERE it.item_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let board_rows =
            sqlx::query("SELECT item_id, board_id FROM item_board WHERE item_id = ANY($1)")
                .bind(&ids)
                .fetch_all(&self.pool)
                .await
                .map_err(Error::Database)?;

        let connection_rows = sqlx::query(
            "SELECT id, from_item_id, to_item_id, reason
             FROM connection
             WHERE from_item_id = ANY($1) OR to_item_id = ANY($1)
             ORDER BY id",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut tags: HashMap<Uuid, BTreeSet<String>> = HashMap::new();
        for row in tag_rows {
            tags.entry(row.get("item_id"))
                .or_default()
                .insert(row.get("name"));
        }

        let mut boards: HashMap<Uuid, BTreeSet<Uuid>> = HashMap::new();
        for row in board_rows {
            boards
                .entry(row.get("item_id"))
                .or_default()
                .insert(row.get("board_id"));
        }

        let mut connections: HashMap<Uuid, Vec<ConnectionRef>> = HashMap::new();
        for row in connection_rows {
            let id: Uuid = row.get("id");
            let from: Uuid = row.get("from_item_id");
            let to: Uuid = row.get("to_item_id");
            let reason: Option<String> = row.get("reason");
            connections.entry(from).or_default().push(ConnectionRef {
                connection_id: id,
                item_id: to,
                direction: ConnectionDirection::Outgoing,
                reason: reason.clone(),
            });
            connections.entry(to).or_default().push(ConnectionRef {
                connection_id: id,
                item_id: from,
                direction: ConnectionDirection::Incoming,
                reason,
            });
        }

        for item in &mut items {
            item.tags = tags.remove(&item.id).unwrap_or_default();
            item.board_ids = boards.remove(&item.id).unwrap_or_default();
            item.connections = connections.remove(&item.id).unwrap_or_default();
        }
        Ok(items)
    }

    async fn upsert_tag_tx(
        tx: &mut Transaction<'_, Postgres>,
        name: &str,
        category: TagCategory,
    ) -> Result<Tag> {
        let row = sqlx::query(
            "INSERT INTO tag (id, name, category) VALUES ($1, $2, $3)
             ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
             RETURNING id, name, category",
        )
        .bind(Uuid::now_v7())
        .bind(name)
        .bind(category.as_str())
        .fetch_one(&mut **tx)
        .await
        .map_err(Error::Database)?;

        tag_from_row(&row)
    }
}

fn item_from_row(row: &PgRow) -> Item {
    let metadata: JsonValue = row.get("metadata");
    Item {
        id: row.get("id"),
        title: row.get("title"),
        body: row.get("body"),
        source_url: row.get("source_url"),
        tags: BTreeSet::new(),
        board_ids: BTreeSet::new(),
        connections: Vec::new(),
        created_at_utc: row.get("created_at_utc"),
        updated_at_utc: row.get("updated_at_utc"),
        metadata: metadata_from_json(metadata),
    }
}

/// Flatten a JSON object into string metadata; non-string values keep their
/// JSON rendering.
fn metadata_from_json(value: JsonValue) -> BTreeMap<String, String> {
    match value {
        JsonValue::Object(map) => map
            .into_iter()
            .map(|(k, v)| match v {
                JsonValue::String(s) => (k, s),
                other => (k, other.to_string()),
            })
            .collect(),
        _ => BTreeMap::new(),
    }
}

fn tag_from_row(row: &PgRow) -> Result<Tag> {
    let category: String = row.get("category");
    Ok(Tag {
        id: row.get("id"),
        name: row.get("name"),
        category: category.parse()?,
    })
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|e| e.code())
        .is_some_and(|code| code == FOREIGN_KEY_VIOLATION)
}

#[async_trait]
impl ItemStore for PgStore {
    #[instrument(skip(self), fields(subsystem = "database", component = "items", op = "fetch_items"))]
    async fn fetch_items(&self, filter: ItemFilter) -> Result<Vec<Item>> {
        let tag = filter.tag.as_deref().map(normalize_tag_name);
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS}
             FROM item i
             WHERE ($1::uuid IS NULL OR EXISTS (
                     SELECT 1 FROM item_board ib WHERE ib.item_id = i.id AND ib.board_id = $1))
               AND ($2::text IS NULL OR EXISTS (
                     SELECT 1 FROM item_tag it JOIN tag t ON t.id = it.tag_id
                     WHERE it.item_id = i.id AND t.name = $2))
               AND ($3::timestamptz IS NULL OR i.updated_at_utc > $3)
             ORDER BY i.updated_at_utc DESC, i.id ASC
             LIMIT $4"
        ))
        .bind(filter.board_id)
        .bind(tag)
        .bind(filter.updated_after)
        .bind(filter.limit.map(|l| l.max(0)))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        self.hydrate(rows).await
    }

    async fn fetch_item(&self, id: Uuid) -> Result<Item> {
        let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM item i WHERE i.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or(Error::ItemNotFound(id))?;

        self.hydrate(vec![row])
            .await?
            .pop()
            .ok_or(Error::ItemNotFound(id))
    }

    #[instrument(skip(self), fields(subsystem = "database", component = "items", op = "fetch_unassigned"))]
    async fn fetch_unassigned_items(&self) -> Result<Vec<Item>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS}
             FROM item i
             WHERE NOT EXISTS (SELECT 1 FROM item_board ib WHERE ib.item_id = i.id)
             ORDER BY i.updated_at_utc DESC, i.id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        self.hydrate(rows).await
    }

    async fn create_item(&self, req: NewItem) -> Result<Item> {
        let id = Uuid::now_v7();
        let now = Utc::now();
        let board_ids: Vec<Uuid> = req
            .board_ids
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let existing: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM board WHERE id = ANY($1)")
            .bind(&board_ids)
            .fetch_all(&mut *tx)
            .await
            .map_err(Error::Database)?;
        if let Some(missing) = board_ids.iter().find(|b| !existing.contains(b)) {
            return Err(Error::BoardNotFound(*missing));
        }

        sqlx::query(
            "INSERT INTO item (id, title, body, source_url, metadata, created_at_utc, updated_at_utc)
             VALUES ($1, $2, $3, $4, $5, $6, $6)",
        )
        .bind(id)
        .bind(&req.title)
        .bind(&req.body)
        .bind(&req.source_url)
        .bind(serde_json::to_value(&req.metadata)?)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        let tag_names: BTreeSet<String> = req
            .tags
            .iter()
            .map(|t| normalize_tag_name(t))
            .filter(|t| !t.is_empty())
            .collect();
        for name in &tag_names {
            let tag = Self::upsert_tag_tx(&mut tx, name, TagCategory::default()).await?;
            sqlx::query("INSERT INTO item_tag (item_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                .bind(id)
                .bind(tag.id)
                .execute(&mut *tx)
                .await
                .map_err(Error::Database)?;
        }

        for board_id in &board_ids {
            sqlx::query("INSERT INTO item_board (item_id, board_id) VALUES ($1, $2)")
                .bind(id)
                .bind(board_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    if is_foreign_key_violation(&e) {
                        Error::BoardNotFound(*board_id)
                    } else {
                        Error::Database(e)
                    }
                })?;
        }

        tx.commit().await.map_err(Error::Database)?;
        debug!(item_id = %id, tag_count = tag_names.len(), "Item created");
        self.fetch_item(id).await
    }

    async fn create_board(&self, req: NewBoard) -> Result<Board> {
        let name = req.name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("Board name cannot be empty".to_string()));
        }

        let id = Uuid::now_v7();
        let now = Utc::now();
        let sort_order: i32 = sqlx::query_scalar(
            "INSERT INTO board (id, name, icon, color, sort_order, created_at_utc)
             SELECT $1, $2, $3, $4, COALESCE(MAX(sort_order) + 1, 0), $5 FROM board
             RETURNING sort_order",
        )
        .bind(id)
        .bind(name)
        .bind(&req.icon)
        .bind(&req.color)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(Board {
            id,
            name: name.to_string(),
            icon: req.icon,
            color: req.color,
            sort_order,
            created_at_utc: now,
        })
    }

    async fn list_boards(&self) -> Result<Vec<Board>> {
        let rows = sqlx::query(
            "SELECT id, name, icon, color, sort_order, created_at_utc
             FROM board ORDER BY sort_order, created_at_utc",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| Board {
                id: row.get("id"),
                name: row.get("name"),
                icon: row.get("icon"),
                color: row.get("color"),
                sort_order: row.get("sort_order"),
                created_at_utc: row.get("created_at_utc"),
            })
            .collect())
    }

    #[instrument(skip(self, reason), fields(subsystem = "database", component = "connections", op = "create"))]
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

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let existing: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM item WHERE id = ANY($1)")
            .bind(vec![a, b])
            .fetch_all(&mut *tx)
            .await
            .map_err(Error::Database)?;
        for id in [a, b] {
            if !existing.contains(&id) {
                return Err(Error::ItemNotFound(id));
            }
        }

        let id = Uuid::now_v7();
        let now = Utc::now();
        // The pair index makes a concurrent duplicate lose here.
        let inserted = sqlx::query(
            "INSERT INTO connection (id, from_item_id, to_item_id, reason, created_at_utc)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT DO NOTHING
             RETURNING id",
        )
        .bind(id)
        .bind(a)
        .bind(b)
        .bind(reason)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if inserted.is_none() {
            return Err(Error::AlreadyExists(format!("connection {} <-> {}", a, b)));
        }
        tx.commit().await.map_err(Error::Database)?;

        Ok(Connection {
            id,
            from_item_id: a,
            to_item_id: b,
            reason: reason.map(str::to_string),
            created_at_utc: now,
        })
    }

    async fn add_items_to_board(&self, board_id: Uuid, item_ids: &[Uuid]) -> Result<usize> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM board WHERE id = $1)")
            .bind(board_id)
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;
        if !exists {
            return Err(Error::BoardNotFound(board_id));
        }

        let result = sqlx::query(
            "INSERT INTO item_board (item_id, board_id)
             SELECT i.id, $1 FROM item i WHERE i.id = ANY($2)
             ON CONFLICT DO NOTHING",
        )
        .bind(board_id)
        .bind(item_ids)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                Error::BoardNotFound(board_id)
            } else {
                Error::Database(e)
            }
        })?;

        Ok(result.rows_affected() as usize)
    }

    async fn upsert_tag(&self, name: &str, category: TagCategory) -> Result<Tag> {
        let normalized = normalize_tag_name(name);
        if normalized.is_empty() {
            return Err(Error::InvalidInput("Tag name cannot be empty".to_string()));
        }
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let tag = Self::upsert_tag_tx(&mut tx, &normalized, category).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(tag)
    }
}
