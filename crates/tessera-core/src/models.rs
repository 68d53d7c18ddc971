//! Data models for tessera.
//!
//! Persisted entities (items, tags, boards, connections) are owned by the
//! store; the pipeline only reads snapshots of them. Ephemeral records
//! (suggestions, prompt bubbles, synthesis results) are created fresh per
//! call, carry no back-references into the store, and must not be trusted
//! after the underlying items change.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Item metadata key holding the user's attached reflection text.
pub const META_REFLECTION: &str = "reflection";

/// Item metadata key listing the source item ids of a synthesis note.
pub const META_SYNTHESIS_SOURCES: &str = "synthesis_sources";

/// Item metadata key recording who produced a synthesis note (`llm` | `local`).
pub const META_GENERATED_BY: &str = "generated_by";

// =============================================================================
// ITEM TYPES
// =============================================================================

/// Direction of a connection as seen from the item holding the reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionDirection {
    Outgoing,
    Incoming,
}

/// An item's view of one of its connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRef {
    pub connection_id: Uuid,
    /// The item on the other end.
    pub item_id: Uuid,
    pub direction: ConnectionDirection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A unit of captured knowledge: a note, link, or highlight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    /// Normalized tag names (see [`normalize_tag_name`]).
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub board_ids: BTreeSet<Uuid>,
    #[serde(default)]
    pub connections: Vec<ConnectionRef>,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl Item {
    /// Create an item stamped with the current time and a fresh id.
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            title: title.into(),
            body: body.into(),
            source_url: None,
            tags: BTreeSet::new(),
            board_ids: BTreeSet::new(),
            connections: Vec::new(),
            created_at_utc: now,
            updated_at_utc: now,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = tags
            .into_iter()
            .map(|t| normalize_tag_name(t.as_ref()))
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    pub fn with_boards<I: IntoIterator<Item = Uuid>>(mut self, boards: I) -> Self {
        self.board_ids = boards.into_iter().collect();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Override both timestamps (useful for fixtures and imports).
    pub fn with_timestamps(mut self, created: DateTime<Utc>, updated: DateTime<Utc>) -> Self {
        self.created_at_utc = created;
        self.updated_at_utc = updated;
        self
    }

    /// Title and body joined, as fed to the tokenizer.
    pub fn text(&self) -> String {
        format!("{}\n{}", self.title, self.body)
    }

    /// Whether a connection to `other` exists in either direction.
    pub fn is_connected_to(&self, other: Uuid) -> bool {
        self.connections.iter().any(|c| c.item_id == other)
    }

    /// Ids of every item connected to this one, either direction.
    pub fn connected_ids(&self) -> BTreeSet<Uuid> {
        self.connections.iter().map(|c| c.item_id).collect()
    }

    /// Reflection text the user attached, if any.
    pub fn reflection(&self) -> Option<&str> {
        self.metadata
            .get(META_REFLECTION)
            .map(String::as_str)
            .filter(|r| !r.trim().is_empty())
    }

    pub fn is_unassigned(&self) -> bool {
        self.board_ids.is_empty()
    }

    /// Number of tags this item shares with `other`.
    pub fn shared_tag_count(&self, other: &Item) -> usize {
        self.tags.intersection(&other.tags).count()
    }
}

/// Request for creating a new item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewItem {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub board_ids: Vec<Uuid>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Filter for item listings. All fields are optional and combinable.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub board_id: Option<Uuid>,
    pub tag: Option<String>,
    pub updated_after: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

impl ItemFilter {
    /// Whether `item` passes every set criterion (ignores `limit`).
    pub fn matches(&self, item: &Item) -> bool {
        if let Some(board) = self.board_id {
            if !item.board_ids.contains(&board) {
                return false;
            }
        }
        if let Some(ref tag) = self.tag {
            if !item.tags.contains(&normalize_tag_name(tag)) {
                return false;
            }
        }
        if let Some(after) = self.updated_after {
            if item.updated_at_utc <= after {
                return false;
            }
        }
        true
    }
}

// =============================================================================
// TAG TYPES
// =============================================================================

/// Tag categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagCategory {
    #[default]
    Topic,
    Person,
    Place,
    Project,
    Source,
}

impl TagCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagCategory::Topic => "topic",
            TagCategory::Person => "person",
            TagCategory::Place => "place",
            TagCategory::Project => "project",
            TagCategory::Source => "source",
        }
    }
}

impl fmt::Display for TagCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "topic" => Ok(Self::Topic),
            "person" => Ok(Self::Person),
            "place" => Ok(Self::Place),
            "project" => Ok(Self::Project),
            "source" => Ok(Self::Source),
            _ => Err(Error::InvalidInput(format!("Unknown tag category: {}", s))),
        }
    }
}

/// A named label. Names are unique after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub category: TagCategory,
}

/// Normalize a tag name: trimmed, lowercased, inner whitespace collapsed.
pub fn normalize_tag_name(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// BOARD TYPES
// =============================================================================

/// A named grouping of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub sort_order: i32,
    pub created_at_utc: DateTime<Utc>,
}

/// Request for creating a board.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewBoard {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

// =============================================================================
// CONNECTION TYPES
// =============================================================================

/// An edge between two items. At most one exists per unordered pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: Uuid,
    pub from_item_id: Uuid,
    pub to_item_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub created_at_utc: DateTime<Utc>,
}

impl Connection {
    /// Canonical key for the unordered pair `{a, b}`.
    pub fn pair_key(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn involves(&self, id: Uuid) -> bool {
        self.from_item_id == id || self.to_item_id == id
    }
}

// =============================================================================
// EPHEMERAL SUGGESTION TYPES
// =============================================================================

/// Kind of a feed suggestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Connect,
    Revisit,
    Synthesize,
    Continue,
    Nudge,
}

impl SuggestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionKind::Connect => "connect",
            SuggestionKind::Revisit => "revisit",
            SuggestionKind::Synthesize => "synthesize",
            SuggestionKind::Continue => "continue",
            SuggestionKind::Nudge => "nudge",
        }
    }
}

impl fmt::Display for SuggestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-persisted recommendation surfaced to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub title: String,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<Uuid>,
    /// Second item for `connect` suggestions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_item_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nudge_id: Option<String>,
}

impl Suggestion {
    /// Identity used to suppress repeats across calls.
    pub fn dedup_key(&self) -> String {
        let id = |v: Option<Uuid>| v.map(|u| u.to_string()).unwrap_or_default();
        format!(
            "{}|{}|{}|{}|{}",
            self.kind,
            id(self.item_id),
            id(self.related_item_id),
            id(self.board_id),
            self.nudge_id.as_deref().unwrap_or("")
        )
    }
}

/// A ranked candidate connection for a query item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionCandidate {
    pub item: Item,
    /// Jaccard similarity of the two items' token sets.
    pub score: f32,
    pub shared_tags: usize,
    pub reason: String,
}

/// What a cluster was grouped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusterKeyKind {
    Tag,
    Keyword,
}

/// A proposed board for a group of unassigned items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSuggestion {
    /// The shared tag or keyword.
    pub key: String,
    pub kind: ClusterKeyKind,
    /// Proposed board name derived from the key.
    pub board_name: String,
    pub member_ids: Vec<Uuid>,
}

/// A short reflection prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptBubble {
    pub prompt: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_tag: Option<String>,
    #[serde(default)]
    pub seed_item_ids: BTreeSet<Uuid>,
    #[serde(default)]
    pub board_ids: BTreeSet<Uuid>,
}

/// A generated summary of several items, editable before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesisResult {
    pub markdown: String,
    pub source_item_ids: Vec<Uuid>,
    /// `true` when produced by the completion provider, `false` for the
    /// local fallback summarizer.
    pub is_llm_generated: bool,
}

// =============================================================================
// COMPLETION TYPES
// =============================================================================

/// Text returned by a completion provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    pub text: String,
    pub model: String,
}
