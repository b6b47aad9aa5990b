//! The storage port (spec.md §6 "Storage interface (required of the
//! host)") plus an in-memory adapter so the core runs standalone (spec.md
//! §1: "The core must run in-memory with pluggable storage").
//!
//! Records are opaque maps keyed by string with a small well-known subset
//! (spec.md §6); this crate stores them as `serde_json::Value` and layers
//! typed helpers for the subset the engine actually reads/writes
//! (`EntityRecord`, `Place`, `Region`).

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use taleforge_domain::entities::{EntityRecord, Place};
use taleforge_domain::ids::RegionId;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Actor,
    Npc,
    Place,
    Region,
}

impl RecordKind {
    fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Actor => "actor",
            RecordKind::Npc => "npc",
            RecordKind::Place => "place",
            RecordKind::Region => "region",
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("not found: {kind:?} {id}")]
    NotFound { kind: RecordKind, id: String },
    #[error("serialization error: {0}")]
    Serialization(String),
}

#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub region_id: Option<RegionId>,
    pub tag: Option<String>,
}

impl RecordFilter {
    pub fn matches(&self, record: &serde_json::Value) -> bool {
        if let Some(tag) = &self.tag {
            let tags = record.get("tags").and_then(|v| v.as_array());
            let has_tag = tags.is_some_and(|arr| arr.iter().any(|t| t.as_str() == Some(tag.as_str())));
            if !has_tag {
                return false;
            }
        }
        true
    }
}

/// Key-value read/write for typed records, scoped by slot (spec.md §6).
#[async_trait]
pub trait StoragePort: Send + Sync {
    async fn load_raw(&self, slot: u32, kind: RecordKind, id: &str) -> Result<serde_json::Value, StorageError>;
    async fn save_raw(&self, slot: u32, kind: RecordKind, id: &str, record: serde_json::Value) -> Result<(), StorageError>;
    async fn list_raw(&self, slot: u32, kind: RecordKind, filter: &RecordFilter) -> Result<Vec<String>, StorageError>;
    async fn delete_raw(&self, slot: u32, kind: RecordKind, id: &str) -> Result<(), StorageError>;
}

/// Typed convenience methods layered over the opaque-map contract.
#[async_trait]
pub trait StoragePortExt: StoragePort {
    async fn load_entity(&self, slot: u32, id: &str) -> Result<EntityRecord, StorageError> {
        for kind in [RecordKind::Actor, RecordKind::Npc] {
            if let Ok(v) = self.load_raw(slot, kind, id).await {
                return serde_json::from_value(v).map_err(|e| StorageError::Serialization(e.to_string()));
            }
        }
        Err(StorageError::NotFound { kind: RecordKind::Actor, id: id.to_string() })
    }

    async fn save_entity(&self, slot: u32, record: &EntityRecord) -> Result<(), StorageError> {
        use taleforge_domain::entities::ActorType;
        let kind = match record.entity_type {
            ActorType::Player => RecordKind::Actor,
            ActorType::Npc => RecordKind::Npc,
        };
        let v = serde_json::to_value(record).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.save_raw(slot, kind, &record.id.to_string(), v).await
    }

    async fn load_place(&self, slot: u32, id: &str) -> Result<Place, StorageError> {
        let v = self.load_raw(slot, RecordKind::Place, id).await?;
        serde_json::from_value(v).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    async fn save_place(&self, slot: u32, place: &Place) -> Result<(), StorageError> {
        let v = serde_json::to_value(place).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.save_raw(slot, RecordKind::Place, &place.id.to_string(), v).await
    }
}

impl<T: StoragePort + ?Sized> StoragePortExt for T {}

/// `dashmap`-backed implementation, keyed by `(slot, kind, id)`, matching
/// the teacher's preference for `dashmap` as the process-wide concurrent
/// collection of choice.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    records: DashMap<(u32, &'static str, String), serde_json::Value>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self { records: DashMap::new() }
    }

    fn key(slot: u32, kind: RecordKind, id: &str) -> (u32, &'static str, String) {
        (slot, kind.as_str(), id.to_string())
    }
}

#[async_trait]
impl StoragePort for InMemoryStorage {
    async fn load_raw(&self, slot: u32, kind: RecordKind, id: &str) -> Result<serde_json::Value, StorageError> {
        self.records
            .get(&Self::key(slot, kind, id))
            .map(|r| r.value().clone())
            .ok_or_else(|| StorageError::NotFound { kind, id: id.to_string() })
    }

    async fn save_raw(&self, slot: u32, kind: RecordKind, id: &str, record: serde_json::Value) -> Result<(), StorageError> {
        self.records.insert(Self::key(slot, kind, id), record);
        Ok(())
    }

    async fn list_raw(&self, slot: u32, kind: RecordKind, filter: &RecordFilter) -> Result<Vec<String>, StorageError> {
        let mut ids: Vec<String> = self
            .records
            .iter()
            .filter(|entry| entry.key().0 == slot && entry.key().1 == kind.as_str())
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.key().2.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn delete_raw(&self, slot: u32, kind: RecordKind, id: &str) -> Result<(), StorageError> {
        self.records.remove(&Self::key(slot, kind, id));
        Ok(())
    }
}

/// A place-entity index entry (spec.md §6 "Persistence layout").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaceIndexEntry {
    pub npcs: Vec<String>,
    pub actors: Vec<String>,
    pub last_updated: chrono::DateTime<chrono::Utc>,
}

/// `{place_id -> {npcs[], actors[], last_updated}}`, reconstructible from
/// entity records (spec.md §6: "MUST be reconstructible from entity
/// records").
#[derive(Debug, Default)]
pub struct PlaceEntityIndex {
    entries: DashMap<String, PlaceIndexEntry>,
}

impl PlaceEntityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the whole index from scratch by scanning every actor/NPC
    /// record's `location.place_id` (the `rebuild-place-entity-index`
    /// administrative operation, spec.md §6).
    pub async fn rebuild(&self, slot: u32, storage: &dyn StoragePort, now: chrono::DateTime<chrono::Utc>) -> Result<(), StorageError> {
        self.entries.clear();
        for kind in [RecordKind::Actor, RecordKind::Npc] {
            for id in storage.list_raw(slot, kind, &RecordFilter::default()).await? {
                let raw = storage.load_raw(slot, kind, &id).await?;
                let record: EntityRecord = serde_json::from_value(raw).map_err(|e| StorageError::Serialization(e.to_string()))?;
                let place_id = record.location.place_id.to_string();
                let mut entry = self.entries.entry(place_id).or_default();
                match kind {
                    RecordKind::Npc => entry.npcs.push(id),
                    RecordKind::Actor => entry.actors.push(id),
                    _ => unreachable!(),
                }
                entry.last_updated = now;
            }
        }
        Ok(())
    }

    pub fn purge(&self, place_id: &str) {
        self.entries.remove(place_id);
    }

    pub fn get(&self, place_id: &str) -> Option<PlaceIndexEntry> {
        self.entries.get(place_id).map(|e| e.value().clone())
    }

    /// Every place currently indexed, for service loops that need to
    /// enumerate active places (movement ticker) without maintaining a
    /// separate registry.
    pub fn place_ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key().clone()).collect()
    }

    pub fn record_entry(&self, place_id: &str, entity_id: &str, is_npc: bool, now: chrono::DateTime<chrono::Utc>) {
        let mut entry = self.entries.entry(place_id.to_string()).or_default();
        let list = if is_npc { &mut entry.npcs } else { &mut entry.actors };
        if !list.iter().any(|e| e == entity_id) {
            list.push(entity_id.to_string());
        }
        entry.last_updated = now;
    }

    pub fn record_exit(&self, place_id: &str, entity_id: &str, now: chrono::DateTime<chrono::Utc>) {
        if let Some(mut entry) = self.entries.get_mut(place_id) {
            entry.npcs.retain(|e| e != entity_id);
            entry.actors.retain(|e| e != entity_id);
            entry.last_updated = now;
        }
    }
}

/// `{npc_ref -> {target_entity, timeout_at_ms}}`, used to synchronize
/// cross-service movement decisions (spec.md §6 "Persistence layout").
#[derive(Debug, Default)]
pub struct ConversationPresenceTable {
    entries: DashMap<String, ConversationPresenceEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationPresenceEntry {
    pub target_entity: String,
    pub timeout_at_ms: i64,
}

impl ConversationPresenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, npc_ref: &str, target_entity: &str, timeout_at_ms: i64) {
        self.entries.insert(
            npc_ref.to_string(),
            ConversationPresenceEntry { target_entity: target_entity.to_string(), timeout_at_ms },
        );
    }

    pub fn clear(&self, npc_ref: &str) {
        self.entries.remove(npc_ref);
    }

    pub fn get(&self, npc_ref: &str) -> Option<ConversationPresenceEntry> {
        self.entries.get(npc_ref).map(|e| e.value().clone())
    }
}
