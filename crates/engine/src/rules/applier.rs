//! Apply effect lines to entity records through the storage port
//! (spec.md §4.10). Every applied effect records an `AppliedDiff`;
//! re-applying the same `effect_id` is a no-op (spec.md §8,
//! "Applying a diff twice with the same effect_id yields the same state
//! as applying it once").

use dashmap::DashSet;
use taleforge_domain::DomainError;
use taleforge_shared::effects::{EffectLine, EffectValue};

use crate::infrastructure::storage::{RecordKind, StoragePort, StoragePortExt};

#[derive(Debug, Clone, PartialEq)]
pub struct AppliedDiff {
    pub effect_id: String,
    pub target: String,
    pub field: String,
    pub delta: f64,
    pub reason: String,
}

/// Tracks which `effect_id`s have already been applied (spec.md §4.10).
#[derive(Debug, Default)]
pub struct Applier {
    applied_ids: DashSet<String>,
}

fn parse_wire_ref(raw: &str) -> Result<(RecordKind, &str), DomainError> {
    let (prefix, id) = raw.split_once('.').ok_or_else(|| DomainError::validation(format!("malformed target ref {raw:?}")))?;
    match prefix {
        "actor" => Ok((RecordKind::Actor, id)),
        "npc" => Ok((RecordKind::Npc, id)),
        _ => Err(DomainError::validation(format!("unknown target prefix {prefix:?}"))),
    }
}

impl Applier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one effect line, returning `None` when `effect_id` was
    /// already applied.
    pub async fn apply(&self, slot: u32, effect_id: &str, line: &EffectLine, storage: &dyn StoragePort) -> Result<Option<AppliedDiff>, DomainError> {
        if !self.applied_ids.insert(effect_id.to_string()) {
            return Ok(None);
        }

        let diff = match line.op.as_str() {
            "APPLY_DAMAGE" => self.apply_health_delta(slot, effect_id, line, storage, -1.0).await?,
            "APPLY_HEAL" => self.apply_health_delta(slot, effect_id, line, storage, 1.0).await?,
            "ADJUST_INVENTORY" => self.apply_inventory(slot, effect_id, line, storage).await?,
            "SET_AWARENESS" => self.apply_awareness(slot, effect_id, line, storage).await?,
            "SET_OCCUPANCY" => self.apply_occupancy(slot, effect_id, line, storage).await?,
            other => return Err(DomainError::UnhandledEffect(other.to_string())),
        };
        Ok(Some(diff))
    }

    async fn apply_health_delta(&self, slot: u32, effect_id: &str, line: &EffectLine, storage: &dyn StoragePort, sign: f64) -> Result<AppliedDiff, DomainError> {
        let target = arg_identifier(line, "target")?;
        let mag = arg_number(line, "mag")?;
        let (_, id) = parse_wire_ref(target)?;
        let mut record = storage.load_entity(slot, id).await.map_err(|e| DomainError::not_found("entity", e.to_string()))?;
        let delta = sign * mag;
        record.health.apply_delta(delta as i64);
        storage.save_entity(slot, &record).await.map_err(|e| DomainError::validation(e.to_string()))?;
        Ok(AppliedDiff {
            effect_id: effect_id.to_string(),
            target: target.to_string(),
            field: "health.current".to_string(),
            delta,
            reason: line.op.clone(),
        })
    }

    async fn apply_inventory(&self, slot: u32, effect_id: &str, line: &EffectLine, storage: &dyn StoragePort) -> Result<AppliedDiff, DomainError> {
        let target = arg_identifier(line, "target")?;
        let item = arg_string(line, "item")?;
        let mag = arg_number(line, "mag")?;
        let (_, id) = parse_wire_ref(target)?;
        let mut record = storage.load_entity(slot, id).await.map_err(|e| DomainError::not_found("entity", e.to_string()))?;

        match record.inventory.iter_mut().find(|i| i.item == item) {
            Some(entry) => entry.count += mag as i64,
            None => record.inventory.push(taleforge_domain::entities::InventoryItem { item: item.to_string(), count: mag as i64 }),
        }
        record.inventory.retain(|i| i.count > 0);
        storage.save_entity(slot, &record).await.map_err(|e| DomainError::validation(e.to_string()))?;

        Ok(AppliedDiff {
            effect_id: effect_id.to_string(),
            target: target.to_string(),
            field: format!("inventory.{item}"),
            delta: mag,
            reason: line.op.clone(),
        })
    }

    async fn apply_awareness(&self, slot: u32, effect_id: &str, line: &EffectLine, storage: &dyn StoragePort) -> Result<AppliedDiff, DomainError> {
        let observer = arg_identifier(line, "observer")?;
        let target = arg_identifier(line, "target")?;
        let (_, id) = parse_wire_ref(observer)?;
        let mut record = storage.load_entity(slot, id).await.map_err(|e| DomainError::not_found("entity", e.to_string()))?;

        let obscured = line.arg("clarity").and_then(|v| v.as_str_value()) == Some("obscured");
        let mut info = vec![serde_json::Value::String(target.to_string())];
        if obscured {
            info.push(serde_json::Value::String("obscured".to_string()));
        }
        record.extra.insert("AWARENESS".to_string(), serde_json::Value::Array(info));
        if !record.tags.iter().any(|t| t == "AWARENESS") {
            record.tags.push("AWARENESS".to_string());
        }
        storage.save_entity(slot, &record).await.map_err(|e| DomainError::validation(e.to_string()))?;

        Ok(AppliedDiff {
            effect_id: effect_id.to_string(),
            target: observer.to_string(),
            field: "AWARENESS".to_string(),
            delta: 0.0,
            reason: line.op.clone(),
        })
    }

    async fn apply_occupancy(&self, slot: u32, effect_id: &str, line: &EffectLine, storage: &dyn StoragePort) -> Result<AppliedDiff, DomainError> {
        let target = arg_identifier(line, "target")?;
        let tiles = line.args.get("tiles").and_then(|v| v.as_list()).ok_or_else(|| DomainError::validation("SET_OCCUPANCY requires tiles[]"))?;
        let first = tiles.first().and_then(|v| v.as_identifier()).ok_or_else(|| DomainError::validation("SET_OCCUPANCY tiles[0] must be an identifier"))?;
        let (x, y) = parse_tile_ref(first)?;

        let (_, id) = parse_wire_ref(target)?;
        let mut record = storage.load_entity(slot, id).await.map_err(|e| DomainError::not_found("entity", e.to_string()))?;
        record.location.x = x;
        record.location.y = y;
        storage.save_entity(slot, &record).await.map_err(|e| DomainError::validation(e.to_string()))?;

        Ok(AppliedDiff {
            effect_id: effect_id.to_string(),
            target: target.to_string(),
            field: "location".to_string(),
            delta: 0.0,
            reason: line.op.clone(),
        })
    }
}

fn arg_identifier<'a>(line: &'a EffectLine, key: &str) -> Result<&'a str, DomainError> {
    line.arg(key).and_then(EffectValue::as_identifier).ok_or_else(|| DomainError::validation(format!("missing {key} identifier")))
}

fn arg_string<'a>(line: &'a EffectLine, key: &str) -> Result<&'a str, DomainError> {
    line.arg(key).and_then(EffectValue::as_str_value).ok_or_else(|| DomainError::validation(format!("missing {key} string")))
}

fn arg_number(line: &EffectLine, key: &str) -> Result<f64, DomainError> {
    line.arg(key).and_then(EffectValue::as_number).ok_or_else(|| DomainError::validation(format!("missing {key} number")))
}

/// Parses `region_tile.<x>.<y>`, `place_tile.<x>.<y>`, or `place.<x>.<y>`
/// shapes (spec.md §4.10 `SET_OCCUPANCY`).
fn parse_tile_ref(raw: &str) -> Result<(i32, i32), DomainError> {
    let mut parts = raw.split('.');
    let prefix = parts.next().unwrap_or("");
    if !matches!(prefix, "region_tile" | "place_tile" | "place") {
        return Err(DomainError::validation(format!("unknown tile ref shape {raw:?}")));
    }
    let x: i32 = parts.next().and_then(|s| s.parse().ok()).ok_or_else(|| DomainError::validation(format!("malformed tile ref {raw:?}")))?;
    let y: i32 = parts.next().and_then(|s| s.parse().ok()).ok_or_else(|| DomainError::validation(format!("malformed tile ref {raw:?}")))?;
    Ok((x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::InMemoryStorage;
    use std::collections::BTreeMap;
    use taleforge_domain::entities::{ActorType, Facing, HealthResource, Location};
    use taleforge_domain::ids::{ActorRef, PlaceId};

    fn record(id: ActorRef) -> taleforge_domain::entities::EntityRecord {
        taleforge_domain::entities::EntityRecord {
            id,
            entity_type: ActorType::Npc,
            name: "Grenda".into(),
            location: Location::new(PlaceId::new(), 0, 0),
            facing: Facing::South,
            health: HealthResource { current: 10, max: 10 },
            stats: BTreeMap::new(),
            tags: vec![],
            inventory: vec![],
            body_slots: BTreeMap::new(),
            personality: None,
            proficiencies: vec![],
            extra: BTreeMap::new(),
        }
    }

    fn damage_line(target: &str, mag: f64) -> EffectLine {
        let mut args = BTreeMap::new();
        args.insert("target".to_string(), EffectValue::Identifier(target.to_string()));
        args.insert("mag".to_string(), EffectValue::Number(mag));
        EffectLine { op: "APPLY_DAMAGE".to_string(), args }
    }

    #[tokio::test]
    async fn apply_damage_clamps_health() {
        let storage = InMemoryStorage::new();
        let id = ActorRef::new();
        storage.save_entity(1, &record(id)).await.unwrap();
        let applier = Applier::new();
        let line = damage_line(&format!("npc.{id}"), 50.0);
        applier.apply(1, "fx-1", &line, &storage).await.unwrap();
        let updated = storage.load_entity(1, &id.to_string()).await.unwrap();
        assert_eq!(updated.health.current, 0);
    }

    #[tokio::test]
    async fn reapplying_same_effect_id_is_a_no_op() {
        let storage = InMemoryStorage::new();
        let id = ActorRef::new();
        storage.save_entity(1, &record(id)).await.unwrap();
        let applier = Applier::new();
        let line = damage_line(&format!("npc.{id}"), 3.0);
        applier.apply(1, "fx-1", &line, &storage).await.unwrap();
        let second = applier.apply(1, "fx-1", &line, &storage).await.unwrap();
        assert!(second.is_none());
        let updated = storage.load_entity(1, &id.to_string()).await.unwrap();
        assert_eq!(updated.health.current, 7);
    }

    #[tokio::test]
    async fn inventory_entry_is_removed_once_count_hits_zero() {
        let storage = InMemoryStorage::new();
        let id = ActorRef::new();
        let mut r = record(id);
        r.inventory.push(taleforge_domain::entities::InventoryItem { item: "torch".into(), count: 1 });
        storage.save_entity(1, &r).await.unwrap();

        let mut args = BTreeMap::new();
        args.insert("target".to_string(), EffectValue::Identifier(format!("npc.{id}")));
        args.insert("item".to_string(), EffectValue::Str("torch".to_string()));
        args.insert("mag".to_string(), EffectValue::Number(-1.0));
        let line = EffectLine { op: "ADJUST_INVENTORY".to_string(), args };

        let applier = Applier::new();
        applier.apply(1, "fx-2", &line, &storage).await.unwrap();
        let updated = storage.load_entity(1, &id.to_string()).await.unwrap();
        assert!(updated.inventory.is_empty());
    }

    #[tokio::test]
    async fn unknown_op_is_rejected() {
        let storage = InMemoryStorage::new();
        let applier = Applier::new();
        let line = EffectLine { op: "NOT_A_REAL_OP".to_string(), args: BTreeMap::new() };
        let err = applier.apply(1, "fx-3", &line, &storage).await.unwrap_err();
        assert_eq!(err.kind(), "unhandled_effect");
    }
}
