//! The opaque, well-known-subset entity record the storage port reads and
//! writes (spec.md §6, "Storage interface"), and the capability-set
//! abstraction actors/NPCs share over it (spec.md §9, "Polymorphism across
//! actor kinds").
//!
//! A record is not a projection of one Rust struct per entity variant:
//! actors and NPCs are the same record shape, distinguished only by the
//! `entity_type` tag, per the design note's "tagged `entity_type` field at
//! the interface boundary."

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entities::action::Verb;
use crate::entities::intent::ActorType;
use crate::entities::location::{Facing, Location};
use crate::ids::ActorRef;
use crate::value_objects::VisionCone;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HealthResource {
    pub current: i64,
    pub max: i64,
}

impl HealthResource {
    pub fn apply_delta(&mut self, delta: i64) {
        self.current = (self.current + delta).clamp(0, self.max);
    }

    pub fn is_down(&self) -> bool {
        self.current <= 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub item: String,
    pub count: i64,
}

/// A loose personality profile driving Witness scoring (spec.md §4.6,
/// "Social interest score"). Only NPCs carry one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Personality {
    pub curiosity: f32,
    pub gossip_tendency: f32,
    pub suspiciousness: f32,
    /// Per-speaker fondness, looked up by the speaker's `ActorRef` string
    /// form (spec.md §4.6: "relationship fondness x2").
    pub fondness: BTreeMap<String, f32>,
    /// Shop/profession tag used for the "professional stake" bonus, e.g.
    /// `Some("shopkeeper")` (spec.md §4.6).
    pub profession: Option<String>,
    pub dialogue_profile: Option<String>,
}

impl Personality {
    pub fn fondness_for(&self, speaker: ActorRef) -> f32 {
        self.fondness.get(&speaker.to_string()).copied().unwrap_or(0.0)
    }

    pub fn is_shopkeeper(&self) -> bool {
        self.profession.as_deref() == Some("shopkeeper")
    }
}

/// The well-known subset of an entity record's fields (spec.md §6): `id`,
/// `name`, `location`, `stats`, `resources.health.{current,max}`, `tags`,
/// `inventory`, `body_slots`. Anything beyond this subset is opaque to the
/// core and left in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: ActorRef,
    pub entity_type: ActorType,
    pub name: String,
    pub location: Location,
    pub facing: Facing,
    pub health: HealthResource,
    pub stats: BTreeMap<String, i64>,
    pub tags: Vec<String>,
    pub inventory: Vec<InventoryItem>,
    pub body_slots: BTreeMap<String, String>,
    pub personality: Option<Personality>,
    pub proficiencies: Vec<String>,
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl EntityRecord {
    pub fn dex(&self) -> i64 {
        self.stats.get("dex").copied().unwrap_or(50)
    }

    /// The entity's vision-cone preset, selected by tag (spec.md §4.5
    /// presets). Falls back to `HUMANOID` when no more specific tag applies.
    pub fn vision_cone(&self) -> VisionCone {
        if self.tags.iter().any(|t| t == "blind") {
            VisionCone::BLIND
        } else if self.tags.iter().any(|t| t == "guard") {
            VisionCone::GUARD
        } else if self.tags.iter().any(|t| t == "animal") {
            VisionCone::ANIMAL
        } else if self.tags.iter().any(|t| t == "scout") {
            VisionCone::SCOUT
        } else {
            VisionCone::HUMANOID
        }
    }

    pub fn can_perform(&self, verb: Verb) -> bool {
        match verb {
            Verb::Attack | Verb::Flee => !self.health.is_down(),
            _ => true,
        }
    }

    pub fn inventory_count(&self, item: &str) -> i64 {
        self.inventory.iter().find(|i| i.item == item).map(|i| i.count).unwrap_or(0)
    }
}
