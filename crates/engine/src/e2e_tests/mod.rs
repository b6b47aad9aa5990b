//! Cross-module scenario tests for spec.md §8's end-to-end scenarios.
//!
//! Each module-level test in the rest of this crate already exercises one
//! stage in isolation; the tests here wire several services together the
//! way `runtime::spawn_all` does, so a regression in how two services hand
//! off to each other (pipeline -> turn manager, perception -> witness,
//! movement -> reservations) shows up here even when every single-module
//! test still passes.

mod combat_trigger;
mod held_reaction_priority;
mod movement_blocked_and_stopped;
mod whisper_overheard;

use std::collections::BTreeMap;

use chrono::Utc;
use dashmap::DashMap;

use taleforge_domain::entities::{
    ActorType, EntityRecord, Facing, HealthResource, IntentFactory, Location, PerceptionMemory, SourceOfAuthority, Verb,
};
use taleforge_domain::ids::{ActorRef, PlaceId};

use crate::bus::MessageBus;
use crate::infrastructure::clock::FixedRandom;
use crate::infrastructure::storage::{InMemoryStorage, PlaceEntityIndex, StoragePortExt};
use crate::pipeline::{run_pipeline, PipelineServices};
use crate::rules::Applier;
use crate::witness::WitnessState;
use taleforge_shared::SessionId;

/// One fully-wired in-memory engine instance, scoped to a single test
/// (spec.md §9: "Tests spin up an isolated instance per case").
pub(crate) struct Harness {
    pub storage: InMemoryStorage,
    pub bus: MessageBus,
    pub place_index: PlaceEntityIndex,
    pub applier: Applier,
    pub witness: WitnessState,
    pub memories: DashMap<ActorRef, PerceptionMemory>,
    pub random: FixedRandom,
    pub session_id: SessionId,
}

impl Harness {
    pub fn new(random: i32) -> Self {
        let session_id = SessionId::new();
        Self {
            storage: InMemoryStorage::new(),
            bus: MessageBus::new(session_id),
            place_index: PlaceEntityIndex::new(),
            applier: Applier::new(),
            witness: WitnessState::new(),
            memories: DashMap::new(),
            random: FixedRandom(random),
            session_id,
        }
    }

    pub fn services(&self) -> PipelineServices<'_> {
        PipelineServices {
            slot: 0,
            session_id: self.session_id,
            storage: &self.storage,
            bus: &self.bus,
            place_index: &self.place_index,
            applier: &self.applier,
            witness: &self.witness,
            memories: &self.memories,
            random: &self.random,
        }
    }

    pub async fn seed(&self, record: &EntityRecord) {
        self.storage.save_entity(0, record).await.unwrap();
        let now = Utc::now();
        self.place_index.record_entry(
            &record.location.place_id.to_string(),
            &record.id.to_string(),
            record.entity_type == ActorType::Npc,
            now,
        );
    }
}

pub(crate) fn entity(entity_type: ActorType, name: &str, place: PlaceId, x: i32, y: i32) -> EntityRecord {
    EntityRecord {
        id: ActorRef::new(),
        entity_type,
        name: name.to_string(),
        location: Location::new(place, x, y),
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

pub(crate) fn attack_intent(actor: &EntityRecord, mention: &str) -> taleforge_domain::entities::Intent {
    let mut params = BTreeMap::new();
    params.insert("mention".to_string(), serde_json::json!(mention));
    IntentFactory::create(actor.id, ActorType::Player, Verb::Attack, params, actor.location, SourceOfAuthority::Player, Utc::now())
}
