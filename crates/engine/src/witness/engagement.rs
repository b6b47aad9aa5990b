//! Engagement side-channel (spec.md §4.6 "Engagement state"): tracks, per
//! NPC, whether it is currently engaged/distracted/ended in a social
//! interaction, independent of the conversation arena itself.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use taleforge_domain::ids::ActorRef;

pub const DISTRACTED_AFTER_IDLE_MS: i64 = 20_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementKind {
    Conversation,
    Eavesdrop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngagementPhase {
    Engaged,
    Distracted,
    Ended,
}

#[derive(Debug, Clone)]
pub struct Engagement {
    pub kind: EngagementKind,
    pub phase: EngagementPhase,
    pub attention_span_ms: i64,
    pub last_interaction_at_ms: i64,
    pub max_distance_tiles: f64,
}

/// `{npc_ref -> engagement}` (spec.md §4.6).
#[derive(Debug, Default)]
pub struct EngagementTable {
    entries: DashMap<ActorRef, Engagement>,
}

impl EngagementTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn engage(&self, npc_ref: ActorRef, kind: EngagementKind, attention_span_ms: i64, max_distance_tiles: f64, now: DateTime<Utc>) {
        self.entries.insert(
            npc_ref,
            Engagement {
                kind,
                phase: EngagementPhase::Engaged,
                attention_span_ms,
                last_interaction_at_ms: now.timestamp_millis(),
                max_distance_tiles,
            },
        );
    }

    pub fn touch(&self, npc_ref: ActorRef, now: DateTime<Utc>) {
        if let Some(mut engagement) = self.entries.get_mut(&npc_ref) {
            engagement.last_interaction_at_ms = now.timestamp_millis();
            engagement.phase = EngagementPhase::Engaged;
        }
    }

    pub fn get(&self, npc_ref: ActorRef) -> Option<Engagement> {
        self.entries.get(&npc_ref).map(|e| e.value().clone())
    }

    pub fn end(&self, npc_ref: ActorRef) {
        self.entries.remove(&npc_ref);
    }

    /// Periodic sweep (spec.md §4.6: "engaged -> distracted (idle > 20s)
    /// -> ended"). Entries already `Distracted` for another full idle
    /// window are ended outright.
    pub fn sweep(&self, now: DateTime<Utc>) -> Vec<ActorRef> {
        let now_ms = now.timestamp_millis();
        let mut ended = Vec::new();
        let mut to_end = Vec::new();

        for mut entry in self.entries.iter_mut() {
            let idle_ms = now_ms - entry.last_interaction_at_ms;
            match entry.phase {
                EngagementPhase::Engaged if idle_ms > DISTRACTED_AFTER_IDLE_MS => {
                    entry.phase = EngagementPhase::Distracted;
                }
                EngagementPhase::Distracted if idle_ms > DISTRACTED_AFTER_IDLE_MS * 2 => {
                    entry.phase = EngagementPhase::Ended;
                    to_end.push(*entry.key());
                }
                _ => {}
            }
        }

        for npc_ref in to_end {
            self.entries.remove(&npc_ref);
            ended.push(npc_ref);
        }
        ended
    }
}
