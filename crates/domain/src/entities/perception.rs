//! Perception events and the per-observer memory that stores them
//! (spec.md §3 "Perception event", §4.5 "Perception memory").

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::action::Verb;
use crate::entities::location::Location;
use crate::ids::{ActorRef, PerceptionEventId};
use crate::value_objects::{Clarity, Sense};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerceptionType {
    ActionStarted,
    ActionCompleted,
    Communication,
    Movement,
    CombatStarted,
    DamageDealt,
    DamageReceived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorTypeTag {
    Player,
    Npc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerceptionEvent {
    pub id: PerceptionEventId,
    pub timestamp: DateTime<Utc>,
    pub observer_ref: ActorRef,
    pub event_type: PerceptionType,
    pub actor_ref: ActorRef,
    pub actor_type: ActorTypeTag,
    pub actor_visibility: Clarity,
    pub verb: Verb,
    pub subtype: Option<String>,
    pub target_ref: Option<ActorRef>,
    pub location: Location,
    pub distance: f64,
    pub senses: Vec<Sense>,
    pub details: serde_json::Value,
    pub threat_level: u8,
    pub interest_level: u8,
    pub urgency: u8,
}

impl PerceptionEvent {
    pub fn best_sense(&self) -> Option<Sense> {
        self.senses.iter().min_by_key(|s| s.rank()).copied()
    }
}

/// Clamp a signed adjustment onto `0..=100`, per spec.md §4.5:
/// "All three clamped to [0,100]."
pub fn clamp_score(value: i32) -> u8 {
    value.clamp(0, 100) as u8
}

const MEMORY_CAP: usize = 50;
const MEMORY_TTL_MINUTES: i64 = 5;

/// Per-observer bounded ring of perception events (spec.md §4.5,
/// "Perception memory"). Pruning is amortized: every `add` drops expired
/// entries before appending, rather than running a background sweep.
#[derive(Debug, Clone, Default)]
pub struct PerceptionMemory {
    events: Vec<PerceptionEvent>,
}

impl PerceptionMemory {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - Duration::minutes(MEMORY_TTL_MINUTES);
        self.events.retain(|e| e.timestamp > cutoff);
    }

    /// Drop expired entries, append the new event, then evict the oldest
    /// by insertion order if still over the cap (spec.md §4.5: "evicting
    /// by TTL then by count").
    pub fn add(&mut self, event: PerceptionEvent, now: DateTime<Utc>) {
        self.prune(now);
        self.events.push(event);
        if self.events.len() > MEMORY_CAP {
            let excess = self.events.len() - MEMORY_CAP;
            self.events.drain(0..excess);
        }
    }

    pub fn query(&self, filter: &PerceptionQuery) -> Vec<&PerceptionEvent> {
        self.events
            .iter()
            .filter(|e| filter.event_type.map_or(true, |t| t == e.event_type))
            .filter(|e| filter.verb.map_or(true, |v| v == e.verb))
            .filter(|e| filter.since.map_or(true, |since| e.timestamp >= since))
            .filter(|e| e.threat_level >= filter.min_threat)
            .filter(|e| e.interest_level >= filter.min_interest)
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PerceptionQuery {
    pub event_type: Option<PerceptionType>,
    pub verb: Option<Verb>,
    pub since: Option<DateTime<Utc>>,
    pub min_threat: u8,
    pub min_interest: u8,
}
