//! Turn Manager & Timed-Event State Machine (spec.md §4.7): trigger
//! detection, initiative rolling, the phase machine, held
//! actions/reactions, end-condition detection, and region-exit tracking.

mod initiative;

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use taleforge_domain::entities::{
    EventType, HeldAction, InitiativeEntry, Phase, TurnState, Verb,
};
use taleforge_domain::ids::{ActorRef, EventId, RegionId};

use crate::infrastructure::clock::RandomPort;

pub use initiative::{dex_bonus, roll_initiative, roll_initiative_with};

const ACTION_SELECTION_LIMIT_MS: u64 = 60_000;

/// What a completed adjudication's verb maps to, if anything, per spec.md
/// §4.7 "Trigger": "a completed adjudication whose parsed events contain
/// ATTACK(...) or COMMUNICATE(...) enters the trigger detector."
pub fn detect_trigger(verb: Verb) -> Option<EventType> {
    match verb {
        Verb::Attack | Verb::Cast => Some(EventType::Combat),
        Verb::Communicate => Some(EventType::Conversation),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct PhaseTransitionLog {
    pub event_id: EventId,
    pub turn: u32,
    pub round: u32,
    pub actor: ActorRef,
    pub from_phase: Phase,
    pub to_phase: Phase,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    AllOnOneSideDown,
    RoundCapReached,
    AllFarewell,
    AllDisengaged,
    ObjectiveSatisfied,
}

#[derive(Debug, Clone)]
pub struct EndedEvent {
    pub event_id: EventId,
    pub reason: EndReason,
}

/// Process-wide turn-state registry (spec.md §9: "Global state ... each
/// has an explicit init/teardown path").
#[derive(Default)]
pub struct TurnManager {
    events: DashMap<EventId, TurnState>,
    region_index: DashMap<RegionId, EventId>,
    left_region: DashMap<EventId, HashSet<ActorRef>>,
}

impl TurnManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_event_for_region(&self, region_id: RegionId) -> Option<EventId> {
        self.region_index.get(&region_id).map(|e| *e.value())
    }

    pub fn get(&self, event_id: EventId) -> Option<TurnState> {
        self.events.get(&event_id).map(|e| e.value().clone())
    }

    /// Every timed event currently running, for the service loop that
    /// ticks `ACTION_SELECTION` timers across all of them.
    pub fn active_event_ids(&self) -> Vec<EventId> {
        self.events.iter().map(|e| *e.key()).collect()
    }

    /// Start a new timed event (spec.md §4.7 "Trigger"): rolls initiative,
    /// enters `TURN_START`, and indexes the event by region so the next
    /// trigger for the same region re-enters instead of starting a
    /// second one.
    pub fn start_event(
        &self,
        event_type: EventType,
        region_id: RegionId,
        participants: &[(ActorRef, i32)],
        random: &dyn RandomPort,
        now: DateTime<Utc>,
    ) -> (EventId, Vec<InitiativeEntry>) {
        let event_id = EventId::new();
        let order = roll_initiative_with(event_id, participants, random);
        let current_actor_ref = order.first().map(|e| e.actor_ref).unwrap_or_else(|| participants[0].0);

        let state = TurnState {
            event_id,
            event_type,
            initiative_order: order.clone(),
            current_actor_ref,
            current_turn: 1,
            round_number: 1,
            phase: Phase::TurnStart,
            turn_time_remaining_ms: ACTION_SELECTION_LIMIT_MS,
            turn_duration_limit_ms: ACTION_SELECTION_LIMIT_MS,
            held_actions: Vec::new(),
        };
        self.events.insert(event_id, state);
        self.region_index.insert(region_id, event_id);
        let _ = now;
        (event_id, order)
    }

    /// Advance from `TURN_START` into `ACTION_SELECTION` (spec.md §4.7
    /// "Phase machine").
    pub fn enter_action_selection(&self, event_id: EventId) -> Option<PhaseTransitionLog> {
        self.transition(event_id, "phase advance", |state| {
            state.advance_phase();
        })
    }

    /// Decrement the `ACTION_SELECTION` timer by `elapsed_ms`; on expiry
    /// advance straight to `TURN_END` with the turn marked skipped
    /// (spec.md §8 boundary: "never both advances the turn and runs the
    /// action").
    pub fn tick_action_selection(&self, event_id: EventId, elapsed_ms: u64) -> Option<PhaseTransitionLog> {
        let mut state = self.events.get_mut(&event_id)?;
        if state.phase != Phase::ActionSelection {
            return None;
        }
        state.turn_time_remaining_ms = state.turn_time_remaining_ms.saturating_sub(elapsed_ms);
        if state.turn_time_remaining_ms == 0 {
            let from = state.phase;
            state.phase = Phase::TurnEnd;
            return Some(PhaseTransitionLog {
                event_id,
                turn: state.current_turn,
                round: state.round_number,
                actor: state.current_actor_ref,
                from_phase: from,
                to_phase: Phase::TurnEnd,
                reason: "turn_timer_expired_skipped".to_string(),
            });
        }
        None
    }

    /// Advance one phase step, looping `EVENT_END_CHECK` back to
    /// `TURN_START` for the next participant (or `EVENT_END` when an end
    /// condition already fired).
    pub fn advance(&self, event_id: EventId) -> Option<PhaseTransitionLog> {
        self.transition(event_id, "phase advance", |state| {
            if state.phase == Phase::EventEndCheck {
                state.phase = Phase::TurnStart;
                state.advance_to_next_actor();
            } else {
                state.advance_phase();
            }
        })
    }

    fn transition<F: FnOnce(&mut TurnState)>(&self, event_id: EventId, reason: &str, f: F) -> Option<PhaseTransitionLog> {
        let mut state = self.events.get_mut(&event_id)?;
        let from = state.phase;
        f(&mut state);
        if state.phase == from {
            return None;
        }
        Some(PhaseTransitionLog {
            event_id,
            turn: state.current_turn,
            round: state.round_number,
            actor: state.current_actor_ref,
            from_phase: from,
            to_phase: state.phase,
            reason: reason.to_string(),
        })
    }

    /// Register a held action (spec.md §4.7 "Held actions & reactions").
    pub fn hold_action(&self, event_id: EventId, held: HeldAction) {
        if let Some(mut state) = self.events.get_mut(&event_id) {
            state.held_actions.push(held);
        }
    }

    /// Process held reactions matching `event_text` in descending
    /// priority order, dropping expired/invalid ones without consuming
    /// the holder's reserve (spec.md §4.7).
    pub fn process_reactions(&self, event_id: EventId, event_text: &str, current_turn: u32) -> Vec<HeldAction> {
        let Some(mut state) = self.events.get_mut(&event_id) else {
            return Vec::new();
        };
        let matching: Vec<HeldAction> = state
            .pending_reactions_by_priority()
            .into_iter()
            .filter(|h| !h.is_expired(current_turn) && event_text.contains(&h.trigger.condition))
            .cloned()
            .collect();
        let matched_actors: HashSet<ActorRef> = matching.iter().map(|h| h.actor_ref).collect();
        state.held_actions.retain(|h| !matched_actors.contains(&h.actor_ref));
        matching
    }

    /// Mark a participant as having left the event's region; it stops
    /// receiving turns (spec.md §4.7 "Region exits").
    pub fn check_region_exits(&self, event_id: EventId, event_region: RegionId, locations: &HashMap<ActorRef, RegionId>) -> Vec<ActorRef> {
        let Some(state) = self.events.get(&event_id) else {
            return Vec::new();
        };
        let mut exited = Vec::new();
        for entry in &state.initiative_order {
            if locations.get(&entry.actor_ref).is_some_and(|r| *r != event_region) {
                exited.push(entry.actor_ref);
            }
        }
        if !exited.is_empty() {
            self.left_region.entry(event_id).or_default().extend(exited.iter().copied());
        }
        exited
    }

    pub fn has_left_region(&self, event_id: EventId, actor: ActorRef) -> bool {
        self.left_region.get(&event_id).is_some_and(|set| set.contains(&actor))
    }

    /// Combat: every participant on one side down, or the round cap
    /// (spec.md §4.7 "End conditions").
    pub fn check_combat_end(&self, event_id: EventId, hostile_side: &[ActorRef], hostiles_down: bool) -> Option<EndReason> {
        let state = self.events.get(&event_id)?;
        if hostiles_down && !hostile_side.is_empty() {
            return Some(EndReason::AllOnOneSideDown);
        }
        if state.round_number >= state.event_type.round_cap() {
            return Some(EndReason::RoundCapReached);
        }
        None
    }

    pub fn check_conversation_end(&self, event_id: EventId, all_farewell: bool, all_disengaged: bool) -> Option<EndReason> {
        let state = self.events.get(&event_id)?;
        if all_farewell {
            return Some(EndReason::AllFarewell);
        }
        if all_disengaged {
            return Some(EndReason::AllDisengaged);
        }
        if state.round_number >= state.event_type.round_cap() {
            return Some(EndReason::RoundCapReached);
        }
        None
    }

    pub fn check_exploration_end(&self, event_id: EventId, objective_satisfied: bool) -> Option<EndReason> {
        let state = self.events.get(&event_id)?;
        if objective_satisfied {
            return Some(EndReason::ObjectiveSatisfied);
        }
        if state.round_number >= state.event_type.round_cap() {
            return Some(EndReason::RoundCapReached);
        }
        None
    }

    /// End the event: clear held reactions and destroy the turn state
    /// (spec.md §4.7: "held reactions are cleared ... the turn state is
    /// destroyed"). Returns the participants a memory-journal entry
    /// should be emitted for.
    pub fn end_event(&self, event_id: EventId, region_id: RegionId, reason: EndReason) -> Option<(EndedEvent, Vec<ActorRef>)> {
        let (_, state) = self.events.remove(&event_id)?;
        self.region_index.remove(&region_id);
        self.left_region.remove(&event_id);
        let participants = state.initiative_order.iter().map(|e| e.actor_ref).collect();
        Some((EndedEvent { event_id, reason }, participants))
    }
}

trait AdvanceActor {
    fn advance_to_next_actor(&mut self);
}

impl AdvanceActor for TurnState {
    fn advance_to_next_actor(&mut self) {
        let Some(pos) = self.initiative_order.iter().position(|e| e.actor_ref == self.current_actor_ref) else {
            return;
        };
        let next_pos = (pos + 1) % self.initiative_order.len().max(1);
        if next_pos == 0 {
            self.round_number += 1;
        }
        self.current_turn += 1;
        self.turn_time_remaining_ms = self.turn_duration_limit_ms;
        if let Some(next) = self.initiative_order.get(next_pos) {
            self.current_actor_ref = next.actor_ref;
        }
    }
}

/// A deterministic pseudo-random draw seeded from the event id and actor
/// (spec.md §3 invariant: "ties broken by higher raw dex then by a
/// deterministic pseudo-random draw seeded from event_id").
pub(crate) fn tiebreak_draw(event_id: EventId, actor_ref: ActorRef) -> u64 {
    let mut hasher = DefaultHasher::new();
    event_id.hash(&mut hasher);
    actor_ref.hash(&mut hasher);
    hasher.finish()
}
