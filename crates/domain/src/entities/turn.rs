//! Timed-event state: turn order, phase machine, and held actions
//! (spec.md §3 "Turn state", §4.7 "Turn Manager & Timed-Event State Machine").

use serde::{Deserialize, Serialize};

use crate::entities::action::Verb;
use crate::ids::{ActorRef, EventId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Combat,
    Conversation,
    Exploration,
}

impl EventType {
    /// Round cap before the event force-ends (spec.md §4.7, "End conditions").
    pub fn round_cap(&self) -> u32 {
        match self {
            EventType::Combat => 20,
            EventType::Conversation => 10,
            EventType::Exploration => 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    TurnStart,
    ActionSelection,
    ActionResolution,
    TurnEnd,
    EventEndCheck,
    EventEnd,
}

impl Phase {
    /// The phase reached after this one completes normally, i.e. without
    /// the `EVENT_END_CHECK -> {TURN_START | EVENT_END}` branch (spec.md
    /// §4.7, "Phase machine").
    pub fn next(&self) -> Option<Phase> {
        match self {
            Phase::TurnStart => Some(Phase::ActionSelection),
            Phase::ActionSelection => Some(Phase::ActionResolution),
            Phase::ActionResolution => Some(Phase::TurnEnd),
            Phase::TurnEnd => Some(Phase::EventEndCheck),
            Phase::EventEndCheck => None,
            Phase::EventEnd => None,
        }
    }
}

/// One participant's initiative result, already totalled (spec.md §4.7,
/// "Initiative").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitiativeEntry {
    pub actor_ref: ActorRef,
    pub roll: i32,
    pub dex: i32,
    pub total: i32,
    /// Deterministic tie-break draw, seeded from the event id, used only
    /// when `roll + dex_bonus` and raw `dex` are both equal.
    pub tiebreak: u64,
}

/// Sort participants by `(total desc, dex desc, tiebreak desc)`, matching
/// spec.md §3's invariant: "sorted by (roll + dex_bonus) desc; ties broken
/// by higher raw dex then by a deterministic pseudo-random draw".
pub fn order_initiative(mut entries: Vec<InitiativeEntry>) -> Vec<InitiativeEntry> {
    entries.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then(b.dex.cmp(&a.dex))
            .then(b.tiebreak.cmp(&a.tiebreak))
    });
    entries
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    CounterSpell,
    Interrupt,
    Evade,
    DefendAlly,
    OpportunityAttack,
    ReadyAction,
    Warning,
}

impl TriggerType {
    /// Processing order for simultaneous reactions (spec.md §4.7,
    /// "Held actions & reactions"). Higher fires first.
    pub fn priority(&self) -> u8 {
        match self {
            TriggerType::CounterSpell => 10,
            TriggerType::Interrupt => 9,
            TriggerType::Evade => 8,
            TriggerType::DefendAlly => 7,
            TriggerType::OpportunityAttack => 6,
            TriggerType::ReadyAction => 5,
            TriggerType::Warning => 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerCondition {
    pub trigger_type: TriggerType,
    /// e.g. "moves within reach", matched loosely against event text by
    /// the turn manager (spec.md §8, scenario 5: event text includes `"moves"`).
    pub condition: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeldAction {
    pub actor_ref: ActorRef,
    pub action: Verb,
    pub trigger: TriggerCondition,
    pub held_since_turn: u32,
    pub expires_at_turn: Option<u32>,
}

impl HeldAction {
    pub fn is_expired(&self, current_turn: u32) -> bool {
        self.expires_at_turn.is_some_and(|expires_at| current_turn >= expires_at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnState {
    pub event_id: EventId,
    pub event_type: EventType,
    pub initiative_order: Vec<InitiativeEntry>,
    pub current_actor_ref: ActorRef,
    pub current_turn: u32,
    pub round_number: u32,
    pub phase: Phase,
    pub turn_time_remaining_ms: u64,
    pub turn_duration_limit_ms: u64,
    pub held_actions: Vec<HeldAction>,
}

impl TurnState {
    /// Held actions waiting on a trigger, ordered highest-priority first
    /// (spec.md §4.7: "processes reactions in descending priority").
    pub fn pending_reactions_by_priority(&self) -> Vec<&HeldAction> {
        let mut held: Vec<&HeldAction> = self.held_actions.iter().collect();
        held.sort_by(|a, b| b.trigger.trigger_type.priority().cmp(&a.trigger.trigger_type.priority()));
        held
    }

    pub fn advance_phase(&mut self) {
        if let Some(next) = self.phase.next() {
            self.phase = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(actor: ActorRef, total: i32, dex: i32, tiebreak: u64) -> InitiativeEntry {
        InitiativeEntry { actor_ref: actor, roll: total - dex / 10, dex, total, tiebreak }
    }

    #[test]
    fn initiative_orders_by_total_then_dex_then_tiebreak() {
        let a = ActorRef::new();
        let b = ActorRef::new();
        let c = ActorRef::new();
        let ordered = order_initiative(vec![
            entry(a, 15, 10, 1),
            entry(b, 18, 12, 2),
            entry(c, 15, 14, 9),
        ]);
        assert_eq!(ordered[0].actor_ref, b);
        assert_eq!(ordered[1].actor_ref, c);
        assert_eq!(ordered[2].actor_ref, a);
    }

    #[test]
    fn trigger_priorities_match_fixed_table() {
        assert_eq!(TriggerType::CounterSpell.priority(), 10);
        assert_eq!(TriggerType::Warning.priority(), 3);
        assert!(TriggerType::Interrupt.priority() > TriggerType::Evade.priority());
    }

    #[test]
    fn phase_chain_ends_at_event_end_check() {
        let mut phase = Phase::TurnStart;
        let mut steps = 0;
        while let Some(next) = phase.next() {
            phase = next;
            steps += 1;
            assert!(steps < 10, "phase chain should terminate quickly");
        }
        assert_eq!(phase, Phase::EventEndCheck);
    }

    #[test]
    fn held_action_expires_at_its_turn() {
        let held = HeldAction {
            actor_ref: ActorRef::new(),
            action: Verb::Guard,
            trigger: TriggerCondition {
                trigger_type: TriggerType::ReadyAction,
                condition: "any hostile approach".to_string(),
            },
            held_since_turn: 1,
            expires_at_turn: Some(3),
        };
        assert!(!held.is_expired(2));
        assert!(held.is_expired(3));
        assert!(held.is_expired(4));
    }

    #[test]
    fn round_caps_match_spec_end_conditions() {
        assert_eq!(EventType::Combat.round_cap(), 20);
        assert_eq!(EventType::Conversation.round_cap(), 10);
        assert_eq!(EventType::Exploration.round_cap(), 15);
    }
}
