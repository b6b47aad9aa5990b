//! Initiative rolling (spec.md §4.7, "Initiative": "d20 + floor((dex-50)/10),
//! sorted desc; ties broken by higher raw dex then by a deterministic
//! pseudo-random draw seeded from event_id").

use taleforge_domain::entities::{order_initiative, InitiativeEntry};
use taleforge_domain::ids::{ActorRef, EventId};

use crate::infrastructure::clock::RandomPort;

use super::tiebreak_draw;

pub fn dex_bonus(dex: i32) -> i32 {
    (dex - 50).div_euclid(10)
}

/// Roll and order initiative for a batch of participants.
pub fn roll_initiative_with(event_id: EventId, participants: &[(ActorRef, i32)], random: &dyn RandomPort) -> Vec<InitiativeEntry> {
    let entries = participants
        .iter()
        .map(|&(actor_ref, dex)| {
            let roll = random.roll_d20();
            let total = roll + dex_bonus(dex);
            InitiativeEntry { actor_ref, roll, dex, total, tiebreak: tiebreak_draw(event_id, actor_ref) }
        })
        .collect();
    order_initiative(entries)
}

/// Convenience wrapper using the system dice source (spec.md §9, "global
/// state has an explicit init path" — callers needing determinism should
/// use [`roll_initiative_with`] with a fixed `RandomPort` instead).
pub fn roll_initiative(event_id: EventId, participants: &[(ActorRef, i32)]) -> Vec<InitiativeEntry> {
    roll_initiative_with(event_id, participants, &crate::infrastructure::clock::SystemRandom)
}
