//! Scenario 5 (spec.md §8): a guard's opportunity attack is held against
//! a `MOVE` trigger and processed ahead of a lower-priority held reaction
//! in the same tick.

use chrono::Utc;

use taleforge_domain::entities::{EventType, HeldAction, TriggerCondition, TriggerType, Verb};
use taleforge_domain::ids::{ActorRef, RegionId};

use crate::infrastructure::clock::FixedRandom;
use crate::turn_manager::TurnManager;

#[test]
fn opportunity_attack_processes_before_a_ready_action_on_the_same_trigger() {
    let manager = TurnManager::new();
    let region = RegionId::new();
    let guard = ActorRef::new();
    let bystander = ActorRef::new();
    let hostile = ActorRef::new();

    let (event_id, _) = manager.start_event(
        EventType::Combat,
        region,
        &[(guard, 50), (bystander, 50), (hostile, 50)],
        &FixedRandom(10),
        Utc::now(),
    );

    manager.hold_action(
        event_id,
        HeldAction {
            actor_ref: guard,
            action: Verb::Attack,
            trigger: TriggerCondition { trigger_type: TriggerType::OpportunityAttack, condition: "moves".to_string() },
            held_since_turn: 1,
            expires_at_turn: None,
        },
    );
    manager.hold_action(
        event_id,
        HeldAction {
            actor_ref: bystander,
            action: Verb::Attack,
            trigger: TriggerCondition { trigger_type: TriggerType::ReadyAction, condition: "moves".to_string() },
            held_since_turn: 1,
            expires_at_turn: None,
        },
    );

    let triggered = manager.process_reactions(event_id, &format!("{hostile} moves away"), 1);

    assert_eq!(triggered.len(), 2);
    assert_eq!(triggered[0].actor_ref, guard, "priority 6 (opportunity attack) must be processed before priority 5 (ready action)");
    assert_eq!(triggered[0].trigger.trigger_type.priority(), 6);
    assert_eq!(triggered[1].actor_ref, bystander);
    assert_eq!(triggered[1].trigger.trigger_type.priority(), 5);

    // Processing drains both holders' reserves; a second identical event
    // triggers nothing more.
    let again = manager.process_reactions(event_id, &format!("{hostile} moves away"), 1);
    assert!(again.is_empty());
}

#[test]
fn an_expired_held_reaction_is_dropped_without_consuming_the_reserve() {
    let manager = TurnManager::new();
    let region = RegionId::new();
    let guard = ActorRef::new();
    let hostile = ActorRef::new();
    let (event_id, _) = manager.start_event(EventType::Combat, region, &[(guard, 50), (hostile, 50)], &FixedRandom(10), Utc::now());

    manager.hold_action(
        event_id,
        HeldAction {
            actor_ref: guard,
            action: Verb::Attack,
            trigger: TriggerCondition { trigger_type: TriggerType::OpportunityAttack, condition: "moves".to_string() },
            held_since_turn: 1,
            expires_at_turn: Some(2),
        },
    );

    let triggered = manager.process_reactions(event_id, &format!("{hostile} moves away"), 2);
    assert!(triggered.is_empty(), "a held action expiring at turn 2 must not fire when checked at turn 2");
}
