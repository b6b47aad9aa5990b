//! Scenario 1 + 4 chained (spec.md §8): an in-range `ATTACK` completes
//! through the pipeline, its trigger hands off to the Turn Manager, and
//! a combat event starts with initiative rolled and announced.

use chrono::Utc;

use taleforge_domain::entities::{EventType, IntentStatus, Phase};
use taleforge_domain::ids::RegionId;

use crate::e2e_tests::{attack_intent, entity};
use crate::pipeline::run_pipeline;
use crate::turn_manager::TurnManager;

use taleforge_domain::entities::ActorType;
use taleforge_domain::ids::PlaceId;

#[tokio::test]
async fn attack_in_range_triggers_and_starts_a_combat_event() {
    let harness = super::Harness::new(5);
    let place = PlaceId::new();
    let actor = entity(ActorType::Player, "Hero", place, 5, 5);
    let target = entity(ActorType::Npc, "Grenda", place, 5, 6);
    harness.seed(&actor).await;
    harness.seed(&target).await;

    let intent = attack_intent(&actor, "Grenda");
    let outcome = run_pipeline(intent, &harness.services(), None, Utc::now()).await;
    assert_eq!(outcome.intent.status(), IntentStatus::Completed);
    assert_eq!(outcome.trigger_event_type, Some(EventType::Combat));

    let manager = TurnManager::new();
    let region = RegionId::new();
    let (event_id, order) = manager.start_event(
        outcome.trigger_event_type.unwrap(),
        region,
        &[(actor.id, 60), (target.id, 40)],
        &harness.random,
        Utc::now(),
    );

    assert_eq!(order.len(), 2);
    assert_eq!(manager.get(event_id).unwrap().phase, Phase::TurnStart);
    assert_eq!(manager.get(event_id).unwrap().turn_duration_limit_ms, 60_000);
    assert_eq!(manager.active_event_for_region(region), Some(event_id));

    let log = manager.enter_action_selection(event_id).expect("phase advances");
    assert_eq!(log.to_phase, Phase::ActionSelection);
    assert_eq!(manager.get(event_id).unwrap().phase, Phase::ActionSelection);
}

#[tokio::test]
async fn attack_out_of_range_never_reaches_the_trigger_detector() {
    let harness = super::Harness::new(5);
    let place = PlaceId::new();
    let actor = entity(ActorType::Player, "Hero", place, 5, 5);
    let target = entity(ActorType::Npc, "Grenda", place, 5, 20);
    harness.seed(&actor).await;
    harness.seed(&target).await;

    let intent = attack_intent(&actor, "Grenda");
    let outcome = run_pipeline(intent, &harness.services(), None, Utc::now()).await;
    assert_eq!(outcome.intent.status(), IntentStatus::Failed);
    // A failed intent never reaches `adjudicate`, so it produces no
    // trigger for the Turn Manager to act on.
    assert_eq!(outcome.trigger_event_type, None);
}
