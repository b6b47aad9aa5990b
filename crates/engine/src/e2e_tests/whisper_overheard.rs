//! Scenario 3 (spec.md §8): a whisper at distance 1 is overheard by two
//! different NPCs at two different distances, wired through the real
//! Perception broadcast into the real Witness dispatch rather than a
//! hand-built `PerceptionEvent`.

use chrono::Utc;

use taleforge_domain::entities::{ActorType, Facing, HealthResource, Location, Personality, PerceptionType, Verb};
use taleforge_domain::ids::PlaceId;

use crate::perception::{self, BroadcastInput};
use crate::witness::{self, CommunicateContext, Reaction, WitnessState};

fn npc(place: PlaceId, x: i32, y: i32, personality: Option<Personality>) -> taleforge_domain::entities::EntityRecord {
    taleforge_domain::entities::EntityRecord {
        id: taleforge_domain::ids::ActorRef::new(),
        entity_type: ActorType::Npc,
        name: "npc".into(),
        location: Location::new(place, x, y),
        facing: Facing::South,
        health: HealthResource { current: 10, max: 10 },
        stats: Default::default(),
        tags: vec![],
        inventory: vec![],
        body_slots: Default::default(),
        personality,
        proficiencies: vec![],
        extra: Default::default(),
    }
}

#[test]
fn grenda_joins_mira_eavesdrops_and_distant_bystanders_ignore() {
    let place = PlaceId::new();
    let speaker = npc(place, 0, 0, None);

    // Very close: joins regardless of personality (spec.md §4.6, "very
    // close when distance <= 2").
    let grenda = npc(place, 1, 0, None);
    // Farther, but a shopkeeper with a professional stake in overheard
    // shop talk.
    let mira = npc(place, 3, 0, Some(Personality { profession: Some("shopkeeper".into()), curiosity: 3.0, ..Default::default() }));
    // Well outside the verb's own perception radius: never perceives the
    // whisper at all, let alone reacts to it.
    let bystander = npc(place, 20, 0, None);

    let input = BroadcastInput {
        actor: &speaker,
        event_type: PerceptionType::Communication,
        verb: Verb::Communicate,
        subtype: Some("whisper".to_string()),
        target_ref: Some(grenda.id),
        location: speaker.location,
        details: serde_json::json!({ "message": "meet me out back" }),
    };
    let observers = vec![grenda.clone(), mira.clone(), bystander.clone()];
    let events = perception::broadcast(&input, &observers, Utc::now());

    // The bystander at distance 20 is past every sense's range for
    // COMMUNICATE (max 10 tiles) and never gets an event at all.
    assert!(!events.iter().any(|e| e.observer_ref == bystander.id));
    assert!(events.iter().any(|e| e.observer_ref == grenda.id));
    assert!(events.iter().any(|e| e.observer_ref == mira.id));

    let state = WitnessState::new();
    let ctx = CommunicateContext {
        message: "meet me out back",
        is_whisper: true,
        is_shout: false,
        volume_range: 10.0,
        interest_keywords: &[],
    };

    let grenda_event = events.iter().find(|e| e.observer_ref == grenda.id).unwrap();
    let grenda_reaction = witness::react(&state, &grenda, grenda_event, Some(&ctx), Utc::now());
    assert!(matches!(grenda_reaction, Reaction::JoinConversation { .. }), "directly addressed at distance 1 must join, got {grenda_reaction:?}");

    let mira_event = events.iter().find(|e| e.observer_ref == mira.id).unwrap();
    let mira_reaction = witness::react(&state, &mira, mira_event, Some(&ctx), Utc::now());
    assert!(matches!(mira_reaction, Reaction::Eavesdrop), "shopkeeper overhearing shop talk at distance 3 must eavesdrop, got {mira_reaction:?}");
}
