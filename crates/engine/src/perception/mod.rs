//! Perception & Senses broadcast (spec.md §4.5): for every candidate
//! observer, compute whether an action is detectable, through which
//! senses, with what clarity, and append the resulting `PerceptionEvent`
//! to that observer's memory.

use chrono::{DateTime, Utc};
use taleforge_domain::entities::{
    ActorTypeTag, EntityRecord, Location, PerceptionEvent, PerceptionMemory, PerceptionType, Verb,
};
use taleforge_domain::ids::{ActorRef, PerceptionEventId};
use taleforge_domain::value_objects::{clarity_from_ratio, Clarity, Sense};
use taleforge_domain::ActionRegistry;

mod scoring;
pub use scoring::base_scores;

/// What the broadcaster was told happened; carried through to every
/// resulting `PerceptionEvent` (spec.md §3 "Perception event").
pub struct BroadcastInput<'a> {
    pub actor: &'a EntityRecord,
    pub event_type: PerceptionType,
    pub verb: Verb,
    pub subtype: Option<String>,
    pub target_ref: Option<ActorRef>,
    pub location: Location,
    pub details: serde_json::Value,
}

/// Enumerate every observer within `max radius across senses` of the
/// actor's location in the same place, run the gate sequence, and produce
/// a `PerceptionEvent` for each that perceives something (spec.md §4.5
/// "Broadcast").
pub fn broadcast(input: &BroadcastInput<'_>, observers: &[EntityRecord], now: DateTime<Utc>) -> Vec<PerceptionEvent> {
    let definition = ActionRegistry::get(input.verb);
    let mut events = Vec::new();

    for observer in observers {
        if observer.id == input.actor.id {
            continue;
        }
        if !observer.location.same_place(&input.location) {
            continue;
        }
        let distance = observer.location.distance_to(&input.location);
        let bearing = bearing_degrees(&observer.location, &input.location);

        let Some(gated) = best_gated_sense(definition, observer, distance, bearing) else {
            continue;
        };

        let ratio = distance / gated.effective_range.max(f64::EPSILON);
        let has_visual = gated.sense == Sense::Light;
        let auditory_only = !has_visual;
        let clarity = clarity_from_ratio(ratio, has_visual, auditory_only);
        if clarity == Clarity::NotPerceived {
            continue;
        }

        let senses = all_passing_senses(definition, observer, distance, bearing);
        let (threat, interest, urgency) = scoring::score(input.verb, distance, clarity);

        events.push(PerceptionEvent {
            id: PerceptionEventId::new(),
            timestamp: now,
            observer_ref: observer.id,
            event_type: input.event_type,
            actor_ref: input.actor.id,
            actor_type: to_actor_type_tag(input.actor),
            actor_visibility: clarity,
            verb: input.verb,
            subtype: input.subtype.clone(),
            target_ref: input.target_ref,
            location: input.location,
            distance,
            senses,
            details: input.details.clone(),
            threat_level: threat,
            interest_level: interest,
            urgency,
        });
    }

    events
}

/// Append every event to its observer's memory (spec.md §4.5 "Perception
/// memory"), returning the events for callers that also need to post them
/// to the Inbox/Witness layer.
pub fn deliver(events: Vec<PerceptionEvent>, memories: &dashmap::DashMap<ActorRef, PerceptionMemory>, now: DateTime<Utc>) -> Vec<PerceptionEvent> {
    for event in &events {
        memories.entry(event.observer_ref).or_default().add(event.clone(), now);
    }
    events
}

fn to_actor_type_tag(actor: &EntityRecord) -> ActorTypeTag {
    match actor.entity_type {
        taleforge_domain::entities::ActorType::Player => ActorTypeTag::Player,
        taleforge_domain::entities::ActorType::Npc => ActorTypeTag::Npc,
    }
}

struct GatedSense {
    sense: Sense,
    effective_range: f64,
}

/// Angle from `observer` to `target`, in the same 0=East/clockwise
/// convention as `Facing::angle_degrees` (spec.md §4.5 "Vision cone
/// gate": `angle_to_target`). Shared with target resolution's own
/// visibility gate (spec.md §4.4).
pub(crate) fn bearing_degrees(observer: &Location, target: &Location) -> f64 {
    let dx = (target.x - observer.x) as f64;
    let dy = (target.y - observer.y) as f64;
    dy.atan2(dx).to_degrees().rem_euclid(360.0)
}

fn sense_gate_passes(sense: Sense, observer: &EntityRecord, distance: f64, bearing: f64) -> bool {
    if sense != Sense::Light {
        return true;
    }
    let vision = observer.vision_cone();
    vision.gate(observer.facing.angle_degrees(), bearing, distance)
}

/// The best candidate sense for one observer: highest intensity among
/// senses whose range covers the distance AND whose directional gate
/// passes (spec.md §4.5 "the best candidate sense per observer is picked
/// by highest intensity"; ties broken by canonical order per §9 Open
/// Questions).
fn best_gated_sense(
    definition: &taleforge_domain::entities::ActionDefinition,
    observer: &EntityRecord,
    distance: f64,
    bearing: f64,
) -> Option<GatedSense> {
    let mut best: Option<(f32, GatedSense)> = None;
    for profile in &definition.sense_profiles {
        let Some(effective_range) = effective_range_for(profile.sense, profile.range_tiles, observer) else {
            continue;
        };
        if distance > effective_range {
            continue;
        }
        if !sense_gate_passes(profile.sense, observer, distance, bearing) {
            continue;
        }
        let better = match &best {
            None => true,
            Some((best_intensity, best_gated)) => {
                profile.intensity > *best_intensity
                    || (profile.intensity == *best_intensity && profile.sense.rank() < best_gated.sense.rank())
            }
        };
        if better {
            best = Some((profile.intensity, GatedSense { sense: profile.sense, effective_range }));
        }
    }
    best.map(|(_, gated)| gated)
}

fn all_passing_senses(
    definition: &taleforge_domain::entities::ActionDefinition,
    observer: &EntityRecord,
    distance: f64,
    bearing: f64,
) -> Vec<Sense> {
    let mut senses: Vec<Sense> = definition
        .sense_profiles
        .iter()
        .filter_map(|profile| {
            let effective_range = effective_range_for(profile.sense, profile.range_tiles, observer)?;
            if distance > effective_range {
                return None;
            }
            if !sense_gate_passes(profile.sense, observer, distance, bearing) {
                return None;
            }
            Some(profile.sense)
        })
        .collect();
    senses.sort_by_key(|s| s.rank());
    senses.dedup();
    senses
}

/// Hearing is capped at `0.6 x vision_range_tiles` for the same entity
/// (spec.md §4.5 "Hearing"). Aroma and thaumic use their profile range
/// uncapped (short-range omnidirectional / penetrates walls).
fn effective_range_for(sense: Sense, profile_range: f64, observer: &EntityRecord) -> Option<f64> {
    match sense {
        Sense::Light => Some(profile_range.min(observer.vision_cone().range_tiles)),
        Sense::Pressure => Some(profile_range.min(observer.vision_cone().hearing_range())),
        Sense::Aroma | Sense::Thaumic => Some(profile_range),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use taleforge_domain::entities::{ActorType, Facing, HealthResource};
    use taleforge_domain::ids::PlaceId;

    fn entity(place: PlaceId, x: i32, y: i32, tags: Vec<&str>) -> EntityRecord {
        EntityRecord {
            id: ActorRef::new(),
            entity_type: ActorType::Npc,
            name: "Witness".into(),
            location: Location::new(place, x, y),
            facing: Facing::South,
            health: HealthResource { current: 10, max: 10 },
            stats: BTreeMap::new(),
            tags: tags.into_iter().map(String::from).collect(),
            inventory: vec![],
            body_slots: BTreeMap::new(),
            personality: None,
            proficiencies: vec![],
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn observer_within_radius_perceives_attack() {
        let place = PlaceId::new();
        let actor = entity(place, 5, 5, vec![]);
        let observer = entity(place, 5, 6, vec![]);
        let input = BroadcastInput {
            actor: &actor,
            event_type: PerceptionType::ActionStarted,
            verb: Verb::Attack,
            subtype: None,
            target_ref: None,
            location: actor.location,
            details: serde_json::json!({}),
        };
        let events = broadcast(&input, &[observer.clone()], Utc::now());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].observer_ref, observer.id);
    }

    #[test]
    fn observer_beyond_every_sense_range_does_not_perceive() {
        let place = PlaceId::new();
        let actor = entity(place, 0, 0, vec![]);
        let observer = entity(place, 0, 100, vec![]);
        let input = BroadcastInput {
            actor: &actor,
            event_type: PerceptionType::ActionStarted,
            verb: Verb::Attack,
            subtype: None,
            target_ref: None,
            location: actor.location,
            details: serde_json::json!({}),
        };
        let events = broadcast(&input, &[observer], Utc::now());
        assert!(events.is_empty());
    }

    #[test]
    fn self_is_never_its_own_observer() {
        let place = PlaceId::new();
        let actor = entity(place, 0, 0, vec![]);
        let input = BroadcastInput {
            actor: &actor,
            event_type: PerceptionType::Movement,
            verb: Verb::Move,
            subtype: None,
            target_ref: None,
            location: actor.location,
            details: serde_json::json!({}),
        };
        let events = broadcast(&input, std::slice::from_ref(&actor), Utc::now());
        assert!(events.is_empty());
    }

    #[test]
    fn different_place_observer_is_excluded() {
        let actor = entity(PlaceId::new(), 0, 0, vec![]);
        let observer = entity(PlaceId::new(), 0, 1, vec![]);
        let input = BroadcastInput {
            actor: &actor,
            event_type: PerceptionType::ActionStarted,
            verb: Verb::Attack,
            subtype: None,
            target_ref: None,
            location: actor.location,
            details: serde_json::json!({}),
        };
        let events = broadcast(&input, &[observer], Utc::now());
        assert!(events.is_empty());
    }
}
