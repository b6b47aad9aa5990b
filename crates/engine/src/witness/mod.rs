//! Witness / reaction engine (spec.md §4.6): given a `PerceptionEvent`
//! already delivered to an observer's memory, decide whether and how
//! that observer reacts.
//!
//! Dispatch is by verb: `COMMUNICATE` runs the social-interest scoring
//! and may join or eavesdrop on a conversation; `MOVE`/`USE` within close
//! range turn the observer to face the actor; every other verb gets the
//! same close-range facing reaction with a shorter range. A reaction is
//! skipped outright when the event was obscured, when the observer is
//! mid-timed-event with someone unrelated to the actor, or when the
//! per-NPC-per-command-type throttle is still active.

pub mod conversation;
pub mod engagement;
pub mod social_score;
pub mod throttle;

use chrono::{DateTime, Utc};

use taleforge_domain::entities::{EntityRecord, Facing, PerceptionEvent, Verb};
use taleforge_domain::value_objects::Clarity;

pub use conversation::{ConversationRegistry, ConversationState, EndReason, PreviousGoal};
pub use engagement::{Engagement, EngagementKind, EngagementPhase, EngagementTable};
pub use social_score::{classify, is_farewell, social_interest_score, SocialResponse, SocialScoreInput};
pub use throttle::ReactionThrottle;

const CLOSE_RANGE_TILES: f64 = 5.0;
const AMBIENT_RANGE_TILES: f64 = 3.0;
const FACE_SPEAKER_RESEND_DELAY_MS: i64 = 50;
/// An event is "directly addressed" when the observer is the explicit
/// target, or when it's this close regardless of targeting (spec.md
/// §4.6: "An event is directly addressed when targetRef == observer, or
/// 'very close' when distance <= 2").
const VERY_CLOSE_TILES: f64 = 2.0;

/// Shared state the witness engine consults/mutates while dispatching
/// reactions (spec.md §9: arena + side-channel, not a trait per verb).
#[derive(Default)]
pub struct WitnessState {
    pub conversations: ConversationRegistry,
    pub engagements: EngagementTable,
    pub throttle: ReactionThrottle,
}

impl WitnessState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Periodic sweep run alongside the Turn Manager's tick (spec.md
    /// §4.6): advances engagement idle state and ends timed-out
    /// conversations.
    pub fn sweep(&self, now: DateTime<Utc>) -> SweepResult {
        SweepResult {
            ended_conversations: self.conversations.sweep_timeouts(now),
            ended_engagements: self.engagements.sweep(now),
        }
    }
}

#[derive(Debug, Default)]
pub struct SweepResult {
    pub ended_conversations: Vec<taleforge_domain::ids::ActorRef>,
    pub ended_engagements: Vec<taleforge_domain::ids::ActorRef>,
}

/// Everything the COMMUNICATE dispatch needs beyond the perception event
/// itself (spec.md §4.6 "Social interest score" inputs).
pub struct CommunicateContext<'a> {
    pub message: &'a str,
    pub is_whisper: bool,
    pub is_shout: bool,
    pub volume_range: f64,
    pub interest_keywords: &'a [&'a str],
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reaction {
    /// Nothing observable happens.
    None,
    /// Turn to face the actor's tile.
    FaceActor { facing: Facing },
    /// Join the speaker's conversation, facing them; `resend_at_ms` is
    /// when the engine should re-issue the facing command bypassing the
    /// throttle (spec.md §9 Open Question 1).
    JoinConversation { facing: Facing, resend_at_ms: i64 },
    /// Listen in without joining as a participant.
    Eavesdrop,
    /// Too far/uninterested to join, but directly addressed or adjacent:
    /// still turns to face the speaker.
    FaceSpeaker { facing: Facing, resend_at_ms: i64 },
}

fn facing_toward(observer: &EntityRecord, actor_location: &taleforge_domain::entities::Location) -> Facing {
    let dx = actor_location.x - observer.location.x;
    let dy = actor_location.y - observer.location.y;
    Facing::from_delta(dx, dy).unwrap_or(observer.facing)
}

/// Whether `observer` is mid-timed-event with someone other than
/// `event`'s actor, in which case reactions to this event are skipped
/// (spec.md §4.6 "Skip conditions: timed event for an unrelated
/// participant").
fn is_busy_with_someone_else(state: &WitnessState, observer: &EntityRecord, event: &PerceptionEvent) -> bool {
    match state.conversations.get(observer.id) {
        Some(conv) => !conv.participants.contains(&event.actor_ref),
        None => false,
    }
}

/// Dispatch a reaction for one observer to one perception event (spec.md
/// §4.6). `communicate` is required only when `event.verb ==
/// Verb::Communicate`.
pub fn react(
    state: &WitnessState,
    observer: &EntityRecord,
    event: &PerceptionEvent,
    communicate: Option<&CommunicateContext<'_>>,
    now: DateTime<Utc>,
) -> Reaction {
    if event.actor_visibility == Clarity::Obscured {
        return Reaction::None;
    }
    if is_busy_with_someone_else(state, observer, event) {
        return Reaction::None;
    }

    match event.verb {
        Verb::Communicate => react_to_communicate(state, observer, event, communicate, now),
        Verb::Move | Verb::Use => react_with_range(state, observer, event, now, CLOSE_RANGE_TILES, event.verb.as_str()),
        other => react_with_range(state, observer, event, now, AMBIENT_RANGE_TILES, other.as_str()),
    }
}

fn react_with_range(state: &WitnessState, observer: &EntityRecord, event: &PerceptionEvent, now: DateTime<Utc>, range: f64, command_type: &'static str) -> Reaction {
    if event.distance > range {
        return Reaction::None;
    }
    if !state.throttle.allow(observer.id, command_type, now, false) {
        return Reaction::None;
    }
    state.throttle.record(observer.id, command_type, now);
    Reaction::FaceActor { facing: facing_toward(observer, &event.location) }
}

fn react_to_communicate(
    state: &WitnessState,
    observer: &EntityRecord,
    event: &PerceptionEvent,
    communicate: Option<&CommunicateContext<'_>>,
    now: DateTime<Utc>,
) -> Reaction {
    let command_type = Verb::Communicate.as_str();
    if !state.throttle.allow(observer.id, command_type, now, false) {
        return Reaction::None;
    }

    let Some(ctx) = communicate else {
        return Reaction::None;
    };

    let targeted = event.target_ref == Some(observer.id);
    let very_close = event.distance <= VERY_CLOSE_TILES;
    let facing = facing_toward(observer, &event.location);
    let resend_at_ms = now.timestamp_millis() + FACE_SPEAKER_RESEND_DELAY_MS;

    let input = SocialScoreInput {
        observer,
        speaker: event.actor_ref,
        message: ctx.message,
        distance: event.distance,
        volume_range: ctx.volume_range,
        directly_addressed: targeted,
        is_whisper: ctx.is_whisper,
        is_shout: ctx.is_shout,
        interest_keywords: ctx.interest_keywords,
    };
    state.throttle.record(observer.id, command_type, now);

    if is_farewell(ctx.message) {
        if let Some(conv) = state.conversations.get(event.actor_ref) {
            if conv.participants.contains(&observer.id) {
                state.conversations.leave_all(observer.id);
                state.engagements.end(observer.id);
                return Reaction::FaceSpeaker { facing, resend_at_ms };
            }
        }
    }

    // Directly addressed or close enough to be unmistakably spoken to:
    // always joins, regardless of the social-interest score (spec.md
    // §4.6, "if either, start or extend a conversation with the
    // speaker").
    if targeted || very_close {
        state.conversations.start_or_extend(event.actor_ref, observer.id, now, true, None);
        state.engagements.engage(observer.id, EngagementKind::Conversation, conversation::PARTICIPANT_ATTENTION_SPAN_MS, ctx.volume_range, now);
        return Reaction::JoinConversation { facing, resend_at_ms };
    }

    let score = social_interest_score(&input);
    match classify(score) {
        SocialResponse::Join => {
            state.conversations.start_or_extend(event.actor_ref, observer.id, now, true, None);
            state.engagements.engage(observer.id, EngagementKind::Conversation, conversation::PARTICIPANT_ATTENTION_SPAN_MS, ctx.volume_range, now);
            Reaction::JoinConversation { facing, resend_at_ms }
        }
        SocialResponse::Eavesdrop => {
            state.engagements.engage(observer.id, EngagementKind::Eavesdrop, conversation::BYSTANDER_ATTENTION_SPAN_MS, ctx.volume_range, now);
            Reaction::Eavesdrop
        }
        SocialResponse::Ignore => Reaction::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use taleforge_domain::entities::{ActorType, HealthResource, Location, Personality};
    use taleforge_domain::ids::{ActorRef, PerceptionEventId, PlaceId};
    use taleforge_domain::value_objects::Sense;

    fn entity(id: ActorRef, place: PlaceId, x: i32, y: i32, personality: Option<Personality>) -> EntityRecord {
        EntityRecord {
            id,
            entity_type: ActorType::Npc,
            name: "Observer".into(),
            location: Location::new(place, x, y),
            facing: Facing::South,
            health: HealthResource { current: 10, max: 10 },
            stats: BTreeMap::new(),
            tags: vec![],
            inventory: vec![],
            body_slots: BTreeMap::new(),
            personality,
            proficiencies: vec![],
            extra: BTreeMap::new(),
        }
    }

    fn communicate_event(actor: ActorRef, observer: ActorRef, place: PlaceId, distance: f64, clarity: Clarity) -> PerceptionEvent {
        PerceptionEvent {
            id: PerceptionEventId::new(),
            timestamp: Utc::now(),
            observer_ref: observer,
            event_type: taleforge_domain::entities::PerceptionType::Communication,
            actor_ref: actor,
            actor_type: taleforge_domain::entities::ActorTypeTag::Npc,
            actor_visibility: clarity,
            verb: Verb::Communicate,
            subtype: None,
            target_ref: None,
            location: Location::new(place, 0, 0),
            distance,
            senses: vec![Sense::Pressure],
            details: serde_json::json!({}),
            threat_level: 0,
            interest_level: 0,
            urgency: 0,
        }
    }

    #[test]
    fn obscured_event_never_produces_a_reaction() {
        let state = WitnessState::new();
        let place = PlaceId::new();
        let actor = ActorRef::new();
        let observer = entity(ActorRef::new(), place, 1, 0, Some(Personality { profession: Some("shopkeeper".into()), ..Default::default() }));
        let event = communicate_event(actor, observer.id, place, 1.0, Clarity::Obscured);
        let ctx = CommunicateContext { message: "hello", is_whisper: false, is_shout: false, volume_range: 10.0, interest_keywords: &[] };
        assert_eq!(react(&state, &observer, &event, Some(&ctx), Utc::now()), Reaction::None);
    }

    #[test]
    fn high_interest_communicate_joins_conversation() {
        let state = WitnessState::new();
        let place = PlaceId::new();
        let actor = ActorRef::new();
        let observer = entity(ActorRef::new(), place, 1, 0, Some(Personality { profession: Some("shopkeeper".into()), curiosity: 5.0, ..Default::default() }));
        let event = communicate_event(actor, observer.id, place, 1.0, Clarity::Clear);
        let ctx = CommunicateContext { message: "hello there", is_whisper: false, is_shout: false, volume_range: 10.0, interest_keywords: &[] };
        let reaction = react(&state, &observer, &event, Some(&ctx), Utc::now());
        assert!(matches!(reaction, Reaction::JoinConversation { .. }));
        assert!(state.conversations.is_in_conversation(observer.id));
    }

    #[test]
    fn throttle_blocks_a_second_reaction_within_window() {
        let state = WitnessState::new();
        let place = PlaceId::new();
        let actor = ActorRef::new();
        let observer = entity(ActorRef::new(), place, 1, 0, None);
        let event = communicate_event(actor, observer.id, place, 1.0, Clarity::Clear);
        let ctx = CommunicateContext { message: "hi", is_whisper: false, is_shout: false, volume_range: 10.0, interest_keywords: &[] };
        let now = Utc::now();
        react(&state, &observer, &event, Some(&ctx), now);
        let second = react(&state, &observer, &event, Some(&ctx), now + chrono::Duration::milliseconds(10));
        assert_eq!(second, Reaction::None);
    }

    #[test]
    fn move_within_close_range_faces_actor() {
        let state = WitnessState::new();
        let place = PlaceId::new();
        let actor = ActorRef::new();
        let observer = entity(ActorRef::new(), place, 2, 0, None);
        let mut event = communicate_event(actor, observer.id, place, 2.0, Clarity::Clear);
        event.verb = Verb::Move;
        event.location = Location::new(place, 0, 0);
        let reaction = react(&state, &observer, &event, None, Utc::now());
        assert!(matches!(reaction, Reaction::FaceActor { .. }));
    }

    #[test]
    fn move_beyond_close_range_does_not_react() {
        let state = WitnessState::new();
        let place = PlaceId::new();
        let actor = ActorRef::new();
        let observer = entity(ActorRef::new(), place, 50, 0, None);
        let mut event = communicate_event(actor, observer.id, place, 50.0, Clarity::Clear);
        event.verb = Verb::Move;
        event.location = Location::new(place, 0, 0);
        let reaction = react(&state, &observer, &event, None, Utc::now());
        assert_eq!(reaction, Reaction::None);
    }

    #[test]
    fn busy_with_unrelated_actor_skips_reaction() {
        let state = WitnessState::new();
        let place = PlaceId::new();
        let actor = ActorRef::new();
        let other = ActorRef::new();
        let observer = entity(ActorRef::new(), place, 1, 0, None);
        state.conversations.start_or_extend(other, observer.id, Utc::now(), true, None);

        let mut event = communicate_event(actor, observer.id, place, 1.0, Clarity::Clear);
        event.verb = Verb::Move;
        let reaction = react(&state, &observer, &event, None, Utc::now());
        assert_eq!(reaction, Reaction::None);
    }

    #[test]
    fn farewell_ends_conversation_for_participant() {
        let state = WitnessState::new();
        let place = PlaceId::new();
        let actor = ActorRef::new();
        let observer = entity(ActorRef::new(), place, 1, 0, Some(Personality::default()));
        state.conversations.start_or_extend(actor, observer.id, Utc::now(), true, None);

        let event = communicate_event(actor, observer.id, place, 1.0, Clarity::Clear);
        let ctx = CommunicateContext { message: "goodbye for now", is_whisper: false, is_shout: false, volume_range: 10.0, interest_keywords: &[] };
        let reaction = react(&state, &observer, &event, Some(&ctx), Utc::now());
        assert!(matches!(reaction, Reaction::FaceSpeaker { .. }));
        assert!(!state.conversations.is_in_conversation(observer.id));
    }
}
