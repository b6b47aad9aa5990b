//! Action Pipeline (spec.md §4.3): the staged processor that turns an
//! intent into (validated → resolved → adjudicated → applied → perceived)
//! outcomes, exchanging brokered/ruling/applied envelopes through the
//! Outbox as it goes.
//!
//! Stages run in order: `validate` → `resolveTarget` → `preBroadcast` →
//! `adjudicate` → `applyEffects` → `postBroadcast` → `reactions` →
//! `complete`. Each stage's typed `{ok, reason?, data}` result is modeled
//! here as `Result<T, StageFailure>` — the idiomatic Rust shape of the
//! same contract, since `StageFailure` already carries the `reason`.
//!
//! Re-entry: a stage may be retried from its own input as long as it has
//! had no observable side effect (`validate`, `resolveTarget`); once
//! `applyEffects` has run, diffs already stood and the intent runs to
//! completion even if a later stage errors (spec.md §4.3, §7).

mod stage;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use taleforge_domain::entities::{
    ActorType, EntityRecord, Intent, IntentStatus, PerceptionEvent, PerceptionMemory, PerceptionType, Verb,
};
use taleforge_domain::ids::{ActorRef, CorrelationId};
use taleforge_domain::ActionRegistry;

use taleforge_shared::{MessageEnvelope, SessionId};

use crate::bus::{Log, MessageBus};
use crate::infrastructure::clock::RandomPort;
use crate::infrastructure::storage::{PlaceEntityIndex, StoragePort, StoragePortExt};
use crate::perception::{self, BroadcastInput};
use crate::rules::{adjudicate, AppliedDiff, Applier};
use crate::target_resolution::{ResolvedTarget, TargetResolver};
use crate::turn_manager::detect_trigger;
use crate::witness::{self, CommunicateContext, Reaction, WitnessState};

pub use stage::StageFailure;

/// Everything a pipeline run needs to reach out to the rest of the
/// engine. Borrowed for the lifetime of one `run` call; none of it is
/// owned by the pipeline itself (spec.md §9, "Global state ... owned by
/// single service loops").
pub struct PipelineServices<'a> {
    pub slot: u32,
    pub session_id: SessionId,
    pub storage: &'a dyn StoragePort,
    pub bus: &'a MessageBus,
    pub place_index: &'a PlaceEntityIndex,
    pub applier: &'a Applier,
    pub witness: &'a WitnessState,
    pub memories: &'a DashMap<ActorRef, PerceptionMemory>,
    pub random: &'a dyn RandomPort,
}

/// What the `reactions` stage handed off to the Witness engine for one
/// observer (spec.md §4.3 "reactions (hand off to Witness)").
pub struct DispatchedReaction {
    pub observer_ref: ActorRef,
    pub reaction: Reaction,
}

/// The result of running one intent all the way through (or as far as it
/// got before failing).
pub struct PipelineOutcome {
    pub intent: Intent,
    pub diffs: Vec<AppliedDiff>,
    pub reactions: Vec<DispatchedReaction>,
    /// Set when this intent's adjudicated verb should hand off to the
    /// Turn Manager's trigger detector (spec.md §4.7, "Trigger"); the
    /// runtime decides whether to start or extend a timed event.
    pub trigger_event_type: Option<taleforge_domain::entities::EventType>,
}

/// Parameters the `COMMUNICATE` dispatch needs that don't live on the
/// intent's free-form `parameters` map in typed form (spec.md §4.6).
pub struct CommunicateParams<'a> {
    pub is_whisper: bool,
    pub is_shout: bool,
    pub volume_range: f64,
    pub interest_keywords: &'a [&'a str],
}

/// Run one intent through all eight stages (spec.md §4.3). Consumes the
/// intent and returns it with its final `status`/`stage` set, alongside
/// whatever diffs and reactions were produced before a failure (if any)
/// halted the run.
pub async fn run_pipeline(
    mut intent: Intent,
    services: &PipelineServices<'_>,
    communicate: Option<CommunicateParams<'_>>,
    now: DateTime<Utc>,
) -> PipelineOutcome {
    let correlation_id = CorrelationId::from(intent.id);

    // --- validate ---
    if let Err(failure) = stage::validate(&intent) {
        return fail(intent, services, correlation_id, failure, None, now).await;
    }
    intent.set_stage("validated", IntentStatus::Validated);

    let actor_record = match load_actor(&intent, services).await {
        Ok(record) => record,
        Err(failure) => return fail(intent, services, correlation_id, failure, None, now).await,
    };

    // --- resolveTarget ---
    let candidates = candidates_in_place(&actor_record, services).await;
    let resolved_target = match stage::resolve_target(&intent, &actor_record, &candidates) {
        Ok(resolved) => resolved,
        Err(failure) => return fail(intent, services, correlation_id, failure, Some(&actor_record), now).await,
    };
    if let Some(resolved) = &resolved_target {
        intent.target_ref = Some(resolved.target_ref.clone());
    }
    intent.set_stage("resolved", IntentStatus::Resolving);

    let observable = ActionRegistry::is_observable(intent.verb);

    // --- preBroadcast ---
    if observable {
        let pre_events = broadcast_and_deliver(
            &actor_record,
            PerceptionType::ActionStarted,
            intent.verb,
            None,
            resolved_target.as_ref().map(|r| actor_ref_of(r)).flatten(),
            intent.actor_location,
            serde_json::json!({ "verb": intent.verb.as_str() }),
            &candidates,
            services,
            now,
        );
        drop(pre_events);
    }

    // --- adjudicate ---
    intent.set_stage("brokered_1", IntentStatus::Adjudicating);
    let brokered = MessageEnvelope::new(
        "pipeline",
        format!("{} brokered for {}", intent.verb.as_str(), intent.actor_ref),
        "brokered_1",
        Some(correlation_id),
        serde_json::json!({ "verb": intent.verb.as_str(), "parameters": intent.parameters }),
        services.session_id,
    );
    if let Err(err) = services.bus.append(Log::Outbox, brokered).await {
        let failure = StageFailure::internal(err.to_string());
        return fail(intent, services, correlation_id, failure, Some(&actor_record), now).await;
    }

    let target_record = match &resolved_target {
        Some(resolved) => lookup_target_record(resolved, &candidates, &actor_record),
        None => None,
    };
    let outcome = adjudicate(&intent, target_record, services.random);

    // The built-in adjudicator never requests a reroll, so iteration 1 is
    // always the maximum for its correlation — this is the ruling the
    // applier is allowed to consume (spec.md §4.3, "Iterative
    // adjudication"). A host adjudicator that re-enters at
    // `brokered_{k+1}` would supersede this envelope by appending a later
    // `ruling_k` and marking this one `superseded` before `applyEffects`.
    let ruling = MessageEnvelope::new(
        "rules",
        outcome.event_lines.join("; "),
        "ruling_1",
        Some(correlation_id),
        serde_json::json!({ "final": true, "effect_lines": outcome.effect_lines }),
        services.session_id,
    );
    if let Err(err) = services.bus.append(Log::Outbox, ruling).await {
        let failure = StageFailure::internal(err.to_string());
        return fail(intent, services, correlation_id, failure, Some(&actor_record), now).await;
    }

    // --- applyEffects ---
    intent.set_stage("applied_1", IntentStatus::Applied);
    let mut diffs = Vec::new();
    for (index, line) in outcome.effect_lines.iter().enumerate() {
        let effect_id = format!("{}-{index}", intent.id);
        match services.applier.apply(services.slot, &effect_id, line, services.storage).await {
            Ok(Some(diff)) => diffs.push(diff),
            Ok(None) => {
                tracing::debug!(effect_id, "effect already applied, skipping");
            }
            Err(err) => {
                // Post-applyEffects errors are logged, not fatal: diffs
                // already applied stand and the intent still completes
                // (spec.md §7, "Propagation policy").
                tracing::warn!(effect_id, error = %err, "effect application failed");
            }
        }
    }
    let applied_envelope = MessageEnvelope::new(
        "applier",
        format!("{} diff(s) applied", diffs.len()),
        "applied_1",
        Some(correlation_id),
        serde_json::json!({ "diff_count": diffs.len() }),
        services.session_id,
    );
    let _ = services.bus.append(Log::Outbox, applied_envelope).await;

    // --- postBroadcast ---
    let mut post_events = Vec::new();
    if observable {
        post_events = broadcast_and_deliver(
            &actor_record,
            PerceptionType::ActionCompleted,
            intent.verb,
            None,
            resolved_target.as_ref().and_then(actor_ref_of),
            intent.actor_location,
            serde_json::json!({ "event_lines": outcome.event_lines, "success": true }),
            &candidates,
            services,
            now,
        );
    }
    intent.set_stage("perceived", IntentStatus::Perceived);

    // --- reactions ---
    let reactions = dispatch_reactions(&post_events, &candidates, services, communicate.as_ref(), now);

    // --- complete ---
    intent.mark_completed();

    PipelineOutcome {
        trigger_event_type: detect_trigger(intent.verb),
        intent,
        diffs,
        reactions,
    }
}

/// Common failure path for every stage (spec.md §4.3, §7): records the
/// reason on the intent, posts an Inbox failure message, and — if the
/// action had already become observable by the time it failed — emits a
/// failure perception event to nearby observers before halting.
async fn fail(
    mut intent: Intent,
    services: &PipelineServices<'_>,
    correlation_id: CorrelationId,
    failure: StageFailure,
    actor_record: Option<&EntityRecord>,
    now: DateTime<Utc>,
) -> PipelineOutcome {
    intent.mark_failed(failure.reason.clone());

    let inbox_message = MessageEnvelope::new(
        "pipeline",
        failure.user_sentence(),
        "failure",
        Some(correlation_id),
        serde_json::json!({ "kind": failure.kind, "reason": failure.reason }),
        services.session_id,
    );
    let _ = services.bus.append(Log::Inbox, inbox_message).await;

    if let Some(actor_record) = actor_record {
        if ActionRegistry::is_observable(intent.verb) {
            let candidates = candidates_in_place(actor_record, services).await;
            broadcast_and_deliver(
                actor_record,
                PerceptionType::ActionCompleted,
                intent.verb,
                None,
                None,
                intent.actor_location,
                serde_json::json!({ "success": false, "reason": failure.reason }),
                &candidates,
                services,
                now,
            );
        }
    }

    PipelineOutcome { intent, diffs: Vec::new(), reactions: Vec::new(), trigger_event_type: None }
}

async fn load_actor(intent: &Intent, services: &PipelineServices<'_>) -> Result<EntityRecord, StageFailure> {
    services
        .storage
        .load_entity(services.slot, &intent.actor_ref.to_string())
        .await
        .map_err(|err| StageFailure::not_found("actor", err.to_string()))
}

/// Everyone else currently indexed in the actor's place, loaded fresh so
/// target resolution and perception broadcast see current positions
/// (spec.md §4.4, §4.5).
async fn candidates_in_place(actor_record: &EntityRecord, services: &PipelineServices<'_>) -> Vec<EntityRecord> {
    let place_id = actor_record.location.place_id.to_string();
    let Some(entry) = services.place_index.get(&place_id) else {
        return Vec::new();
    };
    let mut candidates = Vec::new();
    for id in entry.npcs.iter().chain(entry.actors.iter()) {
        if *id == actor_record.id.to_string() {
            continue;
        }
        if let Ok(record) = services.storage.load_entity(services.slot, id).await {
            candidates.push(record);
        }
    }
    candidates
}

fn lookup_target_record<'a>(
    resolved: &ResolvedTarget,
    candidates: &'a [EntityRecord],
    actor_record: &'a EntityRecord,
) -> Option<&'a EntityRecord> {
    let target_actor_ref = actor_ref_of(resolved)?;
    if target_actor_ref == actor_record.id {
        return Some(actor_record);
    }
    candidates.iter().find(|c| c.id == target_actor_ref)
}

fn actor_ref_of(resolved: &ResolvedTarget) -> Option<ActorRef> {
    match &resolved.target_ref {
        taleforge_domain::entities::TargetRef::Actor { actor_ref } | taleforge_domain::entities::TargetRef::Npc { actor_ref } => Some(*actor_ref),
        _ => None,
    }
}

#[allow(clippy::too_many_arguments)]
fn broadcast_and_deliver(
    actor_record: &EntityRecord,
    event_type: PerceptionType,
    verb: Verb,
    subtype: Option<String>,
    target_ref: Option<ActorRef>,
    location: taleforge_domain::entities::Location,
    details: serde_json::Value,
    candidates: &[EntityRecord],
    services: &PipelineServices<'_>,
    now: DateTime<Utc>,
) -> Vec<PerceptionEvent> {
    let input = BroadcastInput { actor: actor_record, event_type, verb, subtype, target_ref, location, details };
    let events = perception::broadcast(&input, candidates, now);
    perception::deliver(events, services.memories, now)
}

/// Hand each `postBroadcast` event to the Witness engine (spec.md §4.3
/// "reactions (hand off to Witness)", §4.6).
fn dispatch_reactions(
    post_events: &[PerceptionEvent],
    candidates: &[EntityRecord],
    services: &PipelineServices<'_>,
    communicate: Option<&CommunicateParams<'_>>,
    now: DateTime<Utc>,
) -> Vec<DispatchedReaction> {
    let mut dispatched = Vec::new();
    for event in post_events {
        let Some(observer) = candidates.iter().find(|c| c.id == event.observer_ref) else {
            continue;
        };
        let ctx = communicate.map(|c| CommunicateContext {
            message: event.details.get("message").and_then(|v| v.as_str()).unwrap_or_default(),
            is_whisper: c.is_whisper,
            is_shout: c.is_shout,
            volume_range: c.volume_range,
            interest_keywords: c.interest_keywords,
        });
        let reaction = witness::react(services.witness, observer, event, ctx.as_ref(), now);
        if reaction != Reaction::None {
            dispatched.push(DispatchedReaction { observer_ref: observer.id, reaction });
        }
    }
    dispatched
}
