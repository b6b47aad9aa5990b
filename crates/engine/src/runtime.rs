//! Service runtime (SPEC_FULL.md's added module; spec.md §5: "a set of
//! services ... poll the Outbox on bounded intervals"): one Tokio task
//! per service, wired against a shared `EngineState`, with graceful
//! shutdown on Ctrl+C — the same worker-spawning shape as the teacher's
//! `main.rs` (`tokio::spawn` per worker, `tokio::select!` to stop them).
//!
//! Rules adjudication and application run inline inside the Pipeline
//! task rather than as a separate poller: the built-in adjudicator never
//! requests a reroll, so there is no `ruling_k` round-trip for a
//! separate service to wait on (spec.md §4.3, "Iterative adjudication").
//! A host that plugs in a re-entrant adjudicator would give Rules/Applier
//! its own task polling `brokered_k` envelopes instead.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use taleforge_domain::entities::{Intent, PerceptionMemory};
use taleforge_domain::ids::ActorRef;
use taleforge_shared::SessionId;

use crate::bus::MessageBus;
use crate::config::AppConfig;
use crate::error::EngineError;
use crate::infrastructure::clock::{ClockPort, RandomPort};
use crate::infrastructure::storage::{PlaceEntityIndex, StoragePort, StoragePortExt};
use crate::movement::{MovementScheduler, MovementTickEvent};
use crate::pipeline::{self, CommunicateParams, PipelineOutcome, PipelineServices};
use crate::rules::Applier;
use crate::turn_manager::TurnManager;
use crate::witness::WitnessState;

/// Everything the service tasks share. Constructed once per running
/// process and handed out as `Arc` clones (spec.md §9, "Global state ...
/// each has an explicit init/teardown path").
pub struct EngineState {
    pub config: AppConfig,
    pub storage: Arc<dyn StoragePort>,
    pub bus: Arc<MessageBus>,
    pub place_index: Arc<PlaceEntityIndex>,
    pub applier: Arc<Applier>,
    pub witness: Arc<WitnessState>,
    pub memories: Arc<DashMap<ActorRef, PerceptionMemory>>,
    pub movement: Arc<MovementScheduler>,
    pub turns: Arc<TurnManager>,
    pub clock: Arc<dyn ClockPort>,
    pub random: Arc<dyn RandomPort>,
}

impl EngineState {
    pub fn new(config: AppConfig, storage: Arc<dyn StoragePort>, session_id: SessionId) -> Self {
        Self {
            bus: Arc::new(MessageBus::with_retry_budget(session_id, config.max_lock_retry_attempts)),
            storage,
            place_index: Arc::new(PlaceEntityIndex::new()),
            applier: Arc::new(Applier::new()),
            witness: Arc::new(WitnessState::new()),
            memories: Arc::new(DashMap::new()),
            movement: Arc::new(MovementScheduler::new()),
            turns: Arc::new(TurnManager::new()),
            clock: Arc::new(crate::infrastructure::clock::SystemClock),
            random: Arc::new(crate::infrastructure::clock::SystemRandom),
            config,
        }
    }

    fn pipeline_services(&self) -> PipelineServices<'_> {
        PipelineServices {
            slot: self.config.slot,
            session_id: self.bus.session_id(),
            storage: self.storage.as_ref(),
            bus: self.bus.as_ref(),
            place_index: self.place_index.as_ref(),
            applier: self.applier.as_ref(),
            witness: self.witness.as_ref(),
            memories: self.memories.as_ref(),
            random: self.random.as_ref(),
        }
    }
}

/// One submitted intent plus the whisper/shout parameters its
/// `COMMUNICATE` dispatch needs, if any (spec.md §4.6).
pub struct Submission {
    pub intent: Intent,
    pub is_whisper: bool,
    pub is_shout: bool,
    pub volume_range: f64,
}

/// Handles to every spawned service task, returned so `main` can await a
/// graceful shutdown.
pub struct ServiceHandles {
    pub pipeline: JoinHandle<()>,
    pub movement: JoinHandle<()>,
    pub turn_manager: JoinHandle<()>,
    pub witness_sweep: JoinHandle<()>,
}

impl ServiceHandles {
    pub fn abort_all(&self) {
        self.pipeline.abort();
        self.movement.abort();
        self.turn_manager.abort();
        self.witness_sweep.abort();
    }
}

/// Spawn the four service tasks against `state`, returning the submission
/// channel and the spawned handles (spec.md §5 "Concurrency model": one
/// task per service).
pub fn spawn_all(state: Arc<EngineState>) -> (mpsc::Sender<Submission>, ServiceHandles) {
    let (tx, rx) = mpsc::channel(256);

    let pipeline = tokio::spawn(pipeline_worker(state.clone(), rx));
    let movement = tokio::spawn(movement_ticker(state.clone()));
    let turn_manager = tokio::spawn(turn_manager_ticker(state.clone()));
    let witness_sweep = tokio::spawn(witness_sweep_loop(state));

    (tx, ServiceHandles { pipeline, movement, turn_manager, witness_sweep })
}

/// Run every submitted intent through the Action Pipeline in submission
/// order (spec.md §4.1, "single writer per outbox" — one task owns the
/// pipeline run loop, so no two intents race each other onto the bus).
async fn pipeline_worker(state: Arc<EngineState>, mut rx: mpsc::Receiver<Submission>) {
    while let Some(submission) = rx.recv().await {
        let communicate = if submission.intent.verb == taleforge_domain::entities::Verb::Communicate {
            Some(CommunicateParams {
                is_whisper: submission.is_whisper,
                is_shout: submission.is_shout,
                volume_range: submission.volume_range,
                interest_keywords: &[],
            })
        } else {
            None
        };
        let now = state.clock.now();
        let budget = std::time::Duration::from_millis(state.config.pipeline_stage_timeout_ms);
        let intent_id = submission.intent.id;
        let run = pipeline::run_pipeline(submission.intent, &state.pipeline_services(), communicate, now);
        let outcome: PipelineOutcome = match tokio::time::timeout(budget, run).await {
            Ok(outcome) => outcome,
            Err(_) => {
                let err = EngineError::Timeout;
                tracing::error!(%intent_id, kind = err.kind(), budget_ms = state.config.pipeline_stage_timeout_ms, "pipeline run exceeded its time budget");
                continue;
            }
        };

        if let Some(event_type) = outcome.trigger_event_type {
            maybe_start_timed_event(&state, &outcome.intent, event_type, now).await;
        }
        tracing::debug!(intent_id = %outcome.intent.id, status = ?outcome.intent.status(), diffs = outcome.diffs.len(), "pipeline run complete");
    }
}

const DEFAULT_DEX: i64 = 50;

/// Start (or join the existing) timed event for the intent's region, per
/// the Trigger detector (spec.md §4.7, "a completed adjudication ...
/// enters the trigger detector"). A region already running an event of
/// any kind re-uses it rather than starting a second one.
async fn maybe_start_timed_event(
    state: &Arc<EngineState>,
    intent: &taleforge_domain::entities::Intent,
    event_type: taleforge_domain::entities::EventType,
    now: chrono::DateTime<Utc>,
) {
    let Ok(place) = state.storage.load_place(state.config.slot, &intent.actor_location.place_id.to_string()).await else {
        return;
    };
    if state.turns.active_event_for_region(place.region_id).is_some() {
        return;
    }

    let mut participants = vec![intent.actor_ref];
    if let Some(target_ref) = target_actor_ref(intent) {
        if target_ref != intent.actor_ref {
            participants.push(target_ref);
        }
    }

    let mut rolls = Vec::with_capacity(participants.len());
    for actor_ref in participants {
        let dex = match state.storage.load_entity(state.config.slot, &actor_ref.to_string()).await {
            Ok(record) => record.stats.get("dex").copied().unwrap_or(DEFAULT_DEX),
            Err(_) => DEFAULT_DEX,
        };
        rolls.push((actor_ref, dex as i32));
    }

    let (event_id, order) = state.turns.start_event(event_type, place.region_id, &rolls, state.random.as_ref(), now);
    state.turns.enter_action_selection(event_id);
    tracing::debug!(?event_type, ?event_id, participants = order.len(), "timed event started");
}

fn target_actor_ref(intent: &taleforge_domain::entities::Intent) -> Option<ActorRef> {
    match &intent.target_ref {
        Some(taleforge_domain::entities::TargetRef::Actor { actor_ref } | taleforge_domain::entities::TargetRef::Npc { actor_ref }) => Some(*actor_ref),
        _ => None,
    }
}

/// Tick the movement scheduler for every currently-indexed place on the
/// configured interval (spec.md §4.8, "global tick").
async fn movement_ticker(state: Arc<EngineState>) {
    let mut interval = tokio::time::interval(std::time::Duration::from_millis(state.config.tick_interval_ms));
    loop {
        interval.tick().await;
        let now = state.clock.now();
        for place_id in state.place_index.place_ids() {
            let Ok(place) = state.storage.load_place(state.config.slot, &place_id).await else {
                continue;
            };
            for event in state.movement.tick(&place, now) {
                handle_movement_event(&state, &place_id, event, now).await;
            }
        }
    }
}

async fn handle_movement_event(state: &Arc<EngineState>, place_id: &str, event: MovementTickEvent, now: chrono::DateTime<Utc>) {
    match event {
        MovementTickEvent::Stepped { entity_ref, tile } | MovementTickEvent::Completed { entity_ref, tile } => {
            if let Ok(mut record) = state.storage.load_entity(state.config.slot, &entity_ref.to_string()).await {
                record.location.x = tile.0;
                record.location.y = tile.1;
                let _ = state.storage.save_entity(state.config.slot, &record).await;
            }
        }
        MovementTickEvent::Emit { entity_ref, tile } => {
            tracing::trace!(%entity_ref, place_id, ?tile, "movement emission tick");
        }
        MovementTickEvent::Blocked { entity_ref } => {
            tracing::debug!(%entity_ref, place_id, "movement blocked, path re-evaluation required");
        }
    }
    let _ = now;
}

/// Advance every running timed event's `ACTION_SELECTION` timer by the
/// poll interval (spec.md §4.7, "Turn timer").
async fn turn_manager_ticker(state: Arc<EngineState>) {
    let mut interval = tokio::time::interval(std::time::Duration::from_millis(state.config.service_poll_interval_ms));
    loop {
        interval.tick().await;
        for event_id in state.turns.active_event_ids() {
            if let Some(log) = state.turns.tick_action_selection(event_id, state.config.service_poll_interval_ms) {
                tracing::debug!(?log, "turn timer expired");
            }
        }
    }
}

/// Sweep conversation/engagement timeouts on the configured interval
/// (spec.md §4.6, "Periodic sweep").
async fn witness_sweep_loop(state: Arc<EngineState>) {
    let mut interval = tokio::time::interval(std::time::Duration::from_millis(state.config.engagement_sweep_interval_ms));
    loop {
        interval.tick().await;
        let now = state.clock.now();
        let result = state.witness.sweep(now);
        if !result.ended_conversations.is_empty() || !result.ended_engagements.is_empty() {
            tracing::debug!(
                ended_conversations = result.ended_conversations.len(),
                ended_engagements = result.ended_engagements.len(),
                "witness sweep"
            );
        }
    }
}
