//! Taleforge engine: the staged services that turn authored intents into
//! adjudicated, perceived, and reacted-to world state.
//!
//! ## Structure
//!
//! - `bus` - the Inbox/Outbox message bus
//! - `config` - environment-sourced `AppConfig`
//! - `error` - the aggregate `EngineError`
//! - `infrastructure` - storage port + in-memory adapter, clock/random ports
//! - `pipeline` - the Action Pipeline (spec.md §4.3)
//! - `target_resolution` - §4.4
//! - `perception` - Perception & Witness broadcast (§4.5)
//! - `witness` - reaction dispatch (§4.6)
//! - `turn_manager` - Turn Manager & Timed-Event State Machine (§4.7)
//! - `movement` - Unified Movement Engine (§4.8)
//! - `travel` - inter-place travel (§4.9)
//! - `rules` - adjudication & apply (§4.10)
//! - `working_memory` - per-verb relevance table
//! - `runtime` - the service loops that wire all of the above together
//! - `e2e_tests` - cross-module scenario tests for spec.md §8's
//!   end-to-end scenarios (test-only)

pub mod bus;
#[cfg(test)]
mod e2e_tests;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod movement;
pub mod perception;
pub mod pipeline;
pub mod rules;
pub mod runtime;
pub mod target_resolution;
pub mod travel;
pub mod turn_manager;
pub mod witness;
pub mod working_memory;

pub use config::AppConfig;
pub use error::{EngineError, EngineResult};
