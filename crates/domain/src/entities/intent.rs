//! A unit of intended action authored by an actor (spec.md §3, "Intent").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::entities::action::{TargetKind, Verb};
use crate::entities::location::Location;
use crate::error::DomainError;
use crate::ids::{ActorRef, ConnectionId, IntentId, PlaceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    Player,
    Npc,
}

/// Who authored the intent: a human player, an autonomous NPC, or a
/// reaction fired by the witness engine on an NPC's behalf (spec.md §3,
/// "sourceOfAuthority").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceOfAuthority {
    Player,
    Npc,
    Reaction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    Pending,
    Validated,
    Resolving,
    Adjudicating,
    Applied,
    Perceived,
    Completed,
    Failed,
}

impl IntentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, IntentStatus::Completed | IntentStatus::Failed)
    }
}

/// A resolved or explicit target reference, one variant per `TargetKind`
/// (spec.md §4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TargetRef {
    Actor { actor_ref: ActorRef },
    Npc { actor_ref: ActorRef },
    Item { item_id: String },
    Tile { place_id: PlaceId, x: i32, y: i32 },
    Connection { connection_id: ConnectionId },
}

impl TargetRef {
    pub fn kind(&self) -> TargetKind {
        match self {
            TargetRef::Actor { .. } => TargetKind::Actor,
            TargetRef::Npc { .. } => TargetKind::Npc,
            TargetRef::Item { .. } => TargetKind::Item,
            TargetRef::Tile { .. } => TargetKind::Tile,
            TargetRef::Connection { .. } => TargetKind::Connection,
        }
    }
}

/// A unit of intended action (spec.md §3, "Intent"). Immutable except for
/// `status`/`stage`, enforced by keeping those fields private and exposing
/// only `mark_failed`, `set_stage`, and `can_proceed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub id: IntentId,
    pub actor_ref: ActorRef,
    pub actor_type: ActorType,
    pub verb: Verb,
    pub parameters: BTreeMap<String, serde_json::Value>,
    pub target_ref: Option<TargetRef>,
    pub actor_location: Location,
    status: IntentStatus,
    stage: String,
    pub source_of_authority: SourceOfAuthority,
    pub created_at: DateTime<Utc>,
    pub failure_reason: Option<String>,
}

impl Intent {
    pub fn status(&self) -> IntentStatus {
        self.status
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Advance to a new stage, recording the new `status` alongside it. Only
    /// called by the pipeline between stages; the caller is responsible for
    /// only ever moving forward.
    pub fn set_stage(&mut self, stage: impl Into<String>, status: IntentStatus) {
        self.stage = stage.into();
        self.status = status;
    }

    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.status = IntentStatus::Failed;
        self.failure_reason = Some(reason.into());
    }

    pub fn mark_completed(&mut self) {
        self.status = IntentStatus::Completed;
    }

    /// Whether this intent is still eligible to advance through the
    /// pipeline (spec.md §4.2, "canProceed").
    pub fn can_proceed(&self) -> bool {
        !self.status.is_terminal()
    }
}

/// Fills in the lifecycle fields and copies the actor/verb/parameters,
/// per spec.md §4.2: "Intent factory fills `{id = uuid, createdAt = now,
/// status = pending, stage = \"created\"}`".
pub struct IntentFactory;

impl IntentFactory {
    pub fn create(
        actor_ref: ActorRef,
        actor_type: ActorType,
        verb: Verb,
        parameters: BTreeMap<String, serde_json::Value>,
        actor_location: Location,
        source_of_authority: SourceOfAuthority,
        created_at: DateTime<Utc>,
    ) -> Intent {
        Intent {
            id: IntentId::new(),
            actor_ref,
            actor_type,
            verb,
            parameters,
            target_ref: None,
            actor_location,
            status: IntentStatus::Pending,
            stage: "created".to_string(),
            source_of_authority,
            created_at,
            failure_reason: None,
        }
    }
}

impl Intent {
    /// Verb-specific minimal-well-formedness check run by the pipeline's
    /// `validate` stage (spec.md §4.3).
    pub fn validate_parameters(&self) -> Result<(), DomainError> {
        match self.verb {
            Verb::Communicate => {
                if !self.parameters.contains_key("message") {
                    return Err(DomainError::validation("COMMUNICATE requires a message parameter"));
                }
                Ok(())
            }
            Verb::Give | Verb::Use | Verb::Equip | Verb::Unequip | Verb::Drop => {
                if !self.parameters.contains_key("item") && self.target_ref.is_none() {
                    return Err(DomainError::validation("verb requires an item or target"));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
