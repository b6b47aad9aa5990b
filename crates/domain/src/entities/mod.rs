pub mod action;
pub mod intent;
pub mod location;
pub mod movement;
pub mod perception;
pub mod place;
pub mod record;
pub mod turn;

pub use action::{ActionDefinition, Perceptibility, SenseBroadcast, TargetKind, Verb};
pub use intent::{ActorType, Intent, IntentFactory, IntentStatus, SourceOfAuthority, TargetRef};
pub use location::{Facing, Location};
pub use movement::{MovementEntityType, MovementState, MovementSubtype, PathColor};
pub use perception::{clamp_score, ActorTypeTag, PerceptionEvent, PerceptionMemory, PerceptionQuery, PerceptionType};
pub use place::{Connection, Direction, Feature, Place, PlaceContents, TileGrid};
pub use record::{EntityRecord, HealthResource, InventoryItem, Personality};
pub use turn::{
    EventType, HeldAction, InitiativeEntry, Phase, TriggerCondition, TriggerType, TurnState,
    order_initiative,
};
