//! The closed catalog of action verbs and their static properties
//! (spec.md §3, "Action definition"; §9 "Dynamic dispatch on verbs").
//!
//! The verb table is closed and small by design (spec.md §9): adding a
//! verb means adding a match arm here, never an open-ended registration
//! API.

use serde::{Deserialize, Serialize};

use crate::value_objects::Sense;

/// The closed set of action verbs the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Verb {
    Attack,
    Move,
    Communicate,
    Use,
    PickUp,
    Drop,
    Equip,
    Unequip,
    Give,
    Examine,
    Rest,
    Flee,
    Cast,
    Guard,
    Travel,
}

impl Verb {
    pub const ALL: [Verb; 15] = [
        Verb::Attack,
        Verb::Move,
        Verb::Communicate,
        Verb::Use,
        Verb::PickUp,
        Verb::Drop,
        Verb::Equip,
        Verb::Unequip,
        Verb::Give,
        Verb::Examine,
        Verb::Rest,
        Verb::Flee,
        Verb::Cast,
        Verb::Guard,
        Verb::Travel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Attack => "ATTACK",
            Verb::Move => "MOVE",
            Verb::Communicate => "COMMUNICATE",
            Verb::Use => "USE",
            Verb::PickUp => "PICK_UP",
            Verb::Drop => "DROP",
            Verb::Equip => "EQUIP",
            Verb::Unequip => "UNEQUIP",
            Verb::Give => "GIVE",
            Verb::Examine => "EXAMINE",
            Verb::Rest => "REST",
            Verb::Flee => "FLEE",
            Verb::Cast => "CAST",
            Verb::Guard => "GUARD",
            Verb::Travel => "TRAVEL",
        }
    }
}

/// What kind of entity a verb may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    Actor,
    Npc,
    Item,
    Tile,
    Connection,
    SelfOnly,
}

/// A single sense a verb broadcasts through, at what strength and range
/// (spec.md §3/§4.5, "sense_profiles").
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SenseBroadcast {
    pub sense: Sense,
    pub intensity: f32,
    pub range_tiles: f64,
}

/// How far and through which senses an action is perceptible at all
/// (spec.md §3, "perceptibility").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Perceptibility {
    pub radius: f64,
    pub visual: bool,
    pub auditory: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDefinition {
    pub verb: Verb,
    pub category: &'static str,
    pub default_cost: u32,
    pub perceptibility: Perceptibility,
    pub sense_profiles: Vec<SenseBroadcast>,
    pub proficiencies: Vec<&'static str>,
    pub valid_targets: Vec<TargetKind>,
    /// Euclidean max range for target validation (spec.md §4.4). `None`
    /// means the verb is untargeted or self-only.
    pub max_range_tiles: Option<f64>,
    /// Whether the verb permits a target in a connected place rather
    /// than only within the actor's own place (spec.md §4.4).
    pub allows_cross_place_target: bool,
}

impl ActionDefinition {
    pub fn is_valid_target(&self, kind: TargetKind) -> bool {
        self.valid_targets.contains(&kind)
    }

    pub fn max_sense_range(&self) -> f64 {
        self.sense_profiles
            .iter()
            .map(|s| s.range_tiles)
            .fold(self.perceptibility.radius, f64::max)
    }

    pub fn is_observable(&self) -> bool {
        self.perceptibility.radius > 0.0 && (self.perceptibility.visual || self.perceptibility.auditory)
    }
}
