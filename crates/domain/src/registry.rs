//! The Action Registry: immutable lookup of `ActionDefinition` by verb
//! (spec.md §4.2). The verb table is closed and small (spec.md §9,
//! "Dynamic dispatch on verbs") — it is a static match, never an
//! open-registration API.

use once_cell::sync::Lazy;
use std::collections::BTreeMap;

use crate::entities::action::{ActionDefinition, Perceptibility, SenseBroadcast, TargetKind, Verb};
use crate::value_objects::Sense;

fn def(
    verb: Verb,
    category: &'static str,
    default_cost: u32,
    radius: f64,
    visual: bool,
    auditory: bool,
    sense_profiles: Vec<SenseBroadcast>,
    proficiencies: Vec<&'static str>,
    valid_targets: Vec<TargetKind>,
    max_range_tiles: Option<f64>,
    allows_cross_place_target: bool,
) -> ActionDefinition {
    ActionDefinition {
        verb,
        category,
        default_cost,
        perceptibility: Perceptibility { radius, visual, auditory },
        sense_profiles,
        proficiencies,
        valid_targets,
        max_range_tiles,
        allows_cross_place_target,
    }
}

static TABLE: Lazy<BTreeMap<Verb, ActionDefinition>> = Lazy::new(|| {
    use TargetKind::*;
    let mut m = BTreeMap::new();
    m.insert(
        Verb::Attack,
        def(
            Verb::Attack,
            "combat",
            1,
            8.0,
            true,
            true,
            vec![
                SenseBroadcast { sense: Sense::Light, intensity: 0.9, range_tiles: 8.0 },
                SenseBroadcast { sense: Sense::Pressure, intensity: 0.8, range_tiles: 10.0 },
            ],
            vec!["melee", "ranged"],
            vec![Actor, Npc],
            Some(1.0),
            false,
        ),
    );
    m.insert(
        Verb::Move,
        def(
            Verb::Move,
            "movement",
            1,
            10.0,
            true,
            true,
            vec![
                SenseBroadcast { sense: Sense::Light, intensity: 0.5, range_tiles: 10.0 },
                SenseBroadcast { sense: Sense::Pressure, intensity: 0.3, range_tiles: 6.0 },
            ],
            vec![],
            vec![Tile],
            None,
            false,
        ),
    );
    m.insert(
        Verb::Communicate,
        def(
            Verb::Communicate,
            "social",
            0,
            10.0,
            true,
            true,
            vec![SenseBroadcast { sense: Sense::Pressure, intensity: 0.9, range_tiles: 10.0 }],
            vec![],
            vec![Actor, Npc, SelfOnly],
            Some(10.0),
            false,
        ),
    );
    m.insert(
        Verb::Use,
        def(
            Verb::Use,
            "interaction",
            1,
            6.0,
            true,
            false,
            vec![SenseBroadcast { sense: Sense::Light, intensity: 0.4, range_tiles: 6.0 }],
            vec![],
            vec![Item, Tile],
            Some(2.0),
            false,
        ),
    );
    m.insert(
        Verb::PickUp,
        def(
            Verb::PickUp,
            "interaction",
            1,
            4.0,
            true,
            false,
            vec![SenseBroadcast { sense: Sense::Light, intensity: 0.3, range_tiles: 4.0 }],
            vec![],
            vec![Item],
            Some(1.5),
            false,
        ),
    );
    m.insert(
        Verb::Drop,
        def(
            Verb::Drop,
            "interaction",
            1,
            4.0,
            true,
            false,
            vec![SenseBroadcast { sense: Sense::Light, intensity: 0.3, range_tiles: 4.0 }],
            vec![],
            vec![Item, SelfOnly],
            None,
            false,
        ),
    );
    m.insert(
        Verb::Equip,
        def(
            Verb::Equip,
            "interaction",
            1,
            3.0,
            true,
            false,
            vec![SenseBroadcast { sense: Sense::Light, intensity: 0.2, range_tiles: 3.0 }],
            vec![],
            vec![Item, SelfOnly],
            None,
            false,
        ),
    );
    m.insert(
        Verb::Unequip,
        def(
            Verb::Unequip,
            "interaction",
            1,
            3.0,
            true,
            false,
            vec![SenseBroadcast { sense: Sense::Light, intensity: 0.2, range_tiles: 3.0 }],
            vec![],
            vec![Item, SelfOnly],
            None,
            false,
        ),
    );
    m.insert(
        Verb::Give,
        def(
            Verb::Give,
            "social",
            1,
            5.0,
            true,
            false,
            vec![SenseBroadcast { sense: Sense::Light, intensity: 0.4, range_tiles: 5.0 }],
            vec![],
            vec![Actor, Npc],
            Some(2.0),
            false,
        ),
    );
    m.insert(
        Verb::Examine,
        def(
            Verb::Examine,
            "perception",
            0,
            0.0,
            false,
            false,
            vec![],
            vec![],
            vec![Actor, Npc, Item, Tile, SelfOnly],
            Some(10.0),
            false,
        ),
    );
    m.insert(
        Verb::Rest,
        def(
            Verb::Rest,
            "recovery",
            1,
            3.0,
            true,
            false,
            vec![SenseBroadcast { sense: Sense::Light, intensity: 0.1, range_tiles: 3.0 }],
            vec![],
            vec![SelfOnly],
            None,
            false,
        ),
    );
    m.insert(
        Verb::Flee,
        def(
            Verb::Flee,
            "movement",
            1,
            10.0,
            true,
            true,
            vec![
                SenseBroadcast { sense: Sense::Light, intensity: 0.7, range_tiles: 10.0 },
                SenseBroadcast { sense: Sense::Pressure, intensity: 0.6, range_tiles: 8.0 },
            ],
            vec![],
            vec![Tile, SelfOnly],
            None,
            false,
        ),
    );
    m.insert(
        Verb::Cast,
        def(
            Verb::Cast,
            "combat",
            2,
            12.0,
            true,
            true,
            vec![
                SenseBroadcast { sense: Sense::Light, intensity: 0.6, range_tiles: 10.0 },
                SenseBroadcast { sense: Sense::Thaumic, intensity: 0.9, range_tiles: 15.0 },
            ],
            vec!["arcane"],
            vec![Actor, Npc, Tile, SelfOnly],
            Some(8.0),
            false,
        ),
    );
    m.insert(
        Verb::Guard,
        def(
            Verb::Guard,
            "combat",
            1,
            6.0,
            true,
            false,
            vec![SenseBroadcast { sense: Sense::Light, intensity: 0.3, range_tiles: 6.0 }],
            vec![],
            vec![SelfOnly],
            None,
            false,
        ),
    );
    m.insert(
        Verb::Travel,
        def(
            Verb::Travel,
            "movement",
            1,
            0.0,
            false,
            false,
            vec![],
            vec![],
            vec![Connection],
            None,
            true,
        ),
    );
    m
});

/// Immutable lookup of `ActionDefinition` by verb (spec.md §4.2).
pub struct ActionRegistry;

impl ActionRegistry {
    pub fn get(verb: Verb) -> &'static ActionDefinition {
        TABLE.get(&verb).expect("every Verb variant has a registry entry")
    }

    pub fn is_valid_target(verb: Verb, target_type: TargetKind) -> bool {
        Self::get(verb).is_valid_target(target_type)
    }

    pub fn default_cost(verb: Verb) -> u32 {
        Self::get(verb).default_cost
    }

    pub fn perception_radius(verb: Verb) -> f64 {
        Self::get(verb).perceptibility.radius
    }

    pub fn is_observable(verb: Verb) -> bool {
        Self::get(verb).is_observable()
    }

    pub fn max_range(verb: Verb) -> Option<f64> {
        Self::get(verb).max_range_tiles
    }

    pub fn allows_cross_place_target(verb: Verb) -> bool {
        Self::get(verb).allows_cross_place_target
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_verb_has_a_registry_entry() {
        for verb in Verb::ALL {
            let def = ActionRegistry::get(verb);
            assert_eq!(def.verb, verb);
        }
    }

    #[test]
    fn attack_targets_actors_and_npcs_only() {
        assert!(ActionRegistry::is_valid_target(Verb::Attack, TargetKind::Npc));
        assert!(!ActionRegistry::is_valid_target(Verb::Attack, TargetKind::Item));
    }

    #[test]
    fn travel_allows_cross_place_targeting() {
        assert!(ActionRegistry::allows_cross_place_target(Verb::Travel));
        assert!(!ActionRegistry::allows_cross_place_target(Verb::Attack));
    }

    #[test]
    fn examine_has_no_perception_radius() {
        assert!(!ActionRegistry::is_observable(Verb::Examine));
    }
}
