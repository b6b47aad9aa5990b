//! Adjudication (spec.md §4.10): turns a validated, target-resolved
//! intent into `event_lines` (human-readable) and `effect_lines`
//! (`SYSTEM.<OP>(...)` records) for the applier to consume.
//!
//! The external rules machine itself is deliberately out of scope (spec.md
//! §1); this is the thin in-core adjudicator the pipeline can run without
//! a host collaborator, covering the ops the applier understands.

use std::collections::BTreeMap;

use taleforge_domain::entities::{ActorType, EntityRecord, Intent, TargetRef, Verb};
use taleforge_shared::effects::{EffectLine, EffectValue};

use crate::infrastructure::clock::RandomPort;

pub struct AdjudicationOutcome {
    pub event_lines: Vec<String>,
    pub effect_lines: Vec<EffectLine>,
}

fn wire_ref(entity_type: ActorType, actor_ref: taleforge_domain::ids::ActorRef) -> String {
    match entity_type {
        ActorType::Player => format!("actor.{actor_ref}"),
        ActorType::Npc => format!("npc.{actor_ref}"),
    }
}

fn target_wire_ref(target_ref: &TargetRef) -> Option<String> {
    match target_ref {
        TargetRef::Actor { actor_ref } => Some(format!("actor.{actor_ref}")),
        TargetRef::Npc { actor_ref } => Some(format!("npc.{actor_ref}")),
        _ => None,
    }
}

fn damage_line(target: String, mag: f64) -> EffectLine {
    let mut args = BTreeMap::new();
    args.insert("target".to_string(), EffectValue::Identifier(target));
    args.insert("mag".to_string(), EffectValue::Number(mag));
    EffectLine { op: "APPLY_DAMAGE".to_string(), args }
}

fn heal_line(target: String, mag: f64) -> EffectLine {
    let mut args = BTreeMap::new();
    args.insert("target".to_string(), EffectValue::Identifier(target));
    args.insert("mag".to_string(), EffectValue::Number(mag));
    EffectLine { op: "APPLY_HEAL".to_string(), args }
}

fn inventory_line(target: String, item: String, mag: f64) -> EffectLine {
    let mut args = BTreeMap::new();
    args.insert("target".to_string(), EffectValue::Identifier(target));
    args.insert("item".to_string(), EffectValue::Str(item));
    args.insert("mag".to_string(), EffectValue::Number(mag));
    EffectLine { op: "ADJUST_INVENTORY".to_string(), args }
}

/// Adjudicate one intent. `target` is the resolved target record, when
/// the verb has one; `random` supplies dice rolls (spec.md §4.7
/// "Initiative" and §4.10 damage/heal magnitudes).
pub fn adjudicate(intent: &Intent, target: Option<&EntityRecord>, random: &dyn RandomPort) -> AdjudicationOutcome {
    let actor_wire = wire_ref(intent.actor_type, intent.actor_ref);
    let mut event_lines = Vec::new();
    let mut effect_lines = Vec::new();

    match intent.verb {
        Verb::Attack => {
            if let (Some(target), Some(target_ref)) = (target, intent.target_ref.as_ref()) {
                let mag = random.gen_range(3, 10) as f64;
                event_lines.push(format!("{actor_wire} attacks {} for {mag} damage", target.name));
                if let Some(wire) = target_wire_ref(target_ref) {
                    effect_lines.push(damage_line(wire, mag));
                }
            }
        }
        Verb::Cast => {
            if let (Some(target), Some(target_ref)) = (target, intent.target_ref.as_ref()) {
                let mag = random.gen_range(2, 8) as f64;
                event_lines.push(format!("{actor_wire} casts a spell at {} for {mag} damage", target.name));
                if let Some(wire) = target_wire_ref(target_ref) {
                    effect_lines.push(damage_line(wire, mag));
                }
            }
        }
        Verb::Give => {
            if let Some(target_ref) = intent.target_ref.as_ref() {
                if let (Some(item), Some(wire)) = (intent.parameters.get("item").and_then(|v| v.as_str()), target_wire_ref(target_ref)) {
                    event_lines.push(format!("{actor_wire} gives {item} to the target"));
                    effect_lines.push(inventory_line(actor_wire.clone(), item.to_string(), -1.0));
                    effect_lines.push(inventory_line(wire, item.to_string(), 1.0));
                }
            }
        }
        Verb::PickUp => {
            if let Some(item) = intent.parameters.get("item").and_then(|v| v.as_str()) {
                event_lines.push(format!("{actor_wire} picks up {item}"));
                effect_lines.push(inventory_line(actor_wire.clone(), item.to_string(), 1.0));
            }
        }
        Verb::Drop => {
            if let Some(item) = intent.parameters.get("item").and_then(|v| v.as_str()) {
                event_lines.push(format!("{actor_wire} drops {item}"));
                effect_lines.push(inventory_line(actor_wire.clone(), item.to_string(), -1.0));
            }
        }
        Verb::Rest => {
            let mag = 10.0;
            event_lines.push(format!("{actor_wire} rests and recovers {mag} health"));
            effect_lines.push(heal_line(actor_wire.clone(), mag));
        }
        Verb::Communicate => {
            if let Some(message) = intent.parameters.get("message").and_then(|v| v.as_str()) {
                event_lines.push(format!("{actor_wire} says \"{message}\""));
            }
        }
        Verb::Move | Verb::Travel | Verb::Examine | Verb::Guard | Verb::Flee | Verb::Equip | Verb::Unequip | Verb::Use => {
            event_lines.push(format!("{actor_wire} performs {}", intent.verb.as_str()));
        }
    }

    AdjudicationOutcome { event_lines, effect_lines }
}
