//! Working Memory & Filter (SPEC_FULL.md's added module; spec.md §9
//! "Action-relevance rules (what fields to load into working memory per
//! verb) are a static table."). A read-only view assembled fresh each
//! time a stage needs it, never cached across stages.

use taleforge_domain::entities::Verb;

/// The well-known record fields a verb's stages actually read, so
/// callers load only what a stage needs rather than the whole record
/// graph (spec.md §6 "well-known subset": `id, name, location, stats,
/// resources.health, tags, inventory, body_slots`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelevantField {
    Location,
    Health,
    Stats,
    Tags,
    Inventory,
    BodySlots,
    Personality,
}

/// Static per-verb relevance table (spec.md §9). Never populated at
/// runtime; every verb's row is fixed here.
pub fn relevant_fields(verb: Verb) -> &'static [RelevantField] {
    use RelevantField::*;
    match verb {
        Verb::Attack | Verb::Cast | Verb::Flee => &[Location, Health, Stats, Tags],
        Verb::Move | Verb::Travel => &[Location, Tags],
        Verb::Communicate => &[Location, Tags, Personality],
        Verb::Use | Verb::Equip | Verb::Unequip => &[Location, Inventory, BodySlots],
        Verb::PickUp | Verb::Drop | Verb::Give => &[Location, Inventory],
        Verb::Guard | Verb::Rest => &[Location, Health],
        Verb::Examine => &[Location, Tags, Stats],
    }
}

/// A read-only snapshot of the fields a stage needs, assembled fresh per
/// stage entry rather than carried forward across stages (SPEC_FULL.md:
/// "read-only rebuilt-per-stage-entry view").
#[derive(Debug, Clone)]
pub struct WorkingMemory<'a> {
    pub record: &'a taleforge_domain::entities::EntityRecord,
    pub fields: &'static [RelevantField],
}

impl<'a> WorkingMemory<'a> {
    pub fn assemble(verb: Verb, record: &'a taleforge_domain::entities::EntityRecord) -> Self {
        Self { record, fields: relevant_fields(verb) }
    }

    pub fn has(&self, field: RelevantField) -> bool {
        self.fields.contains(&field)
    }
}
