//! Target Resolution (spec.md §4.4): given `(actorLocation, verb,
//! parametersOrMention)`, resolve to `{targetRef, targetType,
//! targetLocation}` or fail with `ambiguous | not_found | out_of_range |
//! not_visible`.
//!
//! Visibility (spec.md §2's component table: "Distance, visibility,
//! mention parsing, implied-target inference") is checked with the same
//! vision-cone gate `perception::broadcast` uses, from the resolving
//! actor's own facing — an entity or NPC target the actor cannot see
//! through their vision cone fails with `not_visible`, independent of
//! the range check.

use taleforge_domain::entities::{ActorType, EntityRecord, Location, TargetKind, TargetRef, Verb};
use taleforge_domain::ids::ActorRef;
use taleforge_domain::{ActionRegistry, DomainError};

/// What the caller is asking resolution to find: either an explicit wire
/// reference (`npc.<id>`, `actor.<id>`, `item.<id>`) or a free-text mention
/// (spec.md §4.4: "explicit reference ... name-mention ... implied ...
/// self-reference").
#[derive(Debug, Clone)]
pub enum TargetQuery {
    Explicit(String),
    Mention(String),
    SelfReference,
}

#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub target_ref: TargetRef,
    pub target_location: Location,
}

/// Resolves targets against the candidate entities the caller has already
/// loaded into scope (typically everyone in the actor's place, plus the
/// reachable connected place when the verb allows cross-place targeting).
pub struct TargetResolver<'a> {
    pub actor: &'a EntityRecord,
    pub candidates: &'a [EntityRecord],
}

impl<'a> TargetResolver<'a> {
    pub fn new(actor: &'a EntityRecord, candidates: &'a [EntityRecord]) -> Self {
        Self { actor, candidates }
    }

    pub fn resolve(&self, verb: Verb, query: &TargetQuery) -> Result<ResolvedTarget, DomainError> {
        let found = match query {
            TargetQuery::SelfReference => self.actor.clone(),
            TargetQuery::Explicit(reference) => self.resolve_explicit(reference)?,
            TargetQuery::Mention(mention) => self.resolve_mention(mention)?,
        };

        let kind = match found.entity_type {
            ActorType::Player => TargetKind::Actor,
            ActorType::Npc => TargetKind::Npc,
        };
        if !ActionRegistry::is_valid_target(verb, kind) && found.id != self.actor.id {
            return Err(DomainError::validation(format!("{verb:?} cannot target {kind:?}")));
        }

        self.check_range(verb, &found)?;
        self.check_visible(kind, &found)?;

        let target_ref = match found.entity_type {
            ActorType::Player => TargetRef::Actor { actor_ref: found.id },
            ActorType::Npc => TargetRef::Npc { actor_ref: found.id },
        };
        Ok(ResolvedTarget { target_ref, target_location: found.location })
    }

    fn resolve_explicit(&self, reference: &str) -> Result<EntityRecord, DomainError> {
        let (prefix, id) = reference.split_once('.').ok_or_else(|| DomainError::validation("malformed target reference"))?;
        match prefix {
            "npc" | "actor" => {
                let actor_ref: ActorRef = id
                    .parse::<uuid::Uuid>()
                    .map(ActorRef::from)
                    .map_err(|_| DomainError::not_found(if prefix == "npc" { "npc" } else { "actor" }, id))?;
                self.candidates
                    .iter()
                    .find(|c| c.id == actor_ref)
                    .cloned()
                    .ok_or_else(|| DomainError::not_found(if prefix == "npc" { "npc" } else { "actor" }, id))
            }
            "item" => Err(DomainError::not_found("item", id)),
            _ => Err(DomainError::validation("unknown target reference prefix")),
        }
    }

    /// Case-insensitive name-mention, falling back to "implied" matching
    /// when the mention is a bare noun and exactly one candidate carries
    /// it as a tag (spec.md §4.4: "implied (\"the guard\" when exactly one
    /// guard is present in scope)").
    fn resolve_mention(&self, mention: &str) -> Result<EntityRecord, DomainError> {
        let needle = mention.to_lowercase();
        let by_name: Vec<&EntityRecord> = self.candidates.iter().filter(|c| c.name.to_lowercase() == needle).collect();
        match by_name.len() {
            1 => return Ok(by_name[0].clone()),
            n if n > 1 => return Err(DomainError::Ambiguous(mention.to_string())),
            _ => {}
        }

        let implied_noun = needle.strip_prefix("the ").unwrap_or(&needle);
        let by_tag: Vec<&EntityRecord> = self
            .candidates
            .iter()
            .filter(|c| c.tags.iter().any(|t| t.to_lowercase() == implied_noun))
            .collect();
        match by_tag.len() {
            1 => Ok(by_tag[0].clone()),
            0 => Err(DomainError::not_found("target", mention)),
            _ => Err(DomainError::Ambiguous(mention.to_string())),
        }
    }

    /// Euclidean distance within a place, or connected-place reachability
    /// when the verb permits cross-place targeting (spec.md §4.4).
    fn check_range(&self, verb: Verb, target: &EntityRecord) -> Result<(), DomainError> {
        let Some(max_range) = ActionRegistry::max_range(verb) else {
            return Ok(());
        };
        if self.actor.location.same_place(&target.location) {
            let distance = self.actor.location.distance_to(&target.location);
            if distance > max_range {
                return Err(DomainError::OutOfRange(format!("{distance:.1} tiles, max {max_range:.1}")));
            }
            return Ok(());
        }
        if ActionRegistry::allows_cross_place_target(verb) {
            return Ok(());
        }
        Err(DomainError::OutOfRange("target is not in reach of the actor's place".to_string()))
    }

    /// Vision-cone gate for an `Actor`/`Npc` target (spec.md §4.4,
    /// §4.5 "Vision cone gate"): self-references and non-entity target
    /// kinds (item, tile, connection) never need a line-of-sight check,
    /// and a target outside the actor's own place has already failed
    /// range resolution before this runs.
    fn check_visible(&self, kind: TargetKind, target: &EntityRecord) -> Result<(), DomainError> {
        if target.id == self.actor.id {
            return Ok(());
        }
        if !matches!(kind, TargetKind::Actor | TargetKind::Npc) {
            return Ok(());
        }
        if !self.actor.location.same_place(&target.location) {
            return Ok(());
        }

        let distance = self.actor.location.distance_to(&target.location);
        let bearing = crate::perception::bearing_degrees(&self.actor.location, &target.location);
        let vision = self.actor.vision_cone();
        if vision.gate(self.actor.facing.angle_degrees(), bearing, distance) {
            Ok(())
        } else {
            Err(DomainError::NotVisible(format!("{kind:?} at {distance:.1} tiles outside vision cone")))
        }
    }
}
