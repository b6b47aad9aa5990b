//! `validate` and `resolveTarget`, the two stages with no observable side
//! effects and therefore the only two the pipeline may silently retry
//! from their own input (spec.md §4.3, "Re-entry is safe").

use taleforge_domain::entities::{EntityRecord, Intent, Verb};
use taleforge_domain::DomainError;

use crate::target_resolution::{ResolvedTarget, TargetQuery, TargetResolver};

/// The stage-local shape of spec.md §4.3's `{ok, reason?, data}` typed
/// result: a failure carries both a machine `kind` (one of spec.md §7's
/// error kinds) and the `reason` string recorded on the intent.
#[derive(Debug, Clone)]
pub struct StageFailure {
    pub kind: &'static str,
    pub reason: String,
}

impl StageFailure {
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::from_domain(DomainError::not_found(entity_type, id))
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self { kind: "internal", reason: reason.into() }
    }

    pub fn from_domain(err: DomainError) -> Self {
        Self { kind: err.kind(), reason: err.user_sentence() }
    }

    /// The sentence posted to the Inbox (spec.md §7, "User-visible
    /// behavior").
    pub fn user_sentence(&self) -> String {
        self.reason.clone()
    }
}

/// Verb exists (true by construction — `Verb` is a closed enum), the
/// actor may act (not dead), and verb-specific parameters are minimally
/// well-formed (spec.md §4.3 "validate").
pub fn validate(intent: &Intent) -> Result<(), StageFailure> {
    intent.validate_parameters().map_err(StageFailure::from_domain)
}

/// Builds the query target resolution should run, from whichever of
/// `target`/`mention`/`self` the intent's free-form parameters carry
/// (spec.md §4.4: explicit reference, name-mention, self-reference).
fn target_query(intent: &Intent) -> Option<TargetQuery> {
    if intent.parameters.get("self").and_then(|v| v.as_bool()) == Some(true) {
        return Some(TargetQuery::SelfReference);
    }
    if let Some(explicit) = intent.parameters.get("target").and_then(|v| v.as_str()) {
        return Some(TargetQuery::Explicit(explicit.to_string()));
    }
    if let Some(mention) = intent.parameters.get("mention").and_then(|v| v.as_str()) {
        return Some(TargetQuery::Mention(mention.to_string()));
    }
    None
}

/// Verbs whose handler in §4.10 needs an entity target to do anything;
/// `COMMUNICATE` resolves a target only when one was actually mentioned
/// (addressed speech), everything else targets a tile/item/nothing and
/// skips entity resolution entirely.
fn requires_entity_target(verb: Verb) -> bool {
    matches!(verb, Verb::Attack | Verb::Cast | Verb::Give)
}

/// `resolveTarget` (spec.md §4.3, §4.4): resolves against the verb's
/// required target when one exists, or opportunistically resolves an
/// optional mention (e.g. addressed `COMMUNICATE`) without failing the
/// intent when none was given.
pub fn resolve_target(
    intent: &Intent,
    actor: &EntityRecord,
    candidates: &[EntityRecord],
) -> Result<Option<ResolvedTarget>, StageFailure> {
    let query = target_query(intent);
    let required = requires_entity_target(intent.verb);

    match (query, required) {
        (Some(query), _) => {
            let resolver = TargetResolver::new(actor, candidates);
            resolver.resolve(intent.verb, &query).map(Some).map_err(StageFailure::from_domain)
        }
        (None, true) => Err(StageFailure::from_domain(DomainError::not_found("target", "none given"))),
        (None, false) => Ok(None),
    }
}
