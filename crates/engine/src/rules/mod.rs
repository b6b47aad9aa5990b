//! Rules Adjudication & Apply (spec.md §4.10): the adjudicator turns a
//! resolved intent into event/effect lines; the applier mutates entity
//! records through the storage port and records diffs.

pub mod adjudicator;
pub mod applier;

pub use adjudicator::{adjudicate, AdjudicationOutcome};
pub use applier::{AppliedDiff, Applier};
