//! Travel (inter-place) (spec.md §4.9): connected-place traversal,
//! `requires_key` gating, and door-position placement in the target
//! place.

use taleforge_domain::entities::{EntityRecord, Place};
use taleforge_domain::ids::PlaceId;
use taleforge_domain::DomainError;

pub struct TravelOutcome {
    pub target_place_id: PlaceId,
    pub arrival_tile: (i32, i32),
}

/// Checks the inventory for the connection's `requires_key` item, if any.
fn has_key(record: &EntityRecord, key: &str) -> bool {
    record.inventory.iter().any(|i| i.item == key && i.count > 0)
}

/// Move `record` from `source` to `target` via the connection toward
/// `target.id`, verifying the key gate and computing the target's door
/// position from the reciprocal connection's direction (spec.md §4.9).
pub fn travel(record: &mut EntityRecord, source: &mut Place, target: &Place) -> Result<TravelOutcome, DomainError> {
    let connection = source
        .connection_toward(target.id)
        .ok_or_else(|| DomainError::not_found("connection", target.id.to_string()))?;

    if let Some(key) = &connection.requires_key {
        if !has_key(record, key) {
            return Err(DomainError::RequiresKey(key.clone()));
        }
    }

    let entry_direction = connection.direction;
    source.contents.remove_entity(record.id);

    let arrival_tile = target
        .connection_toward(source.id)
        .map(|reciprocal| target.tile_grid.edge_entry(reciprocal.direction))
        .unwrap_or_else(|| target.tile_grid.edge_entry(entry_direction.opposite()));

    record.location.place_id = target.id;
    record.location.x = arrival_tile.0;
    record.location.y = arrival_tile.1;

    Ok(TravelOutcome { target_place_id: target.id, arrival_tile })
}
