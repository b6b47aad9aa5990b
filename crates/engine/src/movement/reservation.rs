//! Per-place tile reservation map (spec.md §4.8, "Reservations"): ensures
//! no two entities target the same next tile. Owned by the movement
//! scheduler's single service loop; foreign access goes through its
//! methods, never the map directly (spec.md §5, "Shared resources").

use dashmap::DashMap;

use taleforge_domain::ids::{ActorRef, PlaceId};

#[derive(Debug, Default)]
pub struct ReservationMap {
    tiles: DashMap<(PlaceId, (i32, i32)), ActorRef>,
}

impl ReservationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to reserve `tile` in `place_id` for `entity_ref`. Fails if
    /// another entity already holds it.
    pub fn reserve(&self, place_id: PlaceId, tile: (i32, i32), entity_ref: ActorRef) -> bool {
        if let Some(holder) = self.tiles.get(&(place_id, tile)) {
            return *holder == entity_ref;
        }
        self.tiles.insert((place_id, tile), entity_ref);
        true
    }

    pub fn release(&self, place_id: PlaceId, tile: (i32, i32), entity_ref: ActorRef) {
        if let Some(holder) = self.tiles.get(&(place_id, tile)) {
            if *holder == entity_ref {
                drop(holder);
                self.tiles.remove(&(place_id, tile));
            }
        }
    }

    pub fn is_reserved(&self, place_id: PlaceId, tile: (i32, i32)) -> bool {
        self.tiles.contains_key(&(place_id, tile))
    }

    /// Release every tile held by `entity_ref` (crash/cancellation path,
    /// spec.md §4.8: "Reservation is cleared on completion, cancellation,
    /// or crash of the owning entity's state").
    pub fn release_all_for(&self, entity_ref: ActorRef) {
        self.tiles.retain(|_, holder| *holder != entity_ref);
    }
}
