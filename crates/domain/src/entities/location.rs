//! A tile within a place within a region within a world (spec.md §3, "Location").

use serde::{Deserialize, Serialize};

use crate::ids::{PlaceId, RegionId};

/// A world-scoped position. Distance and visibility checks are Euclidean
/// over `(x, y)` within one `place_id`; crossing `place_id` is never a
/// distance calculation, only a travel operation (see `travel` module).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world_x: i64,
    pub world_y: i64,
    pub region_x: i32,
    pub region_y: i32,
    pub place_id: PlaceId,
    pub x: i32,
    pub y: i32,
    pub elevation: Option<i32>,
}

impl Location {
    pub fn new(place_id: PlaceId, x: i32, y: i32) -> Self {
        Self {
            world_x: 0,
            world_y: 0,
            region_x: 0,
            region_y: 0,
            place_id,
            x,
            y,
            elevation: None,
        }
    }

    pub fn with_region(mut self, region_x: i32, region_y: i32) -> Self {
        self.region_x = region_x;
        self.region_y = region_y;
        self
    }

    /// The region this location falls within, for turn-manager region-exit
    /// checks (spec.md §4.7, "Region exits").
    pub fn region_id(&self) -> RegionId {
        // Regions are identified by their coordinates within a deterministic
        // namespace so two locations in the same region always compare equal
        // without needing a lookup table.
        let namespace = uuid::Uuid::from_u128(0x7a1e_f0e9_0000_0000_0000_0000_0000_0000);
        let name = format!("{}:{}", self.region_x, self.region_y);
        RegionId::from_uuid(uuid::Uuid::new_v5(&namespace, name.as_bytes()))
    }

    /// Euclidean distance to another location. Only meaningful when both
    /// locations share a `place_id`; callers that may cross places must
    /// check `same_place` first (spec.md §4.4).
    pub fn distance_to(&self, other: &Location) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn same_place(&self, other: &Location) -> bool {
        self.place_id == other.place_id
    }

    pub fn tile(&self) -> (i32, i32) {
        (self.x, self.y)
    }
}

/// Cardinal/intercardinal facing direction, derived from the last
/// movement step (spec.md §4.8, "updates `facing` from the step delta").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    North,
    South,
    East,
    West,
}

impl Facing {
    /// Derive a facing from a tile delta. Diagonal steps resolve to the
    /// axis with the larger magnitude, horizontal winning ties (matching
    /// the deterministic tie-break the spec favors elsewhere, e.g.
    /// initiative ordering).
    pub fn from_delta(dx: i32, dy: i32) -> Option<Self> {
        if dx == 0 && dy == 0 {
            return None;
        }
        if dx.abs() >= dy.abs() {
            Some(if dx >= 0 { Facing::East } else { Facing::West })
        } else {
            Some(if dy >= 0 { Facing::South } else { Facing::North })
        }
    }

    /// Angle in degrees, 0 = East, increasing clockwise (screen/grid
    /// convention, matching the `(x, y)` tile coordinate system).
    pub fn angle_degrees(&self) -> f64 {
        match self {
            Facing::East => 0.0,
            Facing::South => 90.0,
            Facing::West => 180.0,
            Facing::North => 270.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(place: PlaceId, x: i32, y: i32) -> Location {
        Location::new(place, x, y)
    }

    #[test]
    fn distance_is_euclidean() {
        let place = PlaceId::new();
        let a = loc(place, 0, 0);
        let b = loc(place, 3, 4);
        assert_eq!(a.distance_to(&b), 5.0);
    }

    #[test]
    fn distance_boundary_equals_radius_is_inclusive() {
        let place = PlaceId::new();
        let a = loc(place, 5, 5);
        let b = loc(place, 5, 13);
        assert_eq!(a.distance_to(&b), 8.0);
    }

    #[test]
    fn same_place_checks_place_id_equality() {
        let p1 = PlaceId::new();
        let p2 = PlaceId::new();
        let a = loc(p1, 0, 0);
        let b = loc(p2, 0, 0);
        assert!(!a.same_place(&b));
    }

    #[test]
    fn facing_from_delta_prefers_larger_axis() {
        assert_eq!(Facing::from_delta(1, 0), Some(Facing::East));
        assert_eq!(Facing::from_delta(-1, 0), Some(Facing::West));
        assert_eq!(Facing::from_delta(0, -1), Some(Facing::North));
        assert_eq!(Facing::from_delta(2, 1), Some(Facing::East));
        assert_eq!(Facing::from_delta(0, 0), None);
    }

    #[test]
    fn locations_in_same_region_share_region_id() {
        let place = PlaceId::new();
        let a = Location::new(place, 1, 1).with_region(3, 3);
        let b = Location::new(place, 9, 9).with_region(3, 3);
        assert_eq!(a.region_id(), b.region_id());

        let c = Location::new(place, 1, 1).with_region(4, 3);
        assert_ne!(a.region_id(), c.region_id());
    }
}
