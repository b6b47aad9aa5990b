//! A place: a tile grid, its connections to other places, and the
//! entities currently present (spec.md §3, "Place").

use serde::{Deserialize, Serialize};

use crate::ids::{ActorRef, ConnectionId, PlaceId, RegionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub fn opposite(&self) -> Self {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileGrid {
    pub width: u32,
    pub height: u32,
    pub default_entry: (i32, i32),
}

impl TileGrid {
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    /// Edge position for a door placed on the named side, centered on the
    /// perpendicular axis (spec.md §4.9, "compute door position ... from
    /// ... direction (north/south/east/west edges)").
    pub fn edge_entry(&self, direction: Direction) -> (i32, i32) {
        let mid_x = (self.width as i32 / 2).max(0);
        let mid_y = (self.height as i32 / 2).max(0);
        match direction {
            Direction::North => (mid_x, 0),
            Direction::South => (mid_x, self.height as i32 - 1),
            Direction::West => (0, mid_y),
            Direction::East => (self.width as i32 - 1, mid_y),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub target_place_id: PlaceId,
    pub direction: Direction,
    pub travel_time_seconds: u32,
    pub requires_key: Option<String>,
}

/// An obstacle or other static feature occupying a tile (spec.md §4.8:
/// "tiles covered by obstacle features as walls").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub tile: (i32, i32),
    pub is_obstacle: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaceContents {
    pub npcs_present: Vec<ActorRef>,
    pub actors_present: Vec<ActorRef>,
    pub features: Vec<Feature>,
}

impl PlaceContents {
    pub fn all_entities(&self) -> impl Iterator<Item = &ActorRef> {
        self.npcs_present.iter().chain(self.actors_present.iter())
    }

    pub fn remove_entity(&mut self, entity: ActorRef) {
        self.npcs_present.retain(|e| *e != entity);
        self.actors_present.retain(|e| *e != entity);
    }

    pub fn obstacle_tiles(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.features.iter().filter(|f| f.is_obstacle).map(|f| f.tile)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub id: PlaceId,
    pub region_id: RegionId,
    pub tile_grid: TileGrid,
    pub connections: Vec<Connection>,
    pub contents: PlaceContents,
}

impl Place {
    pub fn connection_toward(&self, target: PlaceId) -> Option<&Connection> {
        self.connections.iter().find(|c| c.target_place_id == target)
    }

    pub fn is_tile_blocked(&self, x: i32, y: i32, occupied: &[(i32, i32)]) -> bool {
        if !self.tile_grid.in_bounds(x, y) {
            return true;
        }
        if self.contents.obstacle_tiles().any(|(ox, oy)| ox == x && oy == y) {
            return true;
        }
        occupied.contains(&(x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> TileGrid {
        TileGrid {
            width: 10,
            height: 6,
            default_entry: (0, 0),
        }
    }

    #[test]
    fn edge_entry_centers_on_perpendicular_axis() {
        let g = grid();
        assert_eq!(g.edge_entry(Direction::North), (5, 0));
        assert_eq!(g.edge_entry(Direction::South), (5, 5));
        assert_eq!(g.edge_entry(Direction::West), (0, 3));
        assert_eq!(g.edge_entry(Direction::East), (9, 3));
    }

    #[test]
    fn out_of_bounds_tile_is_blocked() {
        let place = Place {
            id: PlaceId::new(),
            region_id: RegionId::new(),
            tile_grid: grid(),
            connections: vec![],
            contents: PlaceContents::default(),
        };
        assert!(place.is_tile_blocked(-1, 0, &[]));
        assert!(place.is_tile_blocked(20, 0, &[]));
    }

    #[test]
    fn obstacle_feature_blocks_its_tile() {
        let mut contents = PlaceContents::default();
        contents.features.push(Feature {
            name: "crate".into(),
            tile: (2, 2),
            is_obstacle: true,
        });
        let place = Place {
            id: PlaceId::new(),
            region_id: RegionId::new(),
            tile_grid: grid(),
            connections: vec![],
            contents,
        };
        assert!(place.is_tile_blocked(2, 2, &[]));
        assert!(!place.is_tile_blocked(2, 3, &[]));
    }

    #[test]
    fn direction_opposite_is_involutive() {
        for d in [Direction::North, Direction::South, Direction::East, Direction::West] {
            assert_eq!(d.opposite().opposite(), d);
        }
    }
}
