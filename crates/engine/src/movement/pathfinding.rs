//! BFS pathfinding over a place's 4-connected tile grid (spec.md §4.8,
//! "Pathfinding"): out-of-bounds, occupied, and obstacle tiles are walls.

use std::collections::{HashMap, VecDeque};

use taleforge_domain::entities::Place;

const NEIGHBOR_DELTAS: [(i32, i32); 4] = [(0, -1), (0, 1), (-1, 0), (1, 0)];

/// Shortest 4-connected path from `from` to `to`, inclusive of both ends.
/// Returns `None` when no path exists (goal unreachable, occupied, or an
/// obstacle).
pub fn find_path(place: &Place, from: (i32, i32), to: (i32, i32), occupied: &[(i32, i32)]) -> Option<Vec<(i32, i32)>> {
    if from == to {
        return Some(vec![from]);
    }
    if place.is_tile_blocked(to.0, to.1, occupied) {
        return None;
    }

    let mut came_from: HashMap<(i32, i32), (i32, i32)> = HashMap::new();
    let mut queue = VecDeque::new();
    queue.push_back(from);
    came_from.insert(from, from);

    while let Some(current) = queue.pop_front() {
        if current == to {
            return Some(reconstruct(&came_from, from, to));
        }
        for (dx, dy) in NEIGHBOR_DELTAS {
            let next = (current.0 + dx, current.1 + dy);
            if came_from.contains_key(&next) {
                continue;
            }
            if next != to && place.is_tile_blocked(next.0, next.1, occupied) {
                continue;
            }
            came_from.insert(next, current);
            queue.push_back(next);
        }
    }
    None
}

fn reconstruct(came_from: &HashMap<(i32, i32), (i32, i32)>, from: (i32, i32), to: (i32, i32)) -> Vec<(i32, i32)> {
    let mut path = vec![to];
    let mut current = to;
    while current != from {
        current = came_from[&current];
        path.push(current);
    }
    path.reverse();
    path
}
