//! Scenario 6 (spec.md §8) plus invariant 4: a path surrounded by
//! obstacles never starts moving and the entity record's tile is
//! untouched, and a stopped entity never advances on a later tick.

use chrono::Utc;

use taleforge_domain::entities::{Feature, MovementEntityType, Place, PlaceContents, TileGrid};
use taleforge_domain::ids::{PlaceId, RegionId};

use crate::movement::{MovementError, MovementScheduler};

fn place_with_obstacles(obstacles: &[(i32, i32)]) -> Place {
    let mut place = Place {
        id: PlaceId::new(),
        region_id: RegionId::new(),
        tile_grid: TileGrid { width: 10, height: 10, default_entry: (0, 0) },
        connections: vec![],
        contents: PlaceContents::default(),
    };
    for &(x, y) in obstacles {
        place.contents.features.push(Feature { name: "crate".into(), tile: (x, y), is_obstacle: true });
    }
    place
}

#[test]
fn a_path_blocked_by_an_obstacle_never_moves_the_entity() {
    // Entity at (1,1) wants (1,5); (1,3) is blocked, closing the only
    // 4-connected corridor between them in a 10x10 grid would still
    // route around it, so box the corridor in on both sides to force a
    // genuine dead end (spec.md §8 scenario 6).
    let mut obstacles = vec![(1, 3)];
    for y in 0..10 {
        obstacles.push((0, y));
        obstacles.push((2, y));
    }
    let place = place_with_obstacles(&obstacles);

    let scheduler = MovementScheduler::new();
    let entity = taleforge_domain::ids::ActorRef::new();
    let err = scheduler
        .begin_move(entity, MovementEntityType::Npc, &place, (1, 1), (1, 5), &[], 300, Utc::now())
        .unwrap_err();

    assert_eq!(err, MovementError::NoPath);
    assert!(!scheduler.is_moving(entity));
    assert!(scheduler.state(entity).is_none(), "a failed begin_move must not leave a movement state the tick loop could advance");
}

#[test]
fn stopping_movement_prevents_any_later_tick_from_advancing_the_entity() {
    let place = place_with_obstacles(&[]);
    let scheduler = MovementScheduler::new();
    let entity = taleforge_domain::ids::ActorRef::new();
    let start = Utc::now();
    scheduler.begin_move(entity, MovementEntityType::Npc, &place, (0, 0), (5, 0), &[], 300, start).unwrap();

    // Advance one step so there's a position to preserve, then stop.
    let mid_tick = start + chrono::Duration::milliseconds(200);
    scheduler.tick(&place, mid_tick);
    let tile_at_stop = scheduler.state(entity).unwrap().current_tile();
    scheduler.stop_entity_movement(entity);

    // Ticks far in the future must not move the entity further.
    let later = mid_tick + chrono::Duration::seconds(10);
    let events = scheduler.tick(&place, later);
    assert!(events.is_empty(), "no tick event should fire for a stopped entity");
    assert_eq!(scheduler.state(entity).unwrap().current_tile(), tile_at_stop);
    assert!(!scheduler.is_moving(entity));
}
