//! Movement Engine (spec.md §4.8): tick scheduler, BFS pathfinding,
//! reservations, emission throttling, and completion.

mod pathfinding;
mod reservation;

pub use pathfinding::find_path;
pub use reservation::ReservationMap;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use taleforge_domain::entities::{MovementEntityType, MovementState};
use taleforge_domain::entities::movement::{ms_per_tile, EMISSION_STEP_INTERVAL, EMISSION_THROTTLE_MS};
use taleforge_domain::entities::Place;
use taleforge_domain::ids::ActorRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementError {
    NoPath,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MovementTickEvent {
    Stepped { entity_ref: ActorRef, tile: (i32, i32) },
    /// Emit a MOVE perception batch now (spec.md §4.8, "Emission").
    Emit { entity_ref: ActorRef, tile: (i32, i32) },
    Completed { entity_ref: ActorRef, tile: (i32, i32) },
    Blocked { entity_ref: ActorRef },
}

/// Owns the per-entity movement states, the place's reservation map, and
/// the per-mover emission throttle (spec.md §5: "owned by single service
/// loops").
#[derive(Default)]
pub struct MovementScheduler {
    states: DashMap<ActorRef, MovementState>,
    reservations: ReservationMap,
    last_emission: DashMap<ActorRef, DateTime<Utc>>,
}

impl MovementScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_moving(&self, entity_ref: ActorRef) -> bool {
        self.states.get(&entity_ref).is_some_and(|s| s.is_moving)
    }

    pub fn state(&self, entity_ref: ActorRef) -> Option<MovementState> {
        self.states.get(&entity_ref).map(|s| s.clone())
    }

    /// Plan and begin a move (spec.md §4.8, "Pathfinding"). `occupied`
    /// is every other entity's current tile plus any reservations the
    /// caller already knows about; the scheduler adds its own
    /// reservation map on top.
    pub fn begin_move(
        &self,
        entity_ref: ActorRef,
        entity_type: MovementEntityType,
        place: &Place,
        from: (i32, i32),
        to: (i32, i32),
        occupied: &[(i32, i32)],
        speed_tpm: u32,
        now: DateTime<Utc>,
    ) -> Result<(), MovementError> {
        let path = find_path(place, from, to, occupied).ok_or(MovementError::NoPath)?;

        let mut state = MovementState::idle(entity_ref, entity_type, from, now);
        state.path = path;
        state.goal = Some(to);
        state.is_moving = true;
        state.speed_tpm = speed_tpm;
        state.ms_per_tile = ms_per_tile(speed_tpm);
        state.next_step_time = now + chrono::Duration::milliseconds(state.ms_per_tile as i64);
        self.states.insert(entity_ref, state);
        Ok(())
    }

    /// Advance every entity that is due a step (spec.md §4.8, global tick:
    /// "every entity with is_moving and now >= next_step_time advances one
    /// tile"). Returns the events the caller should act on (perception
    /// emission, persistence, reservation release).
    pub fn tick(&self, place: &Place, now: DateTime<Utc>) -> Vec<MovementTickEvent> {
        let mut events = Vec::new();
        let due: Vec<ActorRef> = self
            .states
            .iter()
            .filter(|e| e.value().is_ready_to_step(now))
            .map(|e| *e.key())
            .collect();

        for entity_ref in due {
            let Some(mut state) = self.states.get_mut(&entity_ref) else { continue };
            let from = state.current_tile();
            let next = state.path.get(state.path_index + 1).copied();
            let Some(next_tile) = next else { continue };

            if !self.reservations.reserve(place.id, next_tile, entity_ref) {
                state.mark_blocked();
                events.push(MovementTickEvent::Blocked { entity_ref });
                continue;
            }

            state.commit_step(now);
            self.reservations.release(place.id, from, entity_ref);
            events.push(MovementTickEvent::Stepped { entity_ref, tile: next_tile });

            if should_emit(&state, &self.last_emission, entity_ref, now) {
                self.last_emission.insert(entity_ref, now);
                events.push(MovementTickEvent::Emit { entity_ref, tile: next_tile });
            }

            if !state.is_moving {
                self.reservations.release_all_for(entity_ref);
                events.push(MovementTickEvent::Completed { entity_ref, tile: next_tile });
            }
        }

        events
    }

    /// Synchronous stop (spec.md §5, "Cancellation"): the next tick
    /// observes `!is_moving` and releases reservations immediately here
    /// rather than waiting for that tick.
    pub fn stop_entity_movement(&self, entity_ref: ActorRef) {
        if let Some(mut state) = self.states.get_mut(&entity_ref) {
            state.stop();
        }
        self.reservations.release_all_for(entity_ref);
    }

    pub fn remove(&self, entity_ref: ActorRef) {
        self.states.remove(&entity_ref);
        self.reservations.release_all_for(entity_ref);
    }
}

fn should_emit(state: &MovementState, last_emission: &DashMap<ActorRef, DateTime<Utc>>, entity_ref: ActorRef, now: DateTime<Utc>) -> bool {
    let at_interval = state.step_count == 1
        || state.step_count % (EMISSION_STEP_INTERVAL as u64) == 0
        || state.path_index + 2 >= state.path.len();
    if !at_interval {
        return false;
    }
    match last_emission.get(&entity_ref) {
        Some(last) => (now - *last).num_milliseconds() >= EMISSION_THROTTLE_MS,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taleforge_domain::entities::{Feature, PlaceContents, TileGrid};
    use taleforge_domain::ids::{PlaceId, RegionId};

    fn place() -> Place {
        Place {
            id: PlaceId::new(),
            region_id: RegionId::new(),
            tile_grid: TileGrid { width: 10, height: 10, default_entry: (0, 0) },
            connections: vec![],
            contents: PlaceContents::default(),
        }
    }

    #[test]
    fn begin_move_computes_a_path() {
        let scheduler = MovementScheduler::new();
        let place = place();
        let entity = ActorRef::new();
        scheduler
            .begin_move(entity, MovementEntityType::Npc, &place, (0, 0), (3, 0), &[], 300, Utc::now())
            .unwrap();
        let state = scheduler.state(entity).unwrap();
        assert_eq!(state.path, vec![(0, 0), (1, 0), (2, 0), (3, 0)]);
        assert!(state.is_moving);
    }

    #[test]
    fn tick_steps_when_due_and_reserves_next_tile() {
        let scheduler = MovementScheduler::new();
        let place = place();
        let entity = ActorRef::new();
        let start = Utc::now();
        scheduler
            .begin_move(entity, MovementEntityType::Npc, &place, (0, 0), (2, 0), &[], 300, start)
            .unwrap();
        let due_time = start + chrono::Duration::milliseconds(200);
        let events = scheduler.tick(&place, due_time);
        assert!(events.iter().any(|e| matches!(e, MovementTickEvent::Stepped { tile: (1, 0), .. })));
        assert!(scheduler.reservations.is_reserved(place.id, (1, 0)));
    }

    #[test]
    fn reaching_goal_emits_completed_and_releases_reservations() {
        let scheduler = MovementScheduler::new();
        let place = place();
        let entity = ActorRef::new();
        let start = Utc::now();
        scheduler
            .begin_move(entity, MovementEntityType::Npc, &place, (0, 0), (1, 0), &[], 300, start)
            .unwrap();
        let due_time = start + chrono::Duration::milliseconds(200);
        let events = scheduler.tick(&place, due_time);
        assert!(events.iter().any(|e| matches!(e, MovementTickEvent::Completed { .. })));
        assert!(!scheduler.is_moving(entity));
        assert!(!scheduler.reservations.is_reserved(place.id, (1, 0)));
    }

    #[test]
    fn blocked_next_tile_marks_entity_blocked() {
        let scheduler = MovementScheduler::new();
        let place = place();
        let a = ActorRef::new();
        let b = ActorRef::new();
        let start = Utc::now();
        scheduler.begin_move(a, MovementEntityType::Npc, &place, (0, 0), (2, 0), &[], 300, start).unwrap();
        scheduler.reservations.reserve(place.id, (1, 0), b);
        let due_time = start + chrono::Duration::milliseconds(200);
        let events = scheduler.tick(&place, due_time);
        assert!(events.iter().any(|e| matches!(e, MovementTickEvent::Blocked { entity_ref } if *entity_ref == a)));
        assert!(!scheduler.is_moving(a));
    }

    #[test]
    fn stop_entity_movement_releases_reservations_immediately() {
        let scheduler = MovementScheduler::new();
        let place = place();
        let entity = ActorRef::new();
        let start = Utc::now();
        scheduler.begin_move(entity, MovementEntityType::Npc, &place, (0, 0), (3, 0), &[], 300, start).unwrap();
        scheduler.reservations.reserve(place.id, (1, 0), entity);
        scheduler.stop_entity_movement(entity);
        assert!(!scheduler.is_moving(entity));
        assert!(!scheduler.reservations.is_reserved(place.id, (1, 0)));
    }

    #[test]
    fn no_path_to_an_obstacle_surrounded_goal_errors() {
        let mut place = place();
        for (x, y) in [(2, 1), (2, 3), (1, 2), (3, 2)] {
            place.contents.features.push(Feature { name: "wall".into(), tile: (x, y), is_obstacle: true });
        }
        let scheduler = MovementScheduler::new();
        let entity = ActorRef::new();
        let err = scheduler
            .begin_move(entity, MovementEntityType::Npc, &place, (0, 0), (2, 2), &[], 300, Utc::now())
            .unwrap_err();
        assert_eq!(err, MovementError::NoPath);
    }
}
