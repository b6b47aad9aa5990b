//! Per-entity movement state driven by the tick scheduler (spec.md §3
//! "Movement state", §4.8 "Movement Engine").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::location::Facing;
use crate::ids::ActorRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementEntityType {
    Player,
    Npc,
}

/// Movement subtype derived from speed, each mapping to a distinct
/// sense-broadcast profile (spec.md §4.8, "Emission").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementSubtype {
    Sprint,
    Walk,
    Sneak,
}

impl MovementSubtype {
    pub fn from_speed_tpm(speed_tpm: u32) -> Self {
        if speed_tpm >= 500 {
            MovementSubtype::Sprint
        } else if speed_tpm <= 200 {
            MovementSubtype::Sneak
        } else {
            MovementSubtype::Walk
        }
    }
}

pub const DEFAULT_SPEED_TPM: u32 = 300;
pub const TICK_INTERVAL_MS: u64 = 50;
pub const EMISSION_THROTTLE_MS: i64 = 350;
pub const EMISSION_STEP_INTERVAL: u32 = 3;
pub const PATH_VISUAL_DURATION_MS: i64 = 1500;

pub fn ms_per_tile(speed_tpm: u32) -> u64 {
    60_000 / speed_tpm.max(1) as u64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementState {
    pub entity_ref: ActorRef,
    pub entity_type: MovementEntityType,
    pub goal: Option<(i32, i32)>,
    pub path: Vec<(i32, i32)>,
    pub path_index: usize,
    pub is_moving: bool,
    pub speed_tpm: u32,
    pub ms_per_tile: u64,
    pub last_step_time: DateTime<Utc>,
    pub next_step_time: DateTime<Utc>,
    pub step_count: u64,
    pub total_distance: f64,
    pub facing: Facing,
    pub show_path: bool,
    pub path_color: PathColor,
    pub failed_path: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathColor {
    Default,
    Red,
}

impl MovementState {
    pub fn idle(entity_ref: ActorRef, entity_type: MovementEntityType, at: (i32, i32), now: DateTime<Utc>) -> Self {
        Self {
            entity_ref,
            entity_type,
            goal: None,
            path: vec![at],
            path_index: 0,
            is_moving: false,
            speed_tpm: DEFAULT_SPEED_TPM,
            ms_per_tile: ms_per_tile(DEFAULT_SPEED_TPM),
            last_step_time: now,
            next_step_time: now,
            step_count: 0,
            total_distance: 0.0,
            facing: Facing::South,
            show_path: false,
            path_color: PathColor::Default,
            failed_path: false,
        }
    }

    pub fn subtype(&self) -> MovementSubtype {
        MovementSubtype::from_speed_tpm(self.speed_tpm)
    }

    pub fn current_tile(&self) -> (i32, i32) {
        self.path.get(self.path_index).copied().unwrap_or((0, 0))
    }

    pub fn is_ready_to_step(&self, now: DateTime<Utc>) -> bool {
        self.is_moving && now >= self.next_step_time
    }

    /// Advance one tile, updating facing, counters, and schedule (spec.md
    /// §4.8: "advances one tile along its path, updates facing from the
    /// step delta, increments step counter, updates next_step_time").
    pub fn commit_step(&mut self, now: DateTime<Utc>) {
        if self.path_index + 1 >= self.path.len() {
            return;
        }
        let from = self.path[self.path_index];
        let to = self.path[self.path_index + 1];
        self.path_index += 1;
        if let Some(facing) = Facing::from_delta(to.0 - from.0, to.1 - from.1) {
            self.facing = facing;
        }
        self.step_count += 1;
        let dx = (to.0 - from.0) as f64;
        let dy = (to.1 - from.1) as f64;
        self.total_distance += (dx * dx + dy * dy).sqrt();
        self.last_step_time = now;
        self.next_step_time = now + chrono::Duration::milliseconds(self.ms_per_tile as i64);

        if self.path_index + 1 >= self.path.len() {
            self.on_complete();
        }
    }

    fn on_complete(&mut self) {
        self.is_moving = false;
        self.goal = None;
    }

    pub fn mark_blocked(&mut self) {
        self.is_moving = false;
        self.failed_path = true;
        self.path_color = PathColor::Red;
    }

    pub fn stop(&mut self) {
        self.is_moving = false;
    }

    /// `lerp(path[i-1], path[i], progress)`, a read-only query never
    /// treated as authoritative (spec.md §4.8, "Interpolation").
    pub fn interpolated_position(&self, now: DateTime<Utc>) -> (f64, f64) {
        let current = self.path.get(self.path_index).copied().unwrap_or((0, 0));
        let next = self.path.get(self.path_index + 1).copied();
        let Some(next) = next else {
            return (current.0 as f64, current.1 as f64);
        };
        let elapsed = (now - self.last_step_time).num_milliseconds().max(0) as f64;
        let progress = (elapsed / self.ms_per_tile as f64).min(1.0);
        (
            current.0 as f64 + (next.0 - current.0) as f64 * progress,
            current.1 as f64 + (next.1 - current.1) as f64 * progress,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ActorRef;

    fn state() -> MovementState {
        let now = Utc::now();
        let mut s = MovementState::idle(ActorRef::new(), MovementEntityType::Player, (0, 0), now);
        s.path = vec![(0, 0), (1, 0), (2, 0)];
        s.is_moving = true;
        s
    }

    #[test]
    fn ms_per_tile_matches_default_speed() {
        assert_eq!(ms_per_tile(DEFAULT_SPEED_TPM), 200);
    }

    #[test]
    fn subtype_thresholds() {
        assert_eq!(MovementSubtype::from_speed_tpm(500), MovementSubtype::Sprint);
        assert_eq!(MovementSubtype::from_speed_tpm(200), MovementSubtype::Sneak);
        assert_eq!(MovementSubtype::from_speed_tpm(300), MovementSubtype::Walk);
    }

    #[test]
    fn commit_step_advances_and_updates_facing() {
        let mut s = state();
        let now = s.next_step_time;
        s.commit_step(now);
        assert_eq!(s.path_index, 1);
        assert_eq!(s.facing, Facing::East);
        assert_eq!(s.step_count, 1);
        assert!(s.is_moving);
    }

    #[test]
    fn commit_step_on_final_tile_completes() {
        let mut s = state();
        s.path_index = 1;
        let now = s.next_step_time;
        s.commit_step(now);
        assert!(!s.is_moving);
        assert!(s.goal.is_none());
    }

    #[test]
    fn mark_blocked_stops_and_flags_red() {
        let mut s = state();
        s.mark_blocked();
        assert!(!s.is_moving);
        assert!(s.failed_path);
        assert_eq!(s.path_color, PathColor::Red);
    }

    #[test]
    fn interpolated_position_halfway() {
        let mut s = state();
        let now = s.last_step_time + chrono::Duration::milliseconds((s.ms_per_tile / 2) as i64);
        let (x, y) = s.interpolated_position(now);
        assert!((x - 0.5).abs() < 0.01);
        assert_eq!(y, 0.0);
    }
}
