//! Per-NPC-per-command-type reaction throttle (spec.md §4.6, "Throttling
//! & exceptions"): an NPC that already reacted to a command type within
//! the last 3 seconds does not react again, except for the single
//! immediate `face_speaker` follow-up a COMMUNICATE reaction schedules.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use taleforge_domain::ids::ActorRef;

pub const THROTTLE_WINDOW_MS: i64 = 3_000;

#[derive(Debug, Default)]
pub struct ReactionThrottle {
    last_reacted_at_ms: DashMap<(ActorRef, &'static str), i64>,
}

impl ReactionThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `npc_ref` may react to `command_type` now.
    /// `bypass_throttle` skips the check entirely: it is set only for the
    /// 50ms `face_speaker` resend that immediately follows a COMMUNICATE
    /// reaction, which is treated as part of the same originating
    /// reaction rather than a new command.
    pub fn allow(&self, npc_ref: ActorRef, command_type: &'static str, now: DateTime<Utc>, bypass_throttle: bool) -> bool {
        if bypass_throttle {
            return true;
        }
        let now_ms = now.timestamp_millis();
        match self.last_reacted_at_ms.get(&(npc_ref, command_type)) {
            Some(last) if now_ms - *last < THROTTLE_WINDOW_MS => false,
            _ => true,
        }
    }

    pub fn record(&self, npc_ref: ActorRef, command_type: &'static str, now: DateTime<Utc>) {
        self.last_reacted_at_ms.insert((npc_ref, command_type), now.timestamp_millis());
    }
}
