//! Conversation state (spec.md §4.6 "Conversation state"): per-NPC arena
//! entry, attention spans, and ending conditions.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use taleforge_domain::ids::ActorRef;

pub const PARTICIPANT_ATTENTION_SPAN_MS: i64 = 30_000;
pub const BYSTANDER_ATTENTION_SPAN_MS: i64 = 20_000;

#[derive(Debug, Clone)]
pub struct PreviousGoal {
    pub description: String,
    pub path_state: Option<Vec<(i32, i32)>>,
}

#[derive(Debug, Clone)]
pub struct ConversationState {
    pub npc_ref: ActorRef,
    pub target_entity: ActorRef,
    pub participants: Vec<ActorRef>,
    pub previous_goal: Option<PreviousGoal>,
    pub started_at_ms: i64,
    pub timeout_at_ms: i64,
    pub last_activity_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Timeout,
    Farewell,
    ParticipantLeft,
    ForceEnd,
}

impl ConversationState {
    pub fn new(npc_ref: ActorRef, target_entity: ActorRef, now_ms: i64, is_participant: bool, previous_goal: Option<PreviousGoal>) -> Self {
        let span = if is_participant { PARTICIPANT_ATTENTION_SPAN_MS } else { BYSTANDER_ATTENTION_SPAN_MS };
        Self {
            npc_ref,
            target_entity,
            participants: vec![npc_ref, target_entity],
            previous_goal,
            started_at_ms: now_ms,
            timeout_at_ms: now_ms + span,
            last_activity_ms: now_ms,
        }
    }

    /// Renewed on each message (spec.md §4.6: "renewed on each message").
    pub fn renew(&mut self, now_ms: i64, is_participant: bool) {
        let span = if is_participant { PARTICIPANT_ATTENTION_SPAN_MS } else { BYSTANDER_ATTENTION_SPAN_MS };
        self.last_activity_ms = now_ms;
        self.timeout_at_ms = now_ms + span;
    }

    pub fn join(&mut self, participant: ActorRef) {
        if !self.participants.contains(&participant) {
            self.participants.push(participant);
        }
    }

    pub fn leave(&mut self, participant: ActorRef) {
        self.participants.retain(|p| *p != participant);
    }

    /// A conversation whose last message was exactly `timeout_at_ms` ago
    /// ends on the next sweep, not earlier (spec.md §8, "Boundaries").
    pub fn has_timed_out(&self, now_ms: i64) -> bool {
        now_ms >= self.timeout_at_ms
    }
}

/// Arena of active conversations keyed by NPC (spec.md §9: "arena +
/// handles").
#[derive(Debug, Default)]
pub struct ConversationRegistry {
    conversations: DashMap<ActorRef, ConversationState>,
}

impl ConversationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start_or_extend(&self, npc_ref: ActorRef, target_entity: ActorRef, now: DateTime<Utc>, is_participant: bool, previous_goal: Option<PreviousGoal>) {
        let now_ms = now.timestamp_millis();
        if let Some(mut existing) = self.conversations.get_mut(&npc_ref) {
            existing.join(target_entity);
            existing.renew(now_ms, is_participant);
        } else {
            self.conversations.insert(npc_ref, ConversationState::new(npc_ref, target_entity, now_ms, is_participant, previous_goal));
        }
    }

    pub fn get(&self, npc_ref: ActorRef) -> Option<ConversationState> {
        self.conversations.get(&npc_ref).map(|c| c.value().clone())
    }

    pub fn is_in_conversation(&self, actor: ActorRef) -> bool {
        self.conversations.iter().any(|c| c.participants.contains(&actor))
    }

    /// End a conversation, returning the restored goal if any (spec.md
    /// §4.6: "Ending restores the saved goal (if any) or resumes
    /// wandering").
    pub fn end(&self, npc_ref: ActorRef, _reason: EndReason) -> Option<PreviousGoal> {
        self.conversations.remove(&npc_ref).and_then(|(_, state)| state.previous_goal)
    }

    pub fn renew(&self, npc_ref: ActorRef, now: DateTime<Utc>, is_participant: bool) {
        if let Some(mut state) = self.conversations.get_mut(&npc_ref) {
            state.renew(now.timestamp_millis(), is_participant);
        }
    }

    /// Sweep for timed-out conversations (run alongside the engagement
    /// sweep, spec.md §4.6).
    pub fn sweep_timeouts(&self, now: DateTime<Utc>) -> Vec<ActorRef> {
        let now_ms = now.timestamp_millis();
        let expired: Vec<ActorRef> = self
            .conversations
            .iter()
            .filter(|c| c.has_timed_out(now_ms))
            .map(|c| *c.key())
            .collect();
        for npc_ref in &expired {
            self.end(*npc_ref, EndReason::Timeout);
        }
        expired
    }

    pub fn leave_all(&self, actor: ActorRef) {
        let npcs: Vec<ActorRef> = self.conversations.iter().filter(|c| c.participants.contains(&actor)).map(|c| *c.key()).collect();
        for npc_ref in npcs {
            if let Some(mut state) = self.conversations.get_mut(&npc_ref) {
                state.leave(actor);
                if state.participants.len() < 2 {
                    drop(state);
                    self.end(npc_ref, EndReason::ParticipantLeft);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_ends_exactly_at_attention_span() {
        let npc = ActorRef::new();
        let target = ActorRef::new();
        let now = Utc::now();
        let registry = ConversationRegistry::new();
        registry.start_or_extend(npc, target, now, true, None);

        let just_before = now + chrono::Duration::milliseconds(PARTICIPANT_ATTENTION_SPAN_MS - 1);
        assert!(registry.sweep_timeouts(just_before).is_empty());

        let exactly_at = now + chrono::Duration::milliseconds(PARTICIPANT_ATTENTION_SPAN_MS);
        let expired = registry.sweep_timeouts(exactly_at);
        assert_eq!(expired, vec![npc]);
    }

    #[test]
    fn leaving_drops_conversation_below_two_participants() {
        let npc = ActorRef::new();
        let target = ActorRef::new();
        let registry = ConversationRegistry::new();
        registry.start_or_extend(npc, target, Utc::now(), true, None);
        registry.leave_all(target);
        assert!(registry.get(npc).is_none());
    }

    #[test]
    fn renew_pushes_timeout_forward() {
        let npc = ActorRef::new();
        let target = ActorRef::new();
        let now = Utc::now();
        let registry = ConversationRegistry::new();
        registry.start_or_extend(npc, target, now, true, None);
        let later = now + chrono::Duration::seconds(10);
        registry.renew(npc, later, true);
        let state = registry.get(npc).unwrap();
        assert_eq!(state.timeout_at_ms, later.timestamp_millis() + PARTICIPANT_ATTENTION_SPAN_MS);
    }
}
