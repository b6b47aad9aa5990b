use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            pub fn to_uuid(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

// Actors and places
define_id!(ActorRef);
define_id!(PlaceId);
define_id!(RegionId);

// Intent lifecycle
define_id!(IntentId);

// Correlation groups every envelope belonging to one intent's lifecycle.
// An intent's correlation id is its own id (see spec.md invariants, §3);
// the distinct type keeps "the intent" and "the thread of messages about
// it" from being accidentally interchanged at call sites.
define_id!(CorrelationId);

// Perception
define_id!(PerceptionEventId);

// Timed events
define_id!(EventId);

// Connections between places
define_id!(ConnectionId);

impl From<IntentId> for CorrelationId {
    fn from(value: IntentId) -> Self {
        Self(value.to_uuid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(ActorRef::new(), ActorRef::new());
    }

    #[test]
    fn intent_id_converts_to_correlation_id() {
        let intent = IntentId::new();
        let correlation: CorrelationId = intent.into();
        assert_eq!(correlation.to_uuid(), intent.to_uuid());
    }

    #[test]
    fn display_matches_uuid_format() {
        let id = PlaceId::new();
        assert_eq!(id.to_string().len(), 36);
    }

    #[test]
    fn parses_from_its_own_display_output() {
        let id = ActorRef::new();
        let parsed: ActorRef = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn serde_round_trip() {
        let id = EventId::new();
        let json = serde_json::to_string(&id).expect("serialize");
        let decoded: EventId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id, decoded);
    }
}
