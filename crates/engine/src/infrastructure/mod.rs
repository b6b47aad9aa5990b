pub mod clock;
pub mod storage;

pub use clock::{ClockPort, FixedClock, FixedRandom, RandomPort, SequenceRandom, SystemClock, SystemRandom};
pub use storage::{
    ConversationPresenceTable, InMemoryStorage, PlaceEntityIndex, PlaceIndexEntry, RecordFilter, RecordKind,
    StorageError, StoragePort, StoragePortExt,
};
