pub mod envelope;
pub mod horse;
pub mod race;

pub use envelope::{
    CommandFailure, ENVELOPE_SCHEMA_VERSION, Envelope, EnvelopeMeta, EnvelopeNotice, FailureKind,
};
pub use horse::{Bloodline, CareerStats, FinishCounts, HistoryRow, HorseProfile, MarksRecord};
pub use race::{
    EntryKey, EntryRow, Grade, Meeting, RaceCardEntry, RaceDate, RaceKey,
    RaceListing, RaceSummary, SaddleNumber,
};
