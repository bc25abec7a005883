// Murattil - guided Quran-recitation trainer engine.
//
// The engine shows a verse, hands the learner's recording to a transcription
// backend, scores the recognized text against the verse and advances a
// persistent cursor through the corpus on a passing attempt.

pub mod arabic;
pub mod config;
pub mod corpus;
pub mod engine;
pub mod persistence;
pub mod progress;
pub mod similarity;
pub mod transcription;
pub mod verification;

pub use corpus::{Corpus, Verse, TOTAL_CHAPTERS};
pub use engine::{AttemptReport, RecitationEngine};
pub use persistence::{JsonFileStore, MemoryStore, ProgressStore};
pub use progress::{AdvanceOutcome, CurrentVerse, CursorState, Navigator};
pub use transcription::{
    LocalWhisperProvider, ProviderStatus, RemoteWhisperProvider, TranscriptionErrorKind,
    TranscriptionOutcome, TranscriptionProvider,
};
pub use verification::{verify, VerificationResult, Verdict, DEFAULT_PASS_THRESHOLD};
