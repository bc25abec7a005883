// src/engine.rs
//
// Attempt orchestrator: wires the transcription provider, the verification
// policy and the progress navigator into a single submit_attempt call.
// The cursor only ever moves here, after a Pass verdict.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::corpus::Corpus;
use crate::persistence::{load_cursor, save_cursor, ProgressStore};
use crate::progress::{AdvanceOutcome, CurrentVerse, CursorState, Navigator};
use crate::transcription::{TranscriptionErrorKind, TranscriptionOutcome, TranscriptionProvider};
use crate::verification::{verify, VerificationResult};

/// Everything the UI needs to render one attempt.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptReport {
    pub chapter_number: u32,
    pub verse_number: u32,
    pub verification: VerificationResult,
    /// Present when the provider failed; the verdict is then a Fail over
    /// empty recognized text and the user can simply retry.
    pub error_kind: Option<TranscriptionErrorKind>,
    pub advanced: bool,
    /// Set on the attempt that passes the last verse of the last chapter.
    pub corpus_exhausted: bool,
    pub timestamp: DateTime<Utc>,
}

pub struct RecitationEngine<P: TranscriptionProvider> {
    navigator: Navigator,
    provider: P,
    store: Box<dyn ProgressStore>,
    language: String,
    pass_threshold: f64,
    time_budget: Duration,
    in_flight: Arc<AtomicBool>,
    attempts: u32,
    passes: u32,
}

impl<P: TranscriptionProvider> RecitationEngine<P> {
    /// Build the engine and restore the cursor from the store. A missing or
    /// malformed persisted position starts the session at 1:1.
    pub fn new(
        corpus: Corpus,
        provider: P,
        store: Box<dyn ProgressStore>,
        language: &str,
        pass_threshold: f64,
        time_budget: Duration,
    ) -> Self {
        let mut navigator = Navigator::new(corpus);
        navigator.restore(load_cursor(store.as_ref()));
        Self {
            navigator,
            provider,
            store,
            language: language.to_string(),
            pass_threshold,
            time_budget,
            in_flight: Arc::new(AtomicBool::new(false)),
            attempts: 0,
            passes: 0,
        }
    }

    pub fn cursor(&self) -> CursorState {
        self.navigator.cursor()
    }

    pub fn current_verse(&self) -> Result<CurrentVerse<'_>, String> {
        self.navigator.current_verse()
    }

    pub fn is_completed(&self) -> bool {
        self.navigator.cursor() == CursorState::Completed
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn passes(&self) -> u32 {
        self.passes
    }

    /// Run one full attempt against the verse under the cursor.
    ///
    /// A provider failure never unwinds: it degrades to a Fail verdict over
    /// empty recognized text, annotated with the error kind, and the cursor
    /// stays where it was. Only a Pass moves and persists the cursor.
    pub async fn submit_attempt(&mut self, audio: &Path) -> Result<AttemptReport, String> {
        // At most one outstanding transcription per session; a second call
        // while one is in flight could race the cursor.
        if self.in_flight.swap(true, Ordering::SeqCst) {
            log::warn!("[Engine] Rejecting attempt: another attempt is already in progress");
            return Err("Another attempt is already in progress".to_string());
        }
        let in_flight = Arc::clone(&self.in_flight);
        let _guard = scopeguard::guard((), move |_| {
            in_flight.store(false, Ordering::SeqCst);
        });

        let (chapter_number, verse_number, target_text) = match self.navigator.current_verse()? {
            CurrentVerse::Completed => {
                return Err("All chapters are already completed".to_string());
            }
            CurrentVerse::Verse(verse) => (
                verse.chapter_number,
                verse.verse_number,
                verse.text.clone(),
            ),
        };

        log::info!(
            "[Engine] Attempt on {}:{} with audio '{}'",
            chapter_number,
            verse_number,
            audio.display()
        );

        let outcome = self
            .provider
            .transcribe(audio, &self.language, self.time_budget)
            .await;

        // A failed transcription feeds an empty string to the scorer, which
        // naturally fails against any non-empty verse; the kind rides along
        // for the retry guidance.
        let (recognized_text, error_kind) = match outcome {
            TranscriptionOutcome::Recognized { text } => (text, None),
            TranscriptionOutcome::Failed { kind } => {
                log::warn!("[Engine] Transcription failed: {:?}", kind);
                (String::new(), Some(kind))
            }
        };

        let verification = verify(&recognized_text, &target_text, self.pass_threshold);
        self.attempts += 1;

        let mut advanced = false;
        let mut corpus_exhausted = false;
        if verification.passed() {
            self.passes += 1;
            match self.navigator.advance()? {
                AdvanceOutcome::Moved { chapter, verse } => {
                    advanced = true;
                    // Persistence failure is logged, not fatal: the session
                    // keeps its in-memory cursor and the user keeps going.
                    if let Err(e) = save_cursor(self.store.as_ref(), chapter, verse) {
                        log::error!("[Engine] Failed to persist progress: {}", e);
                    }
                }
                AdvanceOutcome::CorpusExhausted => {
                    advanced = true;
                    corpus_exhausted = true;
                    log::info!("[Engine] Corpus exhausted, recitation complete");
                }
            }
        }

        log::info!(
            "[Engine] Verdict {:?} at {:.1}% for {}:{} (attempt {}, passes {})",
            verification.verdict,
            verification.similarity_percent,
            chapter_number,
            verse_number,
            self.attempts,
            self.passes
        );

        Ok(AttemptReport {
            chapter_number,
            verse_number,
            verification,
            error_kind,
            advanced,
            corpus_exhausted,
            timestamp: Utc::now(),
        })
    }
}
