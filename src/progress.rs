// src/progress.rs
//
// Corpus navigator and progress state machine. Owns the cursor over the
// flattened corpus; all mutation is funneled through `advance` and
// `restore` so the state machine stays independently testable.

use serde::{Deserialize, Serialize};

use crate::corpus::{Corpus, Verse};

/// The cursor is always in exactly one of these states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CursorState {
    /// Pointing at a valid verse currently under test.
    Active { chapter: u32, verse: u32 },
    /// Every chapter of the corpus has been exhausted.
    Completed,
}

/// What the cursor currently points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentVerse<'a> {
    Verse(&'a Verse),
    Completed,
}

/// Result of an `advance` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Moved { chapter: u32, verse: u32 },
    /// Terminal informational signal: the last verse of the last chapter
    /// was just passed. Not an error.
    CorpusExhausted,
}

pub struct Navigator {
    corpus: Corpus,
    cursor: CursorState,
}

impl Navigator {
    /// A fresh navigator starts at the first verse of the first chapter.
    pub fn new(corpus: Corpus) -> Self {
        Self {
            corpus,
            cursor: CursorState::Active { chapter: 1, verse: 1 },
        }
    }

    pub fn cursor(&self) -> CursorState {
        self.cursor
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    /// Look up the verse at the cursor.
    ///
    /// Fails only if the cursor points at a position absent from the corpus
    /// while not Completed — a cursor/corpus desynchronization bug, never a
    /// normal runtime condition.
    pub fn current_verse(&self) -> Result<CurrentVerse<'_>, String> {
        match self.cursor {
            CursorState::Completed => Ok(CurrentVerse::Completed),
            CursorState::Active { chapter, verse } => match self.corpus.get(chapter, verse) {
                Some(v) => Ok(CurrentVerse::Verse(v)),
                None => {
                    let msg = format!(
                        "Cursor desynchronized from corpus at {}:{}",
                        chapter, verse
                    );
                    log::error!("[Navigator] {}", msg);
                    Err(msg)
                }
            },
        }
    }

    /// Move to the next verse after a passing verification.
    ///
    /// Next verse in the chapter if one remains, else the first verse of
    /// the next chapter, else the Completed state. The caller must only
    /// invoke this after a Pass verdict.
    pub fn advance(&mut self) -> Result<AdvanceOutcome, String> {
        let (chapter, verse) = match self.cursor {
            CursorState::Completed => return Ok(AdvanceOutcome::CorpusExhausted),
            CursorState::Active { chapter, verse } => (chapter, verse),
        };

        let count = self.corpus.verse_count(chapter).ok_or_else(|| {
            let msg = format!("Cursor chapter {} is absent from the corpus", chapter);
            log::error!("[Navigator] {}", msg);
            msg
        })?;

        let next = if verse < count {
            Some((chapter, verse + 1))
        } else if chapter < self.corpus.chapter_count() {
            Some((chapter + 1, 1))
        } else {
            None
        };

        match next {
            Some((chapter, verse)) => {
                self.cursor = CursorState::Active { chapter, verse };
                log::debug!("[Navigator] Advanced to {}:{}", chapter, verse);
                Ok(AdvanceOutcome::Moved { chapter, verse })
            }
            None => {
                log::info!("[Navigator] Corpus exhausted after {}:{}", chapter, verse);
                self.cursor = CursorState::Completed;
                Ok(AdvanceOutcome::CorpusExhausted)
            }
        }
    }

    /// Adopt a persisted position if it is valid in this corpus; anything
    /// missing, malformed or out of range degrades to the start position.
    pub fn restore(&mut self, persisted: Option<(u32, u32)>) {
        match persisted {
            Some((chapter, verse)) if self.corpus.contains(chapter, verse) => {
                self.cursor = CursorState::Active { chapter, verse };
                log::info!("[Navigator] Restored cursor to {}:{}", chapter, verse);
            }
            Some((chapter, verse)) => {
                log::warn!(
                    "[Navigator] Persisted position {}:{} is outside the corpus, resetting to 1:1",
                    chapter,
                    verse
                );
                self.cursor = CursorState::Active { chapter: 1, verse: 1 };
            }
            None => {
                self.cursor = CursorState::Active { chapter: 1, verse: 1 };
            }
        }
    }

    /// Snapshot safe to hand to the progress store. None once Completed.
    pub fn persistable_state(&self) -> Option<(u32, u32)> {
        match self.cursor {
            CursorState::Active { chapter, verse } => Some((chapter, verse)),
            CursorState::Completed => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::test_support::corpus_from_counts;

    #[test]
    fn test_starts_at_first_verse() {
        let nav = Navigator::new(corpus_from_counts(&[(1, 7)]));
        assert_eq!(nav.cursor(), CursorState::Active { chapter: 1, verse: 1 });
    }

    #[test]
    fn test_advance_within_chapter() {
        let mut nav = Navigator::new(corpus_from_counts(&[(1, 7), (2, 3)]));
        assert_eq!(
            nav.advance().unwrap(),
            AdvanceOutcome::Moved { chapter: 1, verse: 2 }
        );
    }

    #[test]
    fn test_advance_crosses_chapter_boundary() {
        // Chapter 1 has 7 verses; from (1,7) the cursor moves to (2,1).
        let mut nav = Navigator::new(corpus_from_counts(&[(1, 7), (2, 3)]));
        nav.restore(Some((1, 7)));
        assert_eq!(
            nav.advance().unwrap(),
            AdvanceOutcome::Moved { chapter: 2, verse: 1 }
        );
    }

    #[test]
    fn test_advance_past_last_verse_completes() {
        let mut nav = Navigator::new(corpus_from_counts(&[(1, 2), (2, 3)]));
        nav.restore(Some((2, 3)));
        assert_eq!(nav.advance().unwrap(), AdvanceOutcome::CorpusExhausted);
        assert_eq!(nav.cursor(), CursorState::Completed);
        // A later lookup reports completion rather than a verse.
        assert!(matches!(nav.current_verse().unwrap(), CurrentVerse::Completed));
        // And advancing again stays terminal.
        assert_eq!(nav.advance().unwrap(), AdvanceOutcome::CorpusExhausted);
    }

    #[test]
    fn test_completion_after_chapter_114() {
        // Full-size corpus: one verse per chapter, all 114 chapters.
        let counts: Vec<(u32, u32)> = (1..=114).map(|c| (c, 1)).collect();
        let mut nav = Navigator::new(corpus_from_counts(&counts));

        nav.restore(Some((113, 1)));
        assert_eq!(
            nav.advance().unwrap(),
            AdvanceOutcome::Moved { chapter: 114, verse: 1 }
        );
        assert_eq!(nav.advance().unwrap(), AdvanceOutcome::CorpusExhausted);
        assert!(matches!(nav.current_verse().unwrap(), CurrentVerse::Completed));
    }

    #[test]
    fn test_current_verse_resolves_cursor() {
        let nav = Navigator::new(corpus_from_counts(&[(1, 7)]));
        match nav.current_verse().unwrap() {
            CurrentVerse::Verse(v) => {
                assert_eq!((v.chapter_number, v.verse_number), (1, 1));
            }
            CurrentVerse::Completed => panic!("expected an active verse"),
        }
    }

    #[test]
    fn test_restore_round_trip() {
        let mut nav = Navigator::new(corpus_from_counts(&[(1, 7), (2, 3)]));
        nav.restore(Some((2, 2)));
        let snapshot = nav.persistable_state();
        nav.restore(snapshot);
        assert_eq!(nav.cursor(), CursorState::Active { chapter: 2, verse: 2 });
    }

    #[test]
    fn test_restore_out_of_range_degrades_to_start() {
        let mut nav = Navigator::new(corpus_from_counts(&[(1, 7)]));
        nav.restore(Some((9999, 1)));
        assert_eq!(nav.cursor(), CursorState::Active { chapter: 1, verse: 1 });

        nav.restore(Some((1, 9999)));
        assert_eq!(nav.cursor(), CursorState::Active { chapter: 1, verse: 1 });
    }

    #[test]
    fn test_restore_missing_defaults_to_start() {
        let mut nav = Navigator::new(corpus_from_counts(&[(1, 7)]));
        nav.restore(Some((1, 5)));
        nav.restore(None);
        assert_eq!(nav.cursor(), CursorState::Active { chapter: 1, verse: 1 });
    }

    #[test]
    fn test_persistable_state_none_when_completed() {
        let mut nav = Navigator::new(corpus_from_counts(&[(1, 1)]));
        nav.advance().unwrap();
        assert_eq!(nav.persistable_state(), None);
    }
}
