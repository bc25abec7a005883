// src/corpus.rs
//
// The flattened verse corpus. Built once at startup from the external
// per-chapter collections and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Number of chapters in the complete corpus.
pub const TOTAL_CHAPTERS: u32 = 114;

/// One verse of the corpus. Identity is `(chapter_number, verse_number)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verse {
    pub chapter_number: u32,
    pub verse_number: u32,
    pub text: String,
}

/// Wire shape of one verse record in the external per-chapter input.
#[derive(Debug, Clone, Deserialize)]
pub struct VerseRecord {
    pub verse: u32,
    pub text: String,
}

/// Ordered, flattened verse corpus with per-chapter verse counts and a
/// position index for cursor lookups.
#[derive(Debug, Clone)]
pub struct Corpus {
    verses: Vec<Verse>,
    verse_counts: HashMap<u32, u32>,
    index: HashMap<(u32, u32), usize>,
    chapter_count: u32,
}

impl Corpus {
    /// Flatten the external chapter map (`"1"` .. `"114"` keys, each an
    /// ordered verse list) into canonical chapter-then-verse order.
    ///
    /// Chapters must be contiguous starting at 1 and verses within each
    /// chapter contiguous starting at 1; anything else is a load-time
    /// error. A corpus shorter than the full 114 chapters is accepted
    /// (and logged) so partial corpora can be used for drills.
    pub fn from_chapter_map(chapters: HashMap<String, Vec<VerseRecord>>) -> Result<Self, String> {
        if chapters.is_empty() {
            return Err("Corpus input contains no chapters".to_string());
        }

        let mut numbered: Vec<(u32, Vec<VerseRecord>)> = Vec::with_capacity(chapters.len());
        for (key, records) in chapters {
            let chapter_number: u32 = key
                .parse()
                .map_err(|e| format!("Invalid chapter key '{}': {}", key, e))?;
            numbered.push((chapter_number, records));
        }
        numbered.sort_by_key(|(n, _)| *n);

        let chapter_count = numbered.len() as u32;
        if chapter_count > TOTAL_CHAPTERS {
            return Err(format!(
                "Corpus has {} chapters, expected at most {}",
                chapter_count, TOTAL_CHAPTERS
            ));
        }

        let mut verses = Vec::new();
        let mut verse_counts = HashMap::new();
        let mut index = HashMap::new();

        for (expected, (chapter_number, records)) in (1..).zip(numbered) {
            if chapter_number != expected {
                return Err(format!(
                    "Chapter numbering is not contiguous: expected {}, found {}",
                    expected, chapter_number
                ));
            }
            if records.is_empty() {
                return Err(format!("Chapter {} has no verses", chapter_number));
            }
            verse_counts.insert(chapter_number, records.len() as u32);

            for (expected_verse, record) in (1..).zip(records) {
                if record.verse != expected_verse {
                    return Err(format!(
                        "Verse numbering in chapter {} is not contiguous: expected {}, found {}",
                        chapter_number, expected_verse, record.verse
                    ));
                }
                if record.text.trim().is_empty() {
                    return Err(format!(
                        "Verse {}:{} has empty text",
                        chapter_number, record.verse
                    ));
                }
                index.insert((chapter_number, record.verse), verses.len());
                verses.push(Verse {
                    chapter_number,
                    verse_number: record.verse,
                    text: record.text,
                });
            }
        }

        if chapter_count != TOTAL_CHAPTERS {
            log::warn!(
                "[Corpus] Loaded partial corpus with {} of {} chapters",
                chapter_count,
                TOTAL_CHAPTERS
            );
        }
        log::info!(
            "[Corpus] Flattened {} verses across {} chapters",
            verses.len(),
            chapter_count
        );

        Ok(Self {
            verses,
            verse_counts,
            index,
            chapter_count,
        })
    }

    /// Load the chapter map from a JSON file on disk.
    pub fn from_json_file(path: &Path) -> Result<Self, String> {
        let data = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read corpus file '{}': {}", path.display(), e))?;
        let chapters: HashMap<String, Vec<VerseRecord>> = serde_json::from_str(&data)
            .map_err(|e| format!("Failed to parse corpus JSON '{}': {}", path.display(), e))?;
        Self::from_chapter_map(chapters)
    }

    pub fn get(&self, chapter_number: u32, verse_number: u32) -> Option<&Verse> {
        self.index
            .get(&(chapter_number, verse_number))
            .map(|&i| &self.verses[i])
    }

    pub fn contains(&self, chapter_number: u32, verse_number: u32) -> bool {
        self.index.contains_key(&(chapter_number, verse_number))
    }

    /// Verse count of a chapter, or None for a chapter outside the corpus.
    pub fn verse_count(&self, chapter_number: u32) -> Option<u32> {
        self.verse_counts.get(&chapter_number).copied()
    }

    pub fn chapter_count(&self) -> u32 {
        self.chapter_count
    }

    pub fn total_verses(&self) -> usize {
        self.verses.len()
    }

    /// All verses in canonical flattened order.
    pub fn verses(&self) -> &[Verse] {
        &self.verses
    }
}
