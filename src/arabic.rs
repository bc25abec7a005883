// src/arabic.rs
//
// Arabic text normalization for recitation comparison.
// Strips tashkeel and anything outside the Arabic script blocks so that two
// renderings of the same verse compare on consonantal content only.

use once_cell::sync::Lazy;
use regex::Regex;

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Harakat/tashkeel combining marks plus the superscript alef (dagger alef).
/// These carry pronunciation nuance the trainer does not grade.
#[inline]
fn is_diacritic(c: char) -> bool {
    matches!(c, '\u{064B}'..='\u{065F}' | '\u{0670}')
}

/// Arabic-script Unicode blocks: basic Arabic, Arabic Supplement,
/// Arabic Extended-A, Presentation Forms A and B.
#[inline]
fn is_arabic_script(c: char) -> bool {
    let code = c as u32;
    (0x0600..=0x06FF).contains(&code)
        || (0x0750..=0x077F).contains(&code)
        || (0x08A0..=0x08FF).contains(&code)
        || (0xFB50..=0xFDFF).contains(&code)
        || (0xFE70..=0xFEFF).contains(&code)
}

/// Normalize text for comparison.
///
/// Removes diacritics, drops every character outside the Arabic script
/// blocks (Latin letters, digits, punctuation), then collapses whitespace
/// runs to single spaces and trims. Pure and idempotent; a fully
/// non-Arabic input normalizes to the empty string.
pub fn normalize(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    let mut kept = String::with_capacity(input.len());
    for c in input.chars() {
        if is_diacritic(c) {
            continue;
        }
        if c.is_whitespace() {
            kept.push(' ');
            continue;
        }
        if is_arabic_script(c) {
            kept.push(c);
        }
    }

    // Whitespace cleanup is the final step so dropped characters cannot
    // leave double spaces behind.
    WHITESPACE_RUN.replace_all(kept.trim(), " ").into_owned()
}
