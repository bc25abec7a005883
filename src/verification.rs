// src/verification.rs
//
// Pass/fail policy over the similarity score. Pure, stateless; knows nothing
// about the corpus, the cursor or persistence.

use serde::{Deserialize, Serialize};

use crate::similarity::similarity;

/// Default pass threshold, matching the reference trainer behavior.
pub const DEFAULT_PASS_THRESHOLD: f64 = 70.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Pass,
    Fail,
}

/// Outcome of a single recitation attempt, produced per attempt for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub verdict: Verdict,
    pub similarity_percent: f64,
    pub recognized_text: String,
    pub target_text: String,
}

impl VerificationResult {
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }
}

/// Score `recognized` against `target` and apply the threshold.
/// Pass iff the similarity percentage is at least `threshold`.
pub fn verify(recognized: &str, target: &str, threshold: f64) -> VerificationResult {
    let similarity_percent = similarity(recognized, target);
    let verdict = if similarity_percent >= threshold {
        Verdict::Pass
    } else {
        Verdict::Fail
    };

    VerificationResult {
        verdict,
        similarity_percent,
        recognized_text: recognized.to_string(),
        target_text: target.to_string(),
    }
}
