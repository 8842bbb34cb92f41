use serde::Serialize;

use crate::eval::extract::ParsedAnswer;

/// Turn-scoped, non-fatal failure classes. Each is recorded on its
/// [`TurnResult`] and counts toward `errors` and `total`, never `correct`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The model invocation returned an error or timed out.
    Provider,
    /// The response yielded no usable answer string.
    Parse,
    /// An answer string was present but not convertible to a number.
    NumericCoercion,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnResult {
    pub turn_index: usize,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predicted: Option<f64>,
    pub gold: f64,
    pub is_match: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed: Option<ParsedAnswer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DialogueResult {
    pub dialogue_id: String,
    pub turns: Vec<TurnResult>,
    pub correct: usize,
    pub errors: usize,
    pub total: usize,
    pub accuracy: f64,
}

impl DialogueResult {
    pub fn from_turns(dialogue_id: String, turns: Vec<TurnResult>) -> Self {
        let total = turns.len();
        let correct = turns.iter().filter(|turn| turn.is_match).count();
        let errors = turns.iter().filter(|turn| turn.error.is_some()).count();
        let accuracy = if total > 0 {
            correct as f64 / total as f64
        } else {
            0.0
        };

        Self {
            dialogue_id,
            turns,
            correct,
            errors,
            total,
            accuracy,
        }
    }
}

/// Counters accumulated across all evaluated dialogues. Partial aggregates
/// from parallel workers merge as a commutative sum.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AggregateResult {
    pub total_questions: usize,
    pub total_correct: usize,
    pub total_errors: usize,
}

impl AggregateResult {
    pub fn accuracy(&self) -> f64 {
        if self.total_questions > 0 {
            self.total_correct as f64 / self.total_questions as f64
        } else {
            0.0
        }
    }

    pub fn absorb(&mut self, dialogue: &DialogueResult) {
        self.total_questions += dialogue.total;
        self.total_correct += dialogue.correct;
        self.total_errors += dialogue.errors;
    }

    pub fn merge(&mut self, other: &AggregateResult) {
        self.total_questions += other.total_questions;
        self.total_correct += other.total_correct;
        self.total_errors += other.total_errors;
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub dialogues: Vec<DialogueResult>,
    pub aggregate: AggregateResult,
}
