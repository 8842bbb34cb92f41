//! Drives dialogues through their turns and scores each answer.

use std::sync::Arc;

use futures_util::future::join_all;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::{
    dataset::{Dialogue, DialogueTurn},
    eval::{
        extract::{coerce_numeric, extract},
        report::{AggregateResult, DialogueResult, ErrorKind, RunReport, TurnResult},
        tolerance,
    },
    memory::ConversationMemory,
    prompt,
    providers::LLMProvider,
    types::CompletionRequest,
};

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("dialogue {0} has no turns")]
    EmptyDialogue(String),
}

/// Explicit configuration handed to the evaluator at construction.
#[derive(Debug, Clone)]
pub struct EvalConfig {
    pub model_name: String,
    pub temperature: f32,
    pub relative_tolerance: f64,
    pub absolute_tolerance: f64,
    /// Cap on how many dialogues a run processes, applied before evaluation.
    pub max_dialogues: Option<usize>,
    /// How many dialogues may be evaluated concurrently. Turns within a
    /// dialogue always run sequentially.
    pub concurrency: usize,
    pub system_instructions: String,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            model_name: "gpt-4o".to_string(),
            temperature: 0.1,
            relative_tolerance: tolerance::DEFAULT_RELATIVE_TOLERANCE,
            absolute_tolerance: tolerance::DEFAULT_ABSOLUTE_TOLERANCE,
            max_dialogues: None,
            concurrency: 1,
            system_instructions: prompt::DEFAULT_SYSTEM_INSTRUCTIONS.to_string(),
        }
    }
}

pub struct DialogueEvaluator {
    provider: Arc<dyn LLMProvider>,
    config: EvalConfig,
}

impl DialogueEvaluator {
    pub fn new(provider: Arc<dyn LLMProvider>, config: EvalConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Evaluate one dialogue turn by turn. Later turns may depend on earlier
    /// answers through the conversation history, so turns never run in
    /// parallel. A failed turn is recorded and the dialogue continues.
    pub async fn evaluate_dialogue(&self, dialogue: &Dialogue) -> Result<DialogueResult, EvalError> {
        if dialogue.turns.is_empty() {
            return Err(EvalError::EmptyDialogue(dialogue.dialogue_id.clone()));
        }

        let mut memory = ConversationMemory::new();
        memory.reset(&self.config.system_instructions, &dialogue.document_context);

        let mut turns = Vec::with_capacity(dialogue.turns.len());
        for turn in &dialogue.turns {
            memory.append_user(turn.question.clone());

            let request =
                CompletionRequest::new(&self.config.model_name, memory.snapshot().to_vec())
                    .with_temperature(self.config.temperature);

            let result = match self.provider.complete(request).await {
                Ok(response) => {
                    let raw = response.text().to_string();
                    let result = self.judge_turn(turn, &raw);
                    memory.append_assistant(raw);
                    result
                }
                Err(err) => {
                    warn!(
                        dialogue = %dialogue.dialogue_id,
                        turn = turn.turn_index,
                        error = %err,
                        "provider call failed"
                    );
                    // Empty placeholder keeps user/assistant alternation
                    // without repeating the question.
                    memory.append_assistant("");
                    TurnResult {
                        turn_index: turn.turn_index,
                        question: turn.question.clone(),
                        predicted: None,
                        gold: turn.gold_answer,
                        is_match: false,
                        parsed: None,
                        error: Some(ErrorKind::Provider),
                    }
                }
            };

            debug!(
                dialogue = %dialogue.dialogue_id,
                turn = result.turn_index,
                predicted = ?result.predicted,
                gold = result.gold,
                is_match = result.is_match,
                memory_len = memory.len(),
                "turn evaluated"
            );
            turns.push(result);
        }

        Ok(DialogueResult::from_turns(
            dialogue.dialogue_id.clone(),
            turns,
        ))
    }

    fn judge_turn(&self, turn: &DialogueTurn, raw: &str) -> TurnResult {
        let parsed = extract(raw).into_parsed();

        let (predicted, is_match, error) = if parsed.answer.trim().is_empty() {
            (None, false, Some(ErrorKind::Parse))
        } else {
            match coerce_numeric(&parsed.answer) {
                Some(predicted) => {
                    let is_match = tolerance::matches(
                        predicted,
                        turn.gold_answer,
                        self.config.relative_tolerance,
                        self.config.absolute_tolerance,
                    );
                    (Some(predicted), is_match, None)
                }
                None => (None, false, Some(ErrorKind::NumericCoercion)),
            }
        };

        TurnResult {
            turn_index: turn.turn_index,
            question: turn.question.clone(),
            predicted,
            gold: turn.gold_answer,
            is_match,
            parsed: Some(parsed),
            error,
        }
    }

    /// Evaluate a batch of dialogues, up to `max_dialogues`. Dialogues are
    /// independent, so they run under a bounded-concurrency gate; each worker
    /// owns its private memory and the per-dialogue aggregates are summed
    /// once every dialogue has finished.
    pub async fn evaluate_all(&self, dialogues: &[Dialogue]) -> Result<RunReport, EvalError> {
        let capped = match self.config.max_dialogues {
            Some(cap) => &dialogues[..cap.min(dialogues.len())],
            None => dialogues,
        };

        if let Some(empty) = capped.iter().find(|dialogue| dialogue.turns.is_empty()) {
            return Err(EvalError::EmptyDialogue(empty.dialogue_id.clone()));
        }

        let gate = Arc::new(Semaphore::new(self.config.concurrency.max(1)));
        let evaluations = capped.iter().map(|dialogue| {
            let gate = Arc::clone(&gate);
            async move {
                let _permit = gate.acquire().await.ok();
                self.evaluate_dialogue(dialogue).await
            }
        });

        let mut report = RunReport {
            dialogues: Vec::with_capacity(capped.len()),
            aggregate: AggregateResult::default(),
        };
        for result in join_all(evaluations).await {
            let dialogue_result = result?;
            info!(
                dialogue = %dialogue_result.dialogue_id,
                correct = dialogue_result.correct,
                total = dialogue_result.total,
                errors = dialogue_result.errors,
                "dialogue evaluated"
            );
            report.aggregate.absorb(&dialogue_result);
            report.dialogues.push(dialogue_result);
        }

        Ok(report)
    }
}
