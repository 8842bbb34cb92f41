//! Loader for turn-level ConvFinQA-style dataset files.
//!
//! Each record in the JSON array is one turn carrying the full annotation of
//! its dialogue. Records are grouped by base dialogue id, sorted by turn
//! index, and the document context is assembled once per dialogue from the
//! first record.

use std::{collections::HashMap, fs, path::Path};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::eval::extract::coerce_numeric;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode dataset json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("record {id} has turn_ind {turn_ind} outside its dialogue_break")]
    TurnIndexOutOfRange { id: String, turn_ind: usize },
}

#[derive(Debug, Clone, Deserialize)]
pub struct TurnRecord {
    pub id: String,
    pub annotation: TurnAnnotation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TurnAnnotation {
    pub turn_ind: usize,
    pub dialogue_break: Vec<String>,
    pub exe_ans: Value,
    #[serde(default)]
    pub amt_table: String,
    #[serde(default)]
    pub amt_pre_text: String,
    #[serde(default)]
    pub amt_post_text: String,
}

#[derive(Debug, Clone)]
pub struct DialogueTurn {
    pub question: String,
    pub gold_answer: f64,
    pub turn_index: usize,
}

#[derive(Debug, Clone)]
pub struct Dialogue {
    pub dialogue_id: String,
    pub document_context: String,
    pub turns: Vec<DialogueTurn>,
}

pub fn load_dialogues(path: &Path) -> Result<Vec<Dialogue>, DatasetError> {
    let contents = fs::read_to_string(path)?;
    let records: Vec<TurnRecord> = serde_json::from_str(&contents)?;
    group_dialogues(records)
}

/// Strip the trailing `_<turn>` segment from a full record id, e.g.
/// `Single_HIG/2004/page_122.pdf-2_1` belongs to dialogue
/// `Single_HIG/2004/page_122.pdf-2`.
pub fn base_dialogue_id(full_id: &str) -> &str {
    match full_id.rsplit_once('_') {
        Some((base, suffix))
            if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) =>
        {
            base
        }
        _ => full_id,
    }
}

pub fn group_dialogues(records: Vec<TurnRecord>) -> Result<Vec<Dialogue>, DatasetError> {
    // Group by base id, keeping first-seen dialogue order.
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<TurnRecord>> = HashMap::new();
    for record in records {
        let base = base_dialogue_id(&record.id).to_string();
        if !groups.contains_key(&base) {
            order.push(base.clone());
        }
        groups.entry(base).or_default().push(record);
    }

    let mut dialogues = Vec::with_capacity(order.len());
    for dialogue_id in order {
        let Some(mut group) = groups.remove(&dialogue_id) else {
            continue;
        };
        group.sort_by_key(|record| record.annotation.turn_ind);

        let document_context = document_context(&group[0].annotation);
        let mut turns = Vec::with_capacity(group.len());
        for record in &group {
            let annotation = &record.annotation;
            let question = annotation
                .dialogue_break
                .get(annotation.turn_ind)
                .ok_or_else(|| DatasetError::TurnIndexOutOfRange {
                    id: record.id.clone(),
                    turn_ind: annotation.turn_ind,
                })?
                .clone();

            let Some(gold_answer) = gold_value(&annotation.exe_ans) else {
                warn!(id = %record.id, gold = %annotation.exe_ans, "skipping turn with non-numeric gold answer");
                continue;
            };

            // Reindex contiguously from 0 in case a turn was skipped.
            turns.push(DialogueTurn {
                question,
                gold_answer,
                turn_index: turns.len(),
            });
        }

        if turns.is_empty() {
            warn!(dialogue = %dialogue_id, "skipping dialogue with no numeric turns");
            continue;
        }

        dialogues.push(Dialogue {
            dialogue_id,
            document_context,
            turns,
        });
    }

    Ok(dialogues)
}

fn gold_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => coerce_numeric(text),
        _ => None,
    }
}

fn document_context(annotation: &TurnAnnotation) -> String {
    format!(
        "Text before table:\n{}\n\nHTML Table:\n{}\n\nText after table:\n{}",
        annotation.amt_pre_text, annotation.amt_table, annotation.amt_post_text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, turn_ind: usize, questions: &[&str], exe_ans: Value) -> TurnRecord {
        TurnRecord {
            id: id.to_string(),
            annotation: TurnAnnotation {
                turn_ind,
                dialogue_break: questions.iter().map(|q| q.to_string()).collect(),
                exe_ans,
                amt_table: "<table></table>".to_string(),
                amt_pre_text: "pre".to_string(),
                amt_post_text: "post".to_string(),
            },
        }
    }

    #[test]
    fn base_id_strips_trailing_turn_segment() {
        assert_eq!(
            base_dialogue_id("Single_HIG/2004/page_122.pdf-2_1"),
            "Single_HIG/2004/page_122.pdf-2"
        );
        assert_eq!(base_dialogue_id("dialogue_12"), "dialogue");
        assert_eq!(base_dialogue_id("no-turn-suffix"), "no-turn-suffix");
    }

    #[test]
    fn groups_and_sorts_turns_by_index() {
        let questions = ["price in 2007?", "price in 2005?", "change?"];
        let records = vec![
            record("d_1_2", 2, &questions, json!(35.8)),
            record("d_1_0", 0, &questions, json!(60.94)),
            record("d_1_1", 1, &questions, json!("25.14")),
        ];

        let dialogues = group_dialogues(records).expect("grouping succeeds");
        assert_eq!(dialogues.len(), 1);
        let dialogue = &dialogues[0];
        assert_eq!(dialogue.dialogue_id, "d_1");
        assert_eq!(dialogue.turns.len(), 3);
        assert_eq!(dialogue.turns[0].question, "price in 2007?");
        assert_eq!(dialogue.turns[0].gold_answer, 60.94);
        assert_eq!(dialogue.turns[1].gold_answer, 25.14);
        assert_eq!(
            dialogue
                .turns
                .iter()
                .map(|turn| turn.turn_index)
                .collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn keeps_first_seen_dialogue_order() {
        let records = vec![
            record("b_5_0", 0, &["q"], json!(1.0)),
            record("a_9_0", 0, &["q"], json!(2.0)),
        ];

        let dialogues = group_dialogues(records).expect("grouping succeeds");
        let ids: Vec<&str> = dialogues.iter().map(|d| d.dialogue_id.as_str()).collect();
        assert_eq!(ids, vec!["b_5", "a_9"]);
    }

    #[test]
    fn skips_non_numeric_gold_and_reindexes() {
        let questions = ["is it up?", "by how much?"];
        let records = vec![
            record("d_2_0", 0, &questions, json!("yes")),
            record("d_2_1", 1, &questions, json!(14.1)),
        ];

        let dialogues = group_dialogues(records).expect("grouping succeeds");
        assert_eq!(dialogues[0].turns.len(), 1);
        assert_eq!(dialogues[0].turns[0].turn_index, 0);
        assert_eq!(dialogues[0].turns[0].question, "by how much?");
    }

    #[test]
    fn out_of_range_turn_index_is_an_error() {
        let records = vec![record("d_3_0", 4, &["only one"], json!(1.0))];
        assert!(matches!(
            group_dialogues(records),
            Err(DatasetError::TurnIndexOutOfRange { .. })
        ));
    }

    #[test]
    fn document_context_labels_all_sections() {
        let records = vec![record("d_4_0", 0, &["q"], json!(3.0))];
        let dialogues = group_dialogues(records).expect("grouping succeeds");
        let context = &dialogues[0].document_context;
        assert!(context.contains("Text before table:\npre"));
        assert!(context.contains("HTML Table:\n<table></table>"));
        assert!(context.contains("Text after table:\npost"));
    }
}
