//! System-instructions template handed to the model once per dialogue.

use std::{fs, io, path::Path};

/// Built-in instructions for the financial QA task. The model is told to
/// answer every question with a single JSON object so the extractor has a
/// stable shape to decode.
pub const DEFAULT_SYSTEM_INSTRUCTIONS: &str = "\
You are a financial analyst answering questions about a single financial document.
The document contains text and an HTML table. Questions arrive one at a time and
later questions may refer to earlier questions and answers in this conversation.

For every question respond with exactly one JSON object and nothing else:
{\"used_cells\": [\"<table cells or text values you used>\"], \"calculation\": \"<how you derived the answer>\", \"answer\": \"<the numeric answer>\"}

Rules:
- Use only values present in the provided document or earlier in this conversation.
- \"answer\" must be a single number (a percentage stays as its numeral, e.g. 12.3 for 12.3%).
- Do not include units, explanations, or any text outside the JSON object.";

/// Seed-message body for [`crate::ConversationMemory::reset`].
pub fn compose_system_prompt(instructions: &str, document_context: &str) -> String {
    format!(
        "{instructions}\n\nFinancial Document Content:\n{document_context}\n\n\
         I will ask you multiple questions about this document. \
         Please answer each question with the specified JSON format."
    )
}

/// Load replacement instructions from a file, trimming surrounding whitespace.
pub fn load_instructions(path: &Path) -> io::Result<String> {
    Ok(fs::read_to_string(path)?.trim().to_string())
}
