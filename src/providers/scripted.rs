use std::{collections::VecDeque, sync::Mutex};

use async_trait::async_trait;

use crate::{
    providers::LLMProvider,
    types::{ChatMessage, CompletionRequest, CompletionResponse},
    LLMError,
};

/// One canned reply: either assistant text or a simulated provider failure.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Text(String),
    Failure(String),
}

/// Provider that serves replies from a fixed queue. Used by tests to drive
/// the evaluator without a network.
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ScriptedReply>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
        }
    }

    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            texts
                .into_iter()
                .map(|text| ScriptedReply::Text(text.into()))
                .collect(),
        )
    }

    fn next_reply(&self) -> Option<ScriptedReply> {
        self.replies
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LLMError> {
        match self.next_reply() {
            Some(ScriptedReply::Text(text)) => Ok(CompletionResponse {
                message: ChatMessage::assistant(text),
                usage: None,
            }),
            Some(ScriptedReply::Failure(message)) => Err(LLMError::Provider(message)),
            None => Err(LLMError::Provider(
                "no more scripted replies".to_string(),
            )),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}
