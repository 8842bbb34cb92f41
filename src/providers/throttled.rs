use std::time::Duration;

use async_trait::async_trait;

use crate::{
    providers::LLMProvider,
    types::{CompletionRequest, CompletionResponse},
    LLMError,
};

/// Decorator that sleeps before each call. The delay applies per worker, so
/// parallel dialogue evaluation is paced without being globally serialized.
pub struct Throttled<P> {
    inner: P,
    delay: Duration,
}

impl<P> Throttled<P> {
    pub fn new(inner: P, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl<P: LLMProvider> LLMProvider for Throttled<P> {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LLMError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.complete(request).await
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}
