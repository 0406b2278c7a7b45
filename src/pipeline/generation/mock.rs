use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{GenerationError, GenerationRequest, GenerationTask, LlmClient};

/// Scripted behaviour for one task.
#[derive(Default)]
struct TaskScript {
    /// Replies in call order; the last one repeats once exhausted.
    replies: Vec<Result<String, GenerationError>>,
    delay: Option<Duration>,
}

/// Mock LLM client for testing: returns configurable per-task responses.
///
/// Tasks without a script fail with `NoModelAvailable`.
pub struct MockLlmClient {
    model: String,
    scripts: HashMap<GenerationTask, TaskScript>,
    calls: Mutex<HashMap<GenerationTask, usize>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            model: "mock-medgemma".to_string(),
            scripts: HashMap::new(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_response(mut self, task: GenerationTask, response: &str) -> Self {
        self.scripts
            .entry(task)
            .or_default()
            .replies
            .push(Ok(response.to_string()));
        self
    }

    pub fn with_error(mut self, task: GenerationTask, error: GenerationError) -> Self {
        self.scripts.entry(task).or_default().replies.push(Err(error));
        self
    }

    pub fn with_delay(mut self, task: GenerationTask, delay: Duration) -> Self {
        self.scripts.entry(task).or_default().delay = Some(delay);
        self
    }

    /// Number of generate calls made for a task so far.
    pub fn call_count(&self, task: GenerationTask) -> usize {
        self.calls
            .lock()
            .map(|calls| calls.get(&task).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    fn next_call_index(&self, task: GenerationTask) -> usize {
        match self.calls.lock() {
            Ok(mut calls) => {
                let count = calls.entry(task).or_insert(0);
                let index = *count;
                *count += 1;
                index
            }
            Err(_) => 0,
        }
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let index = self.next_call_index(request.task);
        let Some(script) = self.scripts.get(&request.task) else {
            return Err(GenerationError::NoModelAvailable);
        };

        if let Some(delay) = script.delay {
            tokio::time::sleep(delay).await;
        }

        match script.replies.get(index).or_else(|| script.replies.last()) {
            Some(reply) => reply.clone(),
            None => Err(GenerationError::NoModelAvailable),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn is_available(&self) -> bool {
        true
    }
}
