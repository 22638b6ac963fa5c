//! Scripted model provider for unit tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sentinel_llm::{CompletionRequest, CompletionResponse, LLMError, LLMProvider};

use crate::config::SentinelConfig;
use crate::llm::ModelClient;

type Responder = Box<dyn Fn(&CompletionRequest) -> Result<String, LLMError> + Send + Sync>;

enum Script {
    Queue(Mutex<VecDeque<String>>),
    Respond(Responder),
    Fail,
}

/// Replays canned completions and records every request it receives
pub struct ScriptedProvider {
    script: Script,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedProvider {
    /// Answer with each response in turn; errors once the queue is empty
    pub fn new<S: Into<String>>(responses: impl IntoIterator<Item = S>) -> Self {
        Self::with_script(Script::Queue(Mutex::new(
            responses.into_iter().map(Into::into).collect(),
        )))
    }

    /// Answer by inspecting the request
    pub fn from_fn(f: impl Fn(&CompletionRequest) -> Result<String, LLMError> + Send + Sync + 'static) -> Self {
        Self::with_script(Script::Respond(Box::new(f)))
    }

    /// Fail every call
    pub fn failing() -> Self {
        Self::with_script(Script::Fail)
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Client bound to this provider with default settings
    pub fn client(self: &Arc<Self>) -> ModelClient {
        ModelClient::new(self.clone(), &SentinelConfig::default())
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn complete(&self, request: CompletionRequest) -> sentinel_llm::Result<CompletionResponse> {
        let text = match &self.script {
            Script::Queue(queue) => queue
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| LLMError::RequestFailed("script exhausted".to_string())),
            Script::Respond(f) => f(&request),
            Script::Fail => Err(LLMError::RequestFailed("scripted failure".to_string())),
        };
        self.requests.lock().unwrap().push(request);
        text.map(CompletionResponse::from_text)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
