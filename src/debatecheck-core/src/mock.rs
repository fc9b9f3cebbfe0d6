//! Scripted backend for tests and offline dry runs.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::backend::CompletionBackend;
use crate::error::{DebateError, Result};

/// One recorded call to the mock, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
}

/// A backend that replays scripted responses and records every prompt it is
/// given. With an empty script, single calls answer `resp-<n>` from a global
/// call counter and batched calls answer `resp-<i>` indexed within the batch.
pub struct MockBackend {
    script: Mutex<VecDeque<String>>,
    constant_response: Option<String>,
    calls: Mutex<Vec<RecordedCall>>,
    counter: AtomicUsize,
    batched: bool,
    fail_batch: bool,
    fail_markers: Vec<String>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            constant_response: None,
            calls: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
            batched: false,
            fail_batch: false,
            fail_markers: Vec::new(),
        }
    }

    /// Queue responses consumed front-to-back before falling back to the
    /// synthesized `resp-<n>` form.
    pub fn with_script(responses: Vec<String>) -> Self {
        let mut mock = Self::new();
        mock.script = Mutex::new(responses.into());
        mock
    }

    /// Always answer with the same text.
    pub fn constant(response: &str) -> Self {
        let mut mock = Self::new();
        mock.constant_response = Some(response.to_string());
        mock
    }

    /// Advertise the batched call path to the scheduler.
    pub fn batched(mut self) -> Self {
        self.batched = true;
        self
    }

    /// Make every batched call fail (the single-call path keeps working), to
    /// exercise the scheduler's sequential fallback.
    pub fn failing_batch(mut self) -> Self {
        self.fail_batch = true;
        self
    }

    /// Fail any single call whose user prompt contains `marker`. Used to
    /// prove resumed runs never touch the backend for completed ids.
    pub fn fail_when_user_contains(mut self, marker: &str) -> Self {
        self.fail_markers.push(marker.to_string());
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("mock calls lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock calls lock").len()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: u32,
    ) -> Result<String> {
        self.calls.lock().expect("mock calls lock").push(RecordedCall {
            system: system_prompt.to_string(),
            user: user_prompt.to_string(),
            max_tokens,
        });
        for marker in &self.fail_markers {
            if user_prompt.contains(marker) {
                return Err(DebateError::Backend(format!(
                    "mock backend refused prompt containing {marker:?}"
                )));
            }
        }
        if let Some(scripted) = self.script.lock().expect("mock script lock").pop_front() {
            return Ok(scripted);
        }
        if let Some(constant) = &self.constant_response {
            return Ok(constant.clone());
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("resp-{n}"))
    }

    async fn generate_batch(
        &self,
        system_prompts: &[String],
        user_prompts: &[String],
        max_tokens: u32,
    ) -> Result<Vec<String>> {
        if system_prompts.len() != user_prompts.len() {
            return Err(DebateError::BatchShape {
                expected: system_prompts.len(),
                got: user_prompts.len(),
            });
        }
        if self.fail_batch {
            return Err(DebateError::Backend("mock batch failure".to_string()));
        }
        let mut calls = self.calls.lock().expect("mock calls lock");
        let mut outputs = Vec::with_capacity(user_prompts.len());
        for (i, (system, user)) in system_prompts.iter().zip(user_prompts).enumerate() {
            calls.push(RecordedCall {
                system: system.clone(),
                user: user.clone(),
                max_tokens,
            });
            outputs.push(format!("resp-{i}"));
        }
        Ok(outputs)
    }

    fn supports_batch(&self) -> bool {
        self.batched
    }
}
