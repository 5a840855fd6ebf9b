//! Hand-rolled mock collaborators for deterministic tests: no network, no
//! model server. Compiled only for tests or with the `test-support` feature.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::judge::CompletionModel;
use crate::scraper::PageFetcher;
use crate::session::StatusSink;

// --- MockFetcher ---

enum FetchScript {
    Page(String),
    Error(String),
}

/// Fetcher scripted per URL. Unscripted URLs error, which keeps tests honest
/// about exactly which pages the loop touches.
pub struct MockFetcher {
    scripts: HashMap<String, FetchScript>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_page(mut self, url: &str, text: &str) -> Self {
        self.scripts
            .insert(url.to_string(), FetchScript::Page(text.to_string()));
        self
    }

    pub fn with_error(mut self, url: &str, message: &str) -> Self {
        self.scripts
            .insert(url.to_string(), FetchScript::Error(message.to_string()));
        self
    }

    /// Shared handle to the ordered list of fetched URLs.
    pub fn call_log(&self) -> Arc<Mutex<Vec<String>>> {
        self.calls.clone()
    }
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.calls.lock().unwrap().push(url.to_string());
        match self.scripts.get(url) {
            Some(FetchScript::Page(text)) => Ok(text.clone()),
            Some(FetchScript::Error(message)) => Err(anyhow!("{message}")),
            None => Err(anyhow!("no scripted response for {url}")),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// --- MockModel ---

/// Model with a queue of scripted replies, consumed one per `complete` call.
/// Running past the script errors.
pub struct MockModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    calls: Arc<AtomicUsize>,
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            prompts: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_reply(self, reply: &str) -> Self {
        self.replies.lock().unwrap().push_back(Ok(reply.to_string()));
        self
    }

    pub fn with_error(self, message: &str) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    /// Shared handle to the prompts the session actually sent.
    pub fn prompt_log(&self) -> Arc<Mutex<Vec<String>>> {
        self.prompts.clone()
    }

    /// Shared handle to the number of completed calls.
    pub fn call_count(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionModel for MockModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(anyhow!("{message}")),
            None => Err(anyhow!("no scripted reply left")),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}

// --- RecordingSink ---

/// Sink that records every status message for assertions.
pub struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl Default for RecordingSink {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSink for RecordingSink {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}
