//! A fake insight client that remembers what it was asked.
use std::cell::RefCell;
use crate::error::{Error, Result};
use super::{InsightClient, Prompt};

pub struct RecordingClient {
    answer: Option<String>,
    calls: RefCell<Vec<(String, Prompt)>>,
}

impl RecordingClient {
    pub fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Every call fails with an upstream error.
    pub fn failing() -> Self {
        Self {
            answer: None,
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, Prompt)> {
        self.calls.borrow().clone()
    }
}

impl InsightClient for RecordingClient {
    fn analyse(&self, data: &str, prompt: Prompt) -> Result<String> {
        self.calls.borrow_mut().push((data.to_string(), prompt));
        self.answer
            .clone()
            .ok_or_else(|| Error::Upstream("fake upstream failure".to_string()))
    }
}
