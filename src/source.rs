use crate::question::{self, Question, ShapeError};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// How long the worker thread waits before giving up on the collaborator.
/// Generating a large set upstream is slow, so this is generous.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("question source unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("question source returned status {0}")]
    Status(u16),
    #[error("question source sent a malformed payload: {0}")]
    Shape(#[from] ShapeError),
}

#[derive(Debug, Serialize)]
struct CountRequest {
    count: usize,
}

/// Client for the external question generator. One POST per session;
/// failures are reported back to the flow controller, never retried here.
#[derive(Debug, Clone)]
pub struct QuestionSource {
    base_url: String,
}

impl QuestionSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `{"count": n}` and normalize whatever comes back.
    pub fn fetch(&self, count: usize) -> Result<Vec<Question>, SourceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let response = client
            .post(&self.base_url)
            .json(&CountRequest { count })
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let body = response.text()?;
        Ok(question::parse_set(&body)?)
    }
}
