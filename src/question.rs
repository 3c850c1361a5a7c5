use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// One selectable option, normalized from either wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub text: String,
}

/// A multiple-choice question as delivered by the question source.
/// Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub prompt: String,
    pub choices: Vec<Choice>,
    pub answer: String,
    pub rationale: Option<String>,
    pub category: Option<String>,
}

impl Question {
    /// The recorded answer may be an option label ("B") or the full option
    /// text, depending on which source variant produced the set. Exact
    /// match against either counts as correct.
    pub fn is_correct(&self, choice: &Choice) -> bool {
        self.answer == choice.label || self.answer == choice.text
    }
}

#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("payload is not valid question JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("question list is empty")]
    Empty,
    #[error("question {0} has fewer than two options")]
    TooFewChoices(usize),
}

// The source emits two envelope conventions: a bare array of question
// records, or an object with a `questions` field (extra fields such as
// `insight` are ignored). Both are accepted and normalized here.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WirePayload {
    Wrapped { questions: Vec<WireQuestion> },
    Bare(Vec<WireQuestion>),
}

#[derive(Debug, Deserialize)]
struct WireQuestion {
    question: String,
    options: WireOptions,
    answer: String,
    #[serde(default)]
    rationale: Option<String>,
    #[serde(default)]
    eco_task: Option<String>,
}

// `options` likewise arrives as an ordered list ("A. Communicate early")
// or as a label-keyed map ({"A": "Communicate early"}).
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireOptions {
    List(Vec<String>),
    Labeled(BTreeMap<String, String>),
}

/// Parse and shape-check a question source response body. Canonical form
/// is an ordered `Vec<Question>` with labeled choices; anything that does
/// not normalize cleanly is a recoverable error for the caller.
pub fn parse_set(body: &str) -> Result<Vec<Question>, ShapeError> {
    let payload: WirePayload = serde_json::from_str(body)?;
    let wire = match payload {
        WirePayload::Wrapped { questions } => questions,
        WirePayload::Bare(questions) => questions,
    };

    if wire.is_empty() {
        return Err(ShapeError::Empty);
    }

    let mut questions = Vec::with_capacity(wire.len());
    for (idx, wq) in wire.into_iter().enumerate() {
        let choices = normalize_options(wq.options);
        if choices.len() < 2 {
            return Err(ShapeError::TooFewChoices(idx));
        }
        questions.push(Question {
            prompt: wq.question,
            choices,
            answer: wq.answer,
            rationale: wq.rationale,
            category: wq.eco_task,
        });
    }

    Ok(questions)
}

fn normalize_options(options: WireOptions) -> Vec<Choice> {
    match options {
        WireOptions::List(entries) => entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| match split_label_prefix(&entry) {
                Some((label, text)) => Choice { label, text },
                None => Choice {
                    label: positional_label(i),
                    text: entry,
                },
            })
            .collect(),
        // BTreeMap iteration is label-ordered, which matches the A..D
        // ordering every observed payload uses
        WireOptions::Labeled(entries) => entries
            .into_iter()
            .map(|(label, text)| Choice { label, text })
            .collect(),
    }
}

// "A. Communicate early" / "B) Escalate" -> ("A", "Communicate early")
fn split_label_prefix(entry: &str) -> Option<(String, String)> {
    let mut chars = entry.chars();
    let label = chars.next().filter(char::is_ascii_alphanumeric)?;
    let sep = chars.next().filter(|c| *c == '.' || *c == ')')?;
    let rest = entry[label.len_utf8() + sep.len_utf8()..].trim_start();
    if rest.is_empty() {
        return None;
    }
    Some((label.to_ascii_uppercase().to_string(), rest.to_string()))
}

fn positional_label(index: usize) -> String {
    if index < 26 {
        char::from(b'A' + index as u8).to_string()
    } else {
        (index + 1).to_string()
    }
}
