/// User-submitted settings for one exam run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    pub count: usize,
    pub candidate: Option<String>,
    /// Explicit total exam time in minutes. When absent the duration is
    /// estimated from the fixed per-question budget.
    pub minutes_override: Option<u64>,
}

/// Everything the flow controller tracks for one question that has been
/// advanced past. Created exactly once, never mutated; carries a
/// denormalized copy of the question for export and history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerRecord {
    pub index: usize,
    pub question: String,
    pub selected: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub seconds: u64,
    pub rationale: Option<String>,
    pub category: Option<String>,
}

/// Every resettable counter of a running session in one record.
/// Restart is `SessionState::default()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// 0-based index of the question on screen, bounded by the set size
    pub current: usize,
    /// index into the current question's choices, if any
    pub selected: Option<usize>,
    pub total_secs: u64,
    pub seconds_remaining: u64,
    /// seconds spent on the current question so far
    pub question_seconds: u64,
    pub correct: usize,
    pub alert_played: bool,
    pub answers: Vec<AnswerRecord>,
}
