use crate::question::Question;
use crate::session::{AnswerRecord, SessionConfig, SessionState};
use crate::source::SourceError;

/// Fixed pacing budget: 230 minutes allotted for 180 questions.
pub const BUDGET_SECS: u64 = 230 * 60;
pub const BUDGET_QUESTIONS: u64 = 180;

/// Seconds remaining at which the one-shot low-time alert fires.
pub const ALERT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum Stage {
    #[default]
    Configuring,
    Fetching,
    Ready,
    InProgress,
    Finished,
}

/// What a clock tick observed. `LowWater` is reported at most once per
/// session; `Expired` means the controller has already moved to `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSignal {
    None,
    LowWater,
    Expired,
}

/// The exam flow controller. Owns all session state and mutates it only in
/// response to explicit user actions or the once-per-second clock tick.
#[derive(Debug, Default)]
pub struct Exam {
    pub stage: Stage,
    pub config: SessionConfig,
    pub questions: Vec<Question>,
    pub session: SessionState,
    pub last_error: Option<String>,
}

/// ceil(count * 230min / 180) in whole seconds, computed exactly.
pub fn estimated_secs(count: usize) -> u64 {
    (count as u64 * BUDGET_SECS).div_ceil(BUDGET_QUESTIONS)
}

impl Exam {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Configuring -> Fetching`: accept the submitted settings and compute
    /// the session duration. The caller issues the actual request and
    /// reports back through [`Exam::on_questions`].
    pub fn submit(&mut self, config: SessionConfig) {
        if self.stage != Stage::Configuring || config.count == 0 {
            return;
        }
        self.session.total_secs = match config.minutes_override {
            Some(minutes) => minutes * 60,
            None => estimated_secs(config.count),
        };
        self.config = config;
        self.last_error = None;
        self.stage = Stage::Fetching;
    }

    /// `Fetching -> Ready` on a validated set, `Fetching -> Configuring`
    /// on any failure. Failures keep the submitted inputs so the user can
    /// resubmit unchanged; nothing retries automatically.
    pub fn on_questions(&mut self, result: Result<Vec<Question>, SourceError>) {
        if self.stage != Stage::Fetching {
            return;
        }
        match result {
            Ok(questions) => {
                self.questions = questions;
                self.session.seconds_remaining = self.session.total_secs;
                self.stage = Stage::Ready;
            }
            Err(err) => {
                self.last_error = Some(err.to_string());
                self.stage = Stage::Configuring;
            }
        }
    }

    /// `Ready -> InProgress`: the user starts the clock.
    pub fn start(&mut self) {
        if self.stage != Stage::Ready {
            return;
        }
        self.session.question_seconds = 0;
        self.stage = Stage::InProgress;
    }

    /// Select an option on the current question. Out-of-range and
    /// out-of-stage selections are ignored.
    pub fn select(&mut self, choice: usize) {
        if self.stage != Stage::InProgress {
            return;
        }
        let in_range = self
            .current_question()
            .is_some_and(|q| choice < q.choices.len());
        if in_range {
            self.session.selected = Some(choice);
        }
    }

    pub fn move_selection(&mut self, delta: isize) {
        if self.stage != Stage::InProgress {
            return;
        }
        let Some(len) = self.current_question().map(|q| q.choices.len()) else {
            return;
        };
        let next = match self.session.selected {
            None => 0,
            Some(cur) => (cur as isize + delta).rem_euclid(len as isize) as usize,
        };
        self.session.selected = Some(next);
    }

    /// Advance past the current question. A no-op unless an option is
    /// selected; records the answer, then either moves to the next
    /// question or finishes after the last one. Returns whether state
    /// changed.
    pub fn advance(&mut self) -> bool {
        if self.stage != Stage::InProgress || self.session.selected.is_none() {
            return false;
        }
        self.record_current();
        if self.session.current + 1 < self.questions.len() {
            self.session.current += 1;
            self.session.question_seconds = 0;
            self.session.selected = None;
        } else {
            self.stage = Stage::Finished;
        }
        true
    }

    /// One second of wall clock, delivered only while `InProgress`; every
    /// other stage is tick-inert. Hitting zero forces `Finished`
    /// immediately, recording the on-screen question only if an option was
    /// selected for it.
    pub fn on_tick(&mut self) -> ClockSignal {
        if self.stage != Stage::InProgress {
            return ClockSignal::None;
        }
        self.session.seconds_remaining = self.session.seconds_remaining.saturating_sub(1);
        self.session.question_seconds += 1;

        if self.session.seconds_remaining == 0 {
            if self.session.selected.is_some() {
                self.record_current();
            }
            self.stage = Stage::Finished;
            return ClockSignal::Expired;
        }
        if self.session.seconds_remaining <= ALERT_SECS && !self.session.alert_played {
            self.session.alert_played = true;
            return ClockSignal::LowWater;
        }
        ClockSignal::None
    }

    /// `Finished -> Configuring` (or abandon from anywhere): every tracked
    /// field back to its initial default.
    pub fn restart(&mut self) {
        *self = Self::default();
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.session.current)
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.session.answers
    }

    pub fn score(&self) -> usize {
        self.session.correct
    }

    pub fn has_finished(&self) -> bool {
        self.stage == Stage::Finished
    }

    /// Fraction of questions answered, 0.0..=1.0, for the progress gauge.
    pub fn completion_ratio(&self) -> f64 {
        if self.questions.is_empty() {
            return 0.0;
        }
        self.session.answers.len() as f64 / self.questions.len() as f64
    }

    /// Fraction of the session duration consumed, 0.0..=1.0.
    pub fn time_ratio(&self) -> f64 {
        if self.session.total_secs == 0 {
            return 0.0;
        }
        (self.session.total_secs - self.session.seconds_remaining) as f64
            / self.session.total_secs as f64
    }

    fn record_current(&mut self) {
        let idx = self.session.current;
        let Some(question) = self.questions.get(idx) else {
            return;
        };
        let Some(choice) = self
            .session
            .selected
            .and_then(|c| question.choices.get(c))
        else {
            return;
        };
        let is_correct = question.is_correct(choice);
        if is_correct {
            self.session.correct += 1;
        }
        self.session.answers.push(AnswerRecord {
            index: idx,
            question: question.prompt.clone(),
            selected: format!("{}. {}", choice.label, choice.text),
            correct_answer: question.answer.clone(),
            is_correct,
            seconds: self.session.question_seconds,
            rationale: question.rationale.clone(),
            category: question.category.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::Choice;
    use crate::source::SourceError;

    fn question(n: usize, answer: &str) -> Question {
        Question {
            prompt: format!("question {n}"),
            choices: vec![
                Choice {
                    label: "A".into(),
                    text: "first".into(),
                },
                Choice {
                    label: "B".into(),
                    text: "second".into(),
                },
                Choice {
                    label: "C".into(),
                    text: "third".into(),
                },
            ],
            answer: answer.into(),
            rationale: Some(format!("because {n}")),
            category: Some("Planning".into()),
        }
    }

    fn ready_exam(n: usize) -> Exam {
        let mut exam = Exam::new();
        exam.submit(SessionConfig {
            count: n,
            candidate: None,
            minutes_override: None,
        });
        let questions = (0..n).map(|i| question(i, "A")).collect();
        exam.on_questions(Ok(questions));
        exam
    }

    #[test]
    fn estimate_follows_fixed_budget() {
        // ceil(n * 13800 / 180)
        assert_eq!(estimated_secs(1), 77);
        assert_eq!(estimated_secs(3), 230);
        assert_eq!(estimated_secs(10), 767);
        assert_eq!(estimated_secs(180), BUDGET_SECS);
    }

    #[test]
    fn submit_moves_to_fetching_and_sets_duration() {
        let mut exam = Exam::new();
        exam.submit(SessionConfig {
            count: 10,
            candidate: Some("sam".into()),
            minutes_override: None,
        });
        assert_eq!(exam.stage, Stage::Fetching);
        assert_eq!(exam.session.total_secs, estimated_secs(10));
    }

    #[test]
    fn submit_rejects_zero_count() {
        let mut exam = Exam::new();
        exam.submit(SessionConfig::default());
        assert_eq!(exam.stage, Stage::Configuring);
    }

    #[test]
    fn minutes_override_replaces_estimate() {
        let mut exam = Exam::new();
        exam.submit(SessionConfig {
            count: 10,
            candidate: None,
            minutes_override: Some(15),
        });
        assert_eq!(exam.session.total_secs, 900);
    }

    #[test]
    fn successful_fetch_reaches_ready_with_clock_loaded() {
        let exam = ready_exam(3);
        assert_eq!(exam.stage, Stage::Ready);
        assert_eq!(exam.session.seconds_remaining, 230);
        assert_eq!(exam.questions.len(), 3);
    }

    #[test]
    fn failed_fetch_returns_to_configuring_with_message() {
        let mut exam = Exam::new();
        exam.submit(SessionConfig {
            count: 5,
            candidate: None,
            minutes_override: None,
        });
        exam.on_questions(Err(SourceError::Status(500)));
        assert_eq!(exam.stage, Stage::Configuring);
        assert!(exam.last_error.as_deref().unwrap().contains("500"));
        // inputs preserved for resubmission
        assert_eq!(exam.config.count, 5);
    }

    #[test]
    fn stray_fetch_results_are_ignored() {
        let mut exam = Exam::new();
        exam.on_questions(Ok(vec![question(0, "A")]));
        assert_eq!(exam.stage, Stage::Configuring);
        assert!(exam.questions.is_empty());
    }

    #[test]
    fn advance_without_selection_is_a_no_op() {
        let mut exam = ready_exam(2);
        exam.start();

        exam.on_tick();
        exam.on_tick();
        assert!(!exam.advance());
        assert_eq!(exam.session.current, 0);
        assert_eq!(exam.session.question_seconds, 2);
        assert!(exam.answers().is_empty());
    }

    #[test]
    fn advance_records_and_resets_question_clock() {
        let mut exam = ready_exam(2);
        exam.start();

        for _ in 0..5 {
            exam.on_tick();
        }
        exam.select(0);
        assert!(exam.advance());

        assert_eq!(exam.session.current, 1);
        assert_eq!(exam.session.selected, None);
        assert_eq!(exam.session.question_seconds, 0);
        assert_eq!(exam.answers().len(), 1);
        let rec = &exam.answers()[0];
        assert_eq!(rec.seconds, 5);
        assert!(rec.is_correct);
        assert_eq!(rec.selected, "A. first");
        assert_eq!(rec.category.as_deref(), Some("Planning"));
    }

    #[test]
    fn selection_is_bounds_checked() {
        let mut exam = ready_exam(1);
        exam.start();
        exam.select(7);
        assert_eq!(exam.session.selected, None);
        exam.select(2);
        assert_eq!(exam.session.selected, Some(2));
    }

    #[test]
    fn move_selection_wraps() {
        let mut exam = ready_exam(1);
        exam.start();
        exam.move_selection(1);
        assert_eq!(exam.session.selected, Some(0));
        exam.move_selection(-1);
        assert_eq!(exam.session.selected, Some(2));
        exam.move_selection(1);
        assert_eq!(exam.session.selected, Some(0));
    }

    #[test]
    fn three_question_walkthrough() {
        // N=3: estimate 230s; correct, wrong, correct at 5s/10s/7s
        let mut exam = ready_exam(3);
        assert_eq!(exam.session.total_secs, 230);
        exam.start();

        for _ in 0..5 {
            exam.on_tick();
        }
        exam.select(0); // correct
        assert!(exam.advance());

        for _ in 0..10 {
            exam.on_tick();
        }
        exam.select(1); // wrong
        assert!(exam.advance());

        for _ in 0..7 {
            exam.on_tick();
        }
        exam.select(0); // correct
        assert!(exam.advance());

        assert_eq!(exam.stage, Stage::Finished);
        assert_eq!(exam.score(), 2);
        let times: Vec<u64> = exam.answers().iter().map(|a| a.seconds).collect();
        assert_eq!(times, vec![5, 10, 7]);
        let flags: Vec<bool> = exam.answers().iter().map(|a| a.is_correct).collect();
        assert_eq!(flags, vec![true, false, true]);
        assert_eq!(exam.session.seconds_remaining, 230 - 22);
    }

    #[test]
    fn timeout_without_selection_finishes_with_no_records() {
        // N=1, clock runs out before anything is selected
        let mut exam = ready_exam(1);
        exam.session.total_secs = 3;
        exam.session.seconds_remaining = 3;
        exam.start();

        assert_eq!(exam.on_tick(), ClockSignal::None);
        assert_eq!(exam.on_tick(), ClockSignal::None);
        assert_eq!(exam.on_tick(), ClockSignal::Expired);

        assert_eq!(exam.stage, Stage::Finished);
        assert!(exam.answers().is_empty());
        assert_eq!(exam.score(), 0);
    }

    #[test]
    fn timeout_records_the_pending_selection() {
        let mut exam = ready_exam(3);
        exam.session.seconds_remaining = 2;
        exam.start();

        exam.on_tick();
        exam.select(0);
        assert_eq!(exam.on_tick(), ClockSignal::Expired);

        assert_eq!(exam.stage, Stage::Finished);
        assert_eq!(exam.answers().len(), 1);
        assert_eq!(exam.answers()[0].seconds, 2);
        assert!(exam.answers()[0].is_correct);
    }

    #[test]
    fn clock_is_inert_outside_in_progress() {
        let mut exam = ready_exam(1);
        let before = exam.session.seconds_remaining;
        assert_eq!(exam.on_tick(), ClockSignal::None);
        assert_eq!(exam.session.seconds_remaining, before);

        exam.start();
        exam.select(0);
        exam.advance();
        assert_eq!(exam.stage, Stage::Finished);
        assert_eq!(exam.on_tick(), ClockSignal::None);
        assert_eq!(exam.session.question_seconds, 0);
    }

    #[test]
    fn seconds_remaining_never_goes_negative() {
        let mut exam = ready_exam(1);
        exam.session.seconds_remaining = 1;
        exam.start();
        exam.on_tick();
        assert_eq!(exam.stage, Stage::Finished);
        assert_eq!(exam.session.seconds_remaining, 0);
        // a stray tick after the forced finish changes nothing
        exam.on_tick();
        assert_eq!(exam.session.seconds_remaining, 0);
    }

    #[test]
    fn alert_fires_exactly_once() {
        let mut exam = ready_exam(1);
        exam.session.seconds_remaining = ALERT_SECS + 2;
        exam.start();

        assert_eq!(exam.on_tick(), ClockSignal::None);
        assert_eq!(exam.on_tick(), ClockSignal::LowWater);
        assert!(exam.session.alert_played);
        // subsequent ticks below the threshold stay quiet
        for _ in 0..(ALERT_SECS - 1) {
            assert_eq!(exam.on_tick(), ClockSignal::None);
        }
        assert_eq!(exam.on_tick(), ClockSignal::Expired);
    }

    #[test]
    fn answer_records_never_exceed_question_count() {
        let mut exam = ready_exam(2);
        exam.start();
        for i in 0..2 {
            exam.select(0);
            assert!(exam.advance());
            assert!(exam.answers().len() <= 2);
            assert_eq!(exam.answers().len(), i + 1);
        }
        assert_eq!(exam.stage, Stage::Finished);
        // further advances change nothing
        assert!(!exam.advance());
        assert_eq!(exam.answers().len(), 2);
    }

    #[test]
    fn restart_resets_everything_to_defaults() {
        let mut exam = ready_exam(3);
        exam.start();
        exam.select(1);
        exam.advance();
        exam.on_tick();
        exam.restart();

        assert_eq!(exam.stage, Stage::Configuring);
        assert_eq!(exam.config, SessionConfig::default());
        assert!(exam.questions.is_empty());
        assert_eq!(exam.session, SessionState::default());
        assert_eq!(exam.last_error, None);
    }

    #[test]
    fn ratios_track_progress() {
        let mut exam = ready_exam(4);
        exam.session.total_secs = 100;
        exam.session.seconds_remaining = 100;
        exam.start();
        assert_eq!(exam.completion_ratio(), 0.0);
        assert_eq!(exam.time_ratio(), 0.0);

        for _ in 0..25 {
            exam.on_tick();
        }
        exam.select(0);
        exam.advance();
        assert_eq!(exam.completion_ratio(), 0.25);
        assert_eq!(exam.time_ratio(), 0.25);
    }

    #[test]
    fn stage_display_names() {
        assert_eq!(Stage::Configuring.to_string(), "Configuring");
        assert_eq!(Stage::InProgress.to_string(), "InProgress");
    }
}
