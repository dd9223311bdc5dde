use chrono::{DateTime, Utc};

use cbt_core::model::{AnswerMap, ExamResult, OptionKey, Question, QuestionId};
use cbt_core::time::remaining_seconds;

use super::progress::SessionProgress;

/// Lifecycle of one attempt: `Idle -> Running -> Completed -> Idle`.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Idle,
    Running(RunningSession),
    Completed(ExamResult),
}

impl SessionState {
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, SessionState::Running(_))
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Running(_) => "running",
            SessionState::Completed(_) => "completed",
        }
    }
}

/// An attempt in progress.
///
/// Question order is fixed for the attempt's lifetime; bank reloads only
/// correct content in place or append at the end.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningSession {
    pub(crate) questions: Vec<Question>,
    pub(crate) answers: AnswerMap,
    pub(crate) current_index: usize,
    pub(crate) deadline: DateTime<Utc>,
}

impl RunningSession {
    pub(crate) fn new(questions: Vec<Question>, deadline: DateTime<Utc>) -> Self {
        Self {
            questions,
            answers: AnswerMap::new(),
            current_index: 0,
            deadline,
        }
    }

    /// Rebuild from persisted parts, clamping a stale index into range.
    pub(crate) fn restore(
        questions: Vec<Question>,
        answers: AnswerMap,
        current_index: usize,
        deadline: DateTime<Utc>,
    ) -> Self {
        let mut session = Self {
            questions,
            answers,
            current_index: 0,
            deadline,
        };
        session.current_index = session.clamp_index(current_index);
        session
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn deadline(&self) -> DateTime<Utc> {
        self.deadline
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    #[must_use]
    pub fn selected(&self, id: &QuestionId) -> Option<OptionKey> {
        self.answers.get(id).copied()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress::new(self.questions.len(), self.answered_count())
    }

    /// Answered questions that are still part of the sequence.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.questions
            .iter()
            .filter(|q| self.answers.contains_key(q.id()))
            .count()
    }

    /// Whole seconds left, derived from the absolute deadline.
    #[must_use]
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        remaining_seconds(self.deadline, now)
    }

    pub(crate) fn record_answer(&mut self, id: QuestionId, option: OptionKey) {
        self.answers.insert(id, option);
    }

    /// Move to `index`, clamped into the sequence. Returns true if the index changed.
    pub(crate) fn move_to(&mut self, index: usize) -> bool {
        let target = self.clamp_index(index);
        let changed = target != self.current_index;
        self.current_index = target;
        changed
    }

    /// Move by `delta` positions, clamped into the sequence.
    pub(crate) fn move_by(&mut self, delta: isize) -> bool {
        let target = self.current_index.saturating_add_signed(delta);
        self.move_to(target)
    }

    fn clamp_index(&self, index: usize) -> usize {
        index.min(self.questions.len().saturating_sub(1))
    }
}
