use chrono::{DateTime, Utc};

use cbt_core::model::{ExamResult, GradeTier, OptionKey, Question, QuestionId, ReviewItem, TestConfig};

use super::progress::SessionProgress;
use super::state::{RunningSession, SessionState};

/// Read model for the presentation layer, one variant per lifecycle state.
///
/// This is intentionally **not** a UI view-model:
/// - no pre-formatted strings (see `sessions::format` for conveniences)
/// - counts and flags are derived here so every renderer agrees on them
#[derive(Debug, Clone, PartialEq)]
pub enum SessionView {
    Idle(IdleView),
    Running(RunningView),
    Completed(ResultView),
}

/// Welcome screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdleView {
    pub app_name: String,
    pub test_title: String,
    pub duration_minutes: u32,
    pub marks_per_question: u32,
    pub question_count: usize,
}

/// One entry in the question navigator grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigatorCell {
    /// 1-based position.
    pub number: usize,
    pub question_id: QuestionId,
    pub answered: bool,
    pub current: bool,
}

/// Exam screen.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningView {
    pub question: Option<Question>,
    /// 0-based position of `question`.
    pub index: usize,
    pub progress: SessionProgress,
    pub selected: Option<OptionKey>,
    /// Never negative.
    pub remaining_secs: i64,
    pub navigator: Vec<NavigatorCell>,
    pub can_go_back: bool,
    pub can_go_forward: bool,
}

/// Result screen, projected from a frozen result.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub result: ExamResult,
    pub tier: GradeTier,
    pub correct_count: usize,
    pub wrong_count: usize,
    pub skipped_count: usize,
    pub review: Vec<ReviewItem>,
}

impl SessionView {
    pub(crate) fn build(
        state: &SessionState,
        config: &TestConfig,
        bank: &[Question],
        now: DateTime<Utc>,
    ) -> Self {
        match state {
            SessionState::Idle => SessionView::Idle(IdleView {
                app_name: config.app_name().to_string(),
                test_title: config.test_title().to_string(),
                duration_minutes: config.duration_minutes(),
                marks_per_question: config.marks_per_question(),
                question_count: bank.len(),
            }),
            SessionState::Running(running) => SessionView::Running(RunningView::from_running(running, now)),
            SessionState::Completed(result) => SessionView::Completed(ResultView::from_result(result)),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, SessionView::Running(_))
    }
}

impl RunningView {
    #[must_use]
    pub fn from_running(running: &RunningSession, now: DateTime<Utc>) -> Self {
        let question = running.current_question().cloned();
        let index = running.current_index();
        let progress = running.progress();
        let selected = question.as_ref().and_then(|q| running.selected(q.id()));

        let navigator = running
            .questions()
            .iter()
            .enumerate()
            .map(|(i, q)| NavigatorCell {
                number: i + 1,
                question_id: q.id().clone(),
                answered: running.answers().contains_key(q.id()),
                current: i == index,
            })
            .collect();

        Self {
            question,
            index,
            progress,
            selected,
            remaining_secs: running.remaining_secs(now).max(0),
            navigator,
            can_go_back: index > 0,
            can_go_forward: index + 1 < progress.total,
        }
    }
}

impl ResultView {
    #[must_use]
    pub fn from_result(result: &ExamResult) -> Self {
        Self {
            result: result.clone(),
            tier: result.tier(),
            correct_count: result.correct_count(),
            wrong_count: result.wrong_count(),
            skipped_count: result.skipped_count(),
            review: result.review(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbt_core::model::{AnswerMap, Submission, TestConfigDraft};
    use cbt_core::time::fixed_now;
    use chrono::Duration;

    fn questions(count: usize) -> Vec<Question> {
        (1..=count)
            .map(|line| {
                Question::new(
                    QuestionId::from_line(line),
                    format!("Q{line}"),
                    ["a".into(), "b".into(), "c".into(), "d".into()],
                    OptionKey::OptionA,
                )
                .unwrap()
            })
            .collect()
    }

    #[test]
    fn idle_view_reflects_config_and_bank() {
        let config = TestConfigDraft {
            test_title: Some("Physics".into()),
            ..TestConfigDraft::default()
        }
        .normalize();
        let view = SessionView::build(&SessionState::Idle, &config, &questions(3), fixed_now());
        let SessionView::Idle(idle) = view else {
            panic!("expected idle view");
        };
        assert_eq!(idle.test_title, "Physics");
        assert_eq!(idle.app_name, "CBT APP");
        assert_eq!(idle.question_count, 3);
        assert_eq!(idle.duration_minutes, 20);
    }

    #[test]
    fn running_view_marks_navigator_cells() {
        let now = fixed_now();
        let qs = questions(3);
        let mut answers = AnswerMap::new();
        answers.insert(QuestionId::from_line(2), OptionKey::OptionC);
        let running = RunningSession::restore(qs, answers, 1, now + Duration::seconds(90));

        let view = RunningView::from_running(&running, now);
        assert_eq!(view.index, 1);
        assert_eq!(view.selected, Some(OptionKey::OptionC));
        assert_eq!(view.progress, SessionProgress::new(3, 1));
        assert_eq!(view.remaining_secs, 90);
        assert!(view.can_go_back);
        assert!(view.can_go_forward);
        assert!(view.navigator[1].current && view.navigator[1].answered);
        assert!(!view.navigator[0].current && !view.navigator[0].answered);
    }

    #[test]
    fn running_view_never_reports_negative_time() {
        let now = fixed_now();
        let running = RunningSession::restore(questions(1), AnswerMap::new(), 0, now);
        let view = RunningView::from_running(&running, now + Duration::seconds(5));
        assert_eq!(view.remaining_secs, 0);
        assert!(!view.can_go_back);
        assert!(!view.can_go_forward);
    }

    #[test]
    fn result_view_projects_counts() {
        let now = fixed_now();
        let qs = questions(4);
        let mut answers = AnswerMap::new();
        answers.insert(QuestionId::from_line(1), OptionKey::OptionA);
        answers.insert(QuestionId::from_line(2), OptionKey::OptionB);
        let result = ExamResult::grade(
            Submission {
                questions: qs,
                answers,
                deadline: now,
                completed_at: now,
            },
            &TestConfig::default(),
        );

        let view = ResultView::from_result(&result);
        assert_eq!(view.correct_count, 1);
        assert_eq!(view.wrong_count, 1);
        assert_eq!(view.skipped_count, 2);
        assert_eq!(view.tier, GradeTier::Fail);
        assert_eq!(view.review.len(), 4);
    }
}
