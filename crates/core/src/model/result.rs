use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{OptionKey, Question, QuestionId, TestConfig};

/// Selected option per answered question. Absence means the question was skipped.
pub type AnswerMap = BTreeMap<QuestionId, OptionKey>;

//
// ─── GRADE TIERS ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GradeTier {
    Fail,
    Pass,
    Distinction,
}

impl GradeTier {
    #[must_use]
    pub fn from_percentage(percentage: u32) -> Self {
        match percentage {
            0..40 => GradeTier::Fail,
            40..70 => GradeTier::Pass,
            _ => GradeTier::Distinction,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            GradeTier::Fail => "FAIL",
            GradeTier::Pass => "PASS",
            GradeTier::Distinction => "DISTINCTION",
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            GradeTier::Fail => "Don't give up! Review your mistakes and try again.",
            GradeTier::Pass => "Good job! You have a solid understanding of this topic.",
            GradeTier::Distinction => "Outstanding! You have mastered this course.",
        }
    }
}

//
// ─── REVIEW ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Correct,
    Wrong,
    Skipped,
}

/// One row of the post-test review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewItem {
    /// 1-based position in the attempt.
    pub number: usize,
    pub question: Question,
    pub chosen: Option<OptionKey>,
    pub outcome: AnswerOutcome,
}

impl ReviewItem {
    /// Text of the correct option, shown for rows that were not answered correctly.
    #[must_use]
    pub fn correction(&self) -> Option<&str> {
        match self.outcome {
            AnswerOutcome::Correct => None,
            AnswerOutcome::Wrong | AnswerOutcome::Skipped => {
                Some(self.question.option(self.question.correct_answer()))
            }
        }
    }
}

//
// ─── RESULT ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamAnalytics {
    pub time_taken_ms: i64,
    pub attempted_count: usize,
}

/// Inputs frozen at the moment an attempt is submitted.
#[derive(Debug, Clone)]
pub struct Submission {
    pub questions: Vec<Question>,
    pub answers: AnswerMap,
    pub deadline: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Immutable scored snapshot of a finished attempt.
///
/// Built once at submission; never recomputed from live state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamResult {
    score: u32,
    total: u32,
    percentage: u32,
    questions: Vec<Question>,
    answers: AnswerMap,
    completed_at: DateTime<Utc>,
    analytics: ExamAnalytics,
}

impl ExamResult {
    /// Score a submission.
    ///
    /// Time taken is measured from the attempt's start (`deadline - duration`)
    /// and clamped into `[0, duration]`, so time the attempt spent suspended
    /// past the deadline is not counted.
    #[must_use]
    pub fn grade(submission: Submission, config: &TestConfig) -> Self {
        let marks = config.marks_per_question();
        let correct = submission
            .questions
            .iter()
            .filter(|q| q.is_correct(submission.answers.get(q.id()).copied()))
            .count();
        let correct = u32::try_from(correct).unwrap_or(u32::MAX);
        let count = u32::try_from(submission.questions.len()).unwrap_or(u32::MAX);

        let score = correct.saturating_mul(marks);
        let total = count.saturating_mul(marks);

        let duration = config.duration();
        let started_at = submission.deadline - duration;
        let time_taken_ms = (submission.completed_at - started_at)
            .num_milliseconds()
            .clamp(0, duration.num_milliseconds());

        Self {
            score,
            total,
            percentage: percentage(score, total),
            analytics: ExamAnalytics {
                time_taken_ms,
                attempted_count: submission.answers.len(),
            },
            questions: submission.questions,
            answers: submission.answers,
            completed_at: submission.completed_at,
        }
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn percentage(&self) -> u32 {
        self.percentage
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
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn analytics(&self) -> ExamAnalytics {
        self.analytics
    }

    #[must_use]
    pub fn tier(&self) -> GradeTier {
        GradeTier::from_percentage(self.percentage)
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.count_outcomes(AnswerOutcome::Correct)
    }

    /// Questions in the attempt that were answered incorrectly.
    #[must_use]
    pub fn wrong_count(&self) -> usize {
        self.count_outcomes(AnswerOutcome::Wrong)
    }

    /// Questions in the attempt with no recorded answer.
    ///
    /// Answers stored for ids outside the attempt never reduce this count.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count_outcomes(AnswerOutcome::Skipped)
    }

    /// Per-question outcomes in attempt order.
    #[must_use]
    pub fn review(&self) -> Vec<ReviewItem> {
        self.questions
            .iter()
            .enumerate()
            .map(|(idx, question)| ReviewItem {
                number: idx + 1,
                question: question.clone(),
                chosen: self.answers.get(question.id()).copied(),
                outcome: self.outcome(question),
            })
            .collect()
    }

    fn outcome(&self, question: &Question) -> AnswerOutcome {
        let chosen = self.answers.get(question.id()).copied();
        match chosen {
            None => AnswerOutcome::Skipped,
            Some(_) if question.is_correct(chosen) => AnswerOutcome::Correct,
            Some(_) => AnswerOutcome::Wrong,
        }
    }

    fn count_outcomes(&self, wanted: AnswerOutcome) -> usize {
        self.questions
            .iter()
            .filter(|q| self.outcome(q) == wanted)
            .count()
    }
}

/// `round(100 * score / total)`, rounding halves up; zero when `total` is zero.
fn percentage(score: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let score = u64::from(score);
    let total = u64::from(total);
    let rounded = (200 * score + total) / (2 * total);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuestionId, TestConfigDraft};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn question(line: usize, correct: OptionKey) -> Question {
        Question::new(
            QuestionId::from_line(line),
            format!("Q{line}"),
            ["a".into(), "b".into(), "c".into(), "d".into()],
            correct,
        )
        .unwrap()
    }

    fn config(minutes: u32, marks: u32) -> TestConfig {
        TestConfigDraft {
            duration_minutes: Some(minutes),
            marks_per_question: Some(marks),
            ..TestConfigDraft::default()
        }
        .normalize()
    }

    #[test]
    fn three_of_four_scores_seventy_five_percent() {
        let questions = vec![
            question(1, OptionKey::OptionA),
            question(2, OptionKey::OptionB),
            question(3, OptionKey::OptionC),
            question(4, OptionKey::OptionD),
        ];
        let answers = AnswerMap::from([
            (QuestionId::from_line(1), OptionKey::OptionA),
            (QuestionId::from_line(2), OptionKey::OptionB),
            (QuestionId::from_line(3), OptionKey::OptionC),
        ]);
        let now = fixed_now();
        let result = ExamResult::grade(
            Submission {
                questions,
                answers,
                deadline: now + Duration::minutes(10),
                completed_at: now,
            },
            &config(20, 2),
        );

        assert_eq!(result.score(), 6);
        assert_eq!(result.total(), 8);
        assert_eq!(result.percentage(), 75);
        assert_eq!(result.correct_count(), 3);
        assert_eq!(result.wrong_count(), 0);
        assert_eq!(result.skipped_count(), 1);
        assert_eq!(result.analytics().attempted_count, 3);
        assert_eq!(result.analytics().time_taken_ms, 10 * 60 * 1000);
        assert_eq!(result.tier(), GradeTier::Distinction);
    }

    #[test]
    fn answers_outside_the_attempt_do_not_shift_counts() {
        let questions = vec![
            question(1, OptionKey::OptionA),
            question(2, OptionKey::OptionB),
            question(3, OptionKey::OptionC),
        ];
        let answers = AnswerMap::from([
            (QuestionId::from_line(1), OptionKey::OptionA),
            (QuestionId::from_line(2), OptionKey::OptionC),
            (QuestionId::from_line(99), OptionKey::OptionD),
        ]);
        let now = fixed_now();
        let result = ExamResult::grade(
            Submission {
                questions,
                answers,
                deadline: now + Duration::minutes(15),
                completed_at: now,
            },
            &config(20, 2),
        );

        assert_eq!(result.analytics().attempted_count, 3);
        assert_eq!(result.correct_count(), 1);
        assert_eq!(result.wrong_count(), 1);
        assert_eq!(result.skipped_count(), 1);
        let outcomes: Vec<_> = result.review().iter().map(|item| item.outcome).collect();
        assert_eq!(
            outcomes,
            [
                AnswerOutcome::Correct,
                AnswerOutcome::Wrong,
                AnswerOutcome::Skipped
            ]
        );
    }

    #[test]
    fn empty_submission_scores_zero_percent() {
        let now = fixed_now();
        let result = ExamResult::grade(
            Submission {
                questions: Vec::new(),
                answers: AnswerMap::new(),
                deadline: now,
                completed_at: now,
            },
            &config(20, 2),
        );
        assert_eq!(result.total(), 0);
        assert_eq!(result.percentage(), 0);
        assert_eq!(result.tier(), GradeTier::Fail);
    }

    #[test]
    fn time_taken_is_clamped_to_duration() {
        let now = fixed_now();
        let late = ExamResult::grade(
            Submission {
                questions: vec![question(1, OptionKey::OptionA)],
                answers: AnswerMap::new(),
                deadline: now - Duration::hours(3),
                completed_at: now,
            },
            &config(20, 2),
        );
        assert_eq!(late.analytics().time_taken_ms, 20 * 60 * 1000);

        let early = ExamResult::grade(
            Submission {
                questions: vec![question(1, OptionKey::OptionA)],
                answers: AnswerMap::new(),
                deadline: now + Duration::hours(3),
                completed_at: now,
            },
            &config(20, 2),
        );
        assert_eq!(early.analytics().time_taken_ms, 0);
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn tiers_follow_percentage_bands() {
        assert_eq!(GradeTier::from_percentage(39), GradeTier::Fail);
        assert_eq!(GradeTier::from_percentage(40), GradeTier::Pass);
        assert_eq!(GradeTier::from_percentage(69), GradeTier::Pass);
        assert_eq!(GradeTier::from_percentage(70), GradeTier::Distinction);
    }

    #[test]
    fn review_marks_each_outcome() {
        let now = fixed_now();
        let result = ExamResult::grade(
            Submission {
                questions: vec![
                    question(1, OptionKey::OptionA),
                    question(2, OptionKey::OptionB),
                    question(3, OptionKey::OptionC),
                ],
                answers: AnswerMap::from([
                    (QuestionId::from_line(1), OptionKey::OptionA),
                    (QuestionId::from_line(2), OptionKey::OptionD),
                ]),
                deadline: now,
                completed_at: now,
            },
            &config(20, 1),
        );

        let review = result.review();
        let outcomes: Vec<_> = review.iter().map(|item| item.outcome).collect();
        assert_eq!(
            outcomes,
            vec![
                AnswerOutcome::Correct,
                AnswerOutcome::Wrong,
                AnswerOutcome::Skipped
            ]
        );
        assert_eq!(review[0].correction(), None);
        assert_eq!(review[1].correction(), Some("b"));
        assert_eq!(review[2].number, 3);
        assert_eq!(result.wrong_count(), 1);
    }

    #[test]
    fn result_survives_json_round_trip() {
        let now = fixed_now();
        let result = ExamResult::grade(
            Submission {
                questions: vec![question(1, OptionKey::OptionA)],
                answers: AnswerMap::from([(QuestionId::from_line(1), OptionKey::OptionA)]),
                deadline: now,
                completed_at: now,
            },
            &config(20, 2),
        );
        let json = serde_json::to_string(&result).unwrap();
        let back: ExamResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }
}
