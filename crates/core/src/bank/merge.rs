use std::collections::{HashMap, HashSet};

use crate::model::{Question, QuestionId};

/// Result of reconciling a running attempt against a freshly loaded bank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    pub questions: Vec<Question>,
    /// Questions new to the bank, appended after the existing sequence.
    pub appended: usize,
    /// Questions gone from the bank but kept so indices and answers stay valid.
    pub retained_missing: usize,
}

/// Merge `fresh` into the running sequence `current`.
///
/// Every question keeps its position; shared ids take their content from
/// `fresh`; ids only in `fresh` are appended in `fresh` order; ids only in
/// `current` stay put. The running order is never reshuffled.
#[must_use]
pub fn merge_running(current: &[Question], fresh: &[Question]) -> MergeOutcome {
    let fresh_by_id: HashMap<&QuestionId, &Question> = fresh.iter().map(|q| (q.id(), q)).collect();

    let mut retained_missing = 0;
    let mut questions: Vec<Question> = current
        .iter()
        .map(|existing| {
            let mut merged = existing.clone();
            match fresh_by_id.get(existing.id()) {
                Some(update) => merged.update_content_from(update),
                None => retained_missing += 1,
            }
            merged
        })
        .collect();

    let known: HashSet<&QuestionId> = current.iter().map(Question::id).collect();
    let before = questions.len();
    questions.extend(
        fresh
            .iter()
            .filter(|q| !known.contains(q.id()))
            .cloned(),
    );
    let appended = questions.len() - before;

    MergeOutcome {
        questions,
        appended,
        retained_missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OptionKey;

    fn question(line: usize, text: &str) -> Question {
        Question::new(
            QuestionId::from_line(line),
            text,
            ["a".into(), "b".into(), "c".into(), "d".into()],
            OptionKey::OptionA,
        )
        .unwrap()
    }

    fn ids(questions: &[Question]) -> Vec<String> {
        questions.iter().map(|q| q.id().to_string()).collect()
    }

    #[test]
    fn shared_ids_keep_running_positions() {
        let current = vec![question(3, "three"), question(1, "one"), question(2, "two")];
        let fresh = vec![question(1, "ONE"), question(2, "two"), question(3, "THREE")];

        let outcome = merge_running(&current, &fresh);

        assert_eq!(ids(&outcome.questions), vec!["q-3", "q-1", "q-2"]);
        assert_eq!(outcome.questions[0].text(), "THREE");
        assert_eq!(outcome.questions[1].text(), "ONE");
        assert_eq!(outcome.appended, 0);
        assert_eq!(outcome.retained_missing, 0);
    }

    #[test]
    fn new_ids_are_appended_in_fresh_order() {
        let current = vec![question(2, "two"), question(1, "one")];
        let fresh = vec![
            question(1, "one"),
            question(2, "two"),
            question(5, "five"),
            question(4, "four"),
        ];

        let outcome = merge_running(&current, &fresh);

        assert_eq!(ids(&outcome.questions), vec!["q-2", "q-1", "q-5", "q-4"]);
        assert_eq!(outcome.appended, 2);
    }

    #[test]
    fn removed_ids_are_not_purged() {
        let current = vec![question(2, "two"), question(1, "one"), question(3, "three")];
        let fresh = vec![question(1, "uno"), question(3, "tres")];

        let outcome = merge_running(&current, &fresh);

        assert_eq!(ids(&outcome.questions), vec!["q-2", "q-1", "q-3"]);
        assert_eq!(outcome.questions[0].text(), "two");
        assert_eq!(outcome.questions[1].text(), "uno");
        assert_eq!(outcome.retained_missing, 1);
    }

    #[test]
    fn merged_sequence_is_a_prefix_preserving_extension() {
        let current: Vec<_> = [7, 3, 9, 1, 5]
            .into_iter()
            .map(|line| question(line, "x"))
            .collect();
        let fresh: Vec<_> = (1..=10).map(|line| question(line, "y")).collect();

        let outcome = merge_running(&current, &fresh);

        assert_eq!(
            ids(&outcome.questions[..current.len()]),
            ids(&current),
            "running prefix must be untouched"
        );
        assert_eq!(outcome.questions.len(), 10);
        assert!(outcome.questions.iter().all(|q| q.text() == "y"));
    }
}
