use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;

//
// ─── OPTION KEYS ───────────────────────────────────────────────────────────────
//

/// One of the four canonical answer slots of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionKey {
    #[serde(rename = "optionA")]
    OptionA,
    #[serde(rename = "optionB")]
    OptionB,
    #[serde(rename = "optionC")]
    OptionC,
    #[serde(rename = "optionD")]
    OptionD,
}

impl OptionKey {
    pub const ALL: [OptionKey; 4] = [
        OptionKey::OptionA,
        OptionKey::OptionB,
        OptionKey::OptionC,
        OptionKey::OptionD,
    ];

    /// Upper-case letter shown next to the option.
    #[must_use]
    pub fn letter(self) -> char {
        match self {
            OptionKey::OptionA => 'A',
            OptionKey::OptionB => 'B',
            OptionKey::OptionC => 'C',
            OptionKey::OptionD => 'D',
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OptionKey::OptionA => "optionA",
            OptionKey::OptionB => "optionB",
            OptionKey::OptionC => "optionC",
            OptionKey::OptionD => "optionD",
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown option key: {0}")]
pub struct ParseOptionKeyError(String);

impl FromStr for OptionKey {
    type Err = ParseOptionKeyError;

    /// Accepts either a bare letter (`b`) or the key name (`optionB`), any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        let letter = normalized.strip_prefix("option").unwrap_or(&normalized);
        match letter {
            "a" => Ok(OptionKey::OptionA),
            "b" => Ok(OptionKey::OptionB),
            "c" => Ok(OptionKey::OptionC),
            "d" => Ok(OptionKey::OptionD),
            _ => Err(ParseOptionKeyError(s.to_string())),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text must not be empty")]
    EmptyText,
}

/// A single multiple-choice question.
///
/// `id` and the question's position inside a running attempt never change;
/// only the content (text, options, correct answer) may be corrected in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    text: String,
    option_a: String,
    option_b: String,
    option_c: String,
    option_d: String,
    correct_answer: OptionKey,
}

impl Question {
    /// Creates a question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyText` if `text` is blank.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        options: [String; 4],
        correct_answer: OptionKey,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        let [option_a, option_b, option_c, option_d] = options;
        Ok(Self {
            id,
            text,
            option_a,
            option_b,
            option_c,
            option_d,
            correct_answer,
        })
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn correct_answer(&self) -> OptionKey {
        self.correct_answer
    }

    /// Text of the given option.
    #[must_use]
    pub fn option(&self, key: OptionKey) -> &str {
        match key {
            OptionKey::OptionA => &self.option_a,
            OptionKey::OptionB => &self.option_b,
            OptionKey::OptionC => &self.option_c,
            OptionKey::OptionD => &self.option_d,
        }
    }

    /// Iterates the options in display order.
    pub fn options(&self) -> impl Iterator<Item = (OptionKey, &str)> {
        OptionKey::ALL.into_iter().map(|key| (key, self.option(key)))
    }

    #[must_use]
    pub fn is_correct(&self, chosen: Option<OptionKey>) -> bool {
        chosen == Some(self.correct_answer)
    }

    /// Overwrites text, options and correct answer from `source`, keeping `id`.
    pub fn update_content_from(&mut self, source: &Question) {
        self.text.clone_from(&source.text);
        self.option_a.clone_from(&source.option_a);
        self.option_b.clone_from(&source.option_b);
        self.option_c.clone_from(&source.option_c);
        self.option_d.clone_from(&source.option_d);
        self.correct_answer = source.correct_answer;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> [String; 4] {
        ["one".into(), "two".into(), "three".into(), "four".into()]
    }

    #[test]
    fn rejects_blank_text() {
        let err = Question::new(QuestionId::from_line(1), "  ", options(), OptionKey::OptionA)
            .unwrap_err();
        assert_eq!(err, QuestionError::EmptyText);
    }

    #[test]
    fn option_lookup_matches_keys() {
        let q = Question::new(QuestionId::from_line(1), "Q", options(), OptionKey::OptionC)
            .unwrap();
        assert_eq!(q.option(OptionKey::OptionB), "two");
        assert_eq!(q.option(q.correct_answer()), "three");
        assert!(q.is_correct(Some(OptionKey::OptionC)));
        assert!(!q.is_correct(None));
        assert_eq!(q.options().count(), 4);
    }

    #[test]
    fn option_key_parses_letters_and_names() {
        assert_eq!("b".parse::<OptionKey>().unwrap(), OptionKey::OptionB);
        assert_eq!("optionD".parse::<OptionKey>().unwrap(), OptionKey::OptionD);
        assert_eq!(" C ".parse::<OptionKey>().unwrap(), OptionKey::OptionC);
        assert!("e".parse::<OptionKey>().is_err());
    }

    #[test]
    fn option_key_serializes_with_canonical_names() {
        let json = serde_json::to_string(&OptionKey::OptionB).unwrap();
        assert_eq!(json, "\"optionB\"");
    }

    #[test]
    fn content_update_keeps_identity() {
        let mut q = Question::new(QuestionId::from_line(4), "old", options(), OptionKey::OptionA)
            .unwrap();
        let fixed = Question::new(
            QuestionId::from_line(9),
            "new",
            ["w".into(), "x".into(), "y".into(), "z".into()],
            OptionKey::OptionD,
        )
        .unwrap();
        q.update_content_from(&fixed);
        assert_eq!(q.id(), &QuestionId::from_line(4));
        assert_eq!(q.text(), "new");
        assert_eq!(q.option(OptionKey::OptionA), "w");
        assert_eq!(q.correct_answer(), OptionKey::OptionD);
    }
}
