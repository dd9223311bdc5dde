use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const QUESTION_ID_PREFIX: &str = "q-";

/// Stable identifier for a question, derived from its line in the bank source.
///
/// Two loads of the same source text always produce the same ids, so answers
/// recorded against an id survive a bank reload.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    /// Builds the id for the record found at `line` (zero-based, header included).
    #[must_use]
    pub fn from_line(line: usize) -> Self {
        Self(format!("{QUESTION_ID_PREFIX}{line}"))
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QuestionId({})", self.0)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error type for parsing an id from a string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    raw: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse QuestionId from {:?}", self.raw)
    }
}

impl std::error::Error for ParseIdError {}

impl FromStr for QuestionId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ParseIdError { raw: s.to_string() });
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_derived_from_line() {
        let id = QuestionId::from_line(7);
        assert_eq!(id.to_string(), "q-7");
    }

    #[test]
    fn id_from_str_rejects_blank() {
        assert!("   ".parse::<QuestionId>().is_err());
        let id: QuestionId = "q-3".parse().unwrap();
        assert_eq!(id, QuestionId::from_line(3));
    }

    #[test]
    fn id_serializes_as_plain_string() {
        let json = serde_json::to_string(&QuestionId::from_line(2)).unwrap();
        assert_eq!(json, "\"q-2\"");
    }
}
