use crate::error::BankError;
use crate::model::{OptionKey, Question, QuestionId};

const DELIMITER: char = ',';
const QUOTE: char = '"';
const MIN_FIELDS: usize = 6;

/// Parsed bank plus data-quality notes gathered while loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub questions: Vec<Question>,
    /// Questions whose correct-answer indicator was not recognized and fell back to option A.
    pub defaulted_indicators: Vec<QuestionId>,
}

impl LoadReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Parse comma-delimited bank text.
///
/// Row shape is `question, optionA, optionB, optionC, optionD, indicator` and the
/// first line is a header. Lines with fewer than six fields or an empty question
/// are skipped. Ids come from the line index, so the same text always yields the
/// same ids in the same order.
#[must_use]
pub fn load_bank(text: &str) -> LoadReport {
    let mut report = LoadReport::default();

    for (line_idx, line) in text.split('\n').enumerate().skip(1) {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let fields = split_fields(line);
        if fields.len() < MIN_FIELDS {
            continue;
        }

        let text = clean(fields[0]);
        if text.is_empty() {
            continue;
        }

        let id = QuestionId::from_line(line_idx);
        let correct = parse_indicator(&clean(fields[5])).unwrap_or_else(|| {
            report.defaulted_indicators.push(id.clone());
            OptionKey::OptionA
        });
        let options = [
            clean(fields[1]),
            clean(fields[2]),
            clean(fields[3]),
            clean(fields[4]),
        ];

        if let Ok(question) = Question::new(id, text, options, correct) {
            report.questions.push(question);
        }
    }

    report
}

/// Like [`load_bank`], but treats a bank without any usable question as unavailable.
///
/// # Errors
///
/// Returns `BankError::Empty` if no record qualifies.
pub fn load_bank_strict(text: &str) -> Result<LoadReport, BankError> {
    let report = load_bank(text);
    if report.is_empty() {
        return Err(BankError::Empty);
    }
    Ok(report)
}

/// Split on the delimiter, ignoring delimiters inside quoted regions.
fn split_fields(line: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (idx, ch) in line.char_indices() {
        match ch {
            QUOTE => in_quotes = !in_quotes,
            DELIMITER if !in_quotes => {
                fields.push(&line[start..idx]);
                start = idx + ch.len_utf8();
            }
            _ => {}
        }
    }
    fields.push(&line[start..]);
    fields
}

fn clean(field: &str) -> String {
    let field = field.trim();
    let field = field.strip_prefix(QUOTE).unwrap_or(field);
    let field = field.strip_suffix(QUOTE).unwrap_or(field);
    field.trim().to_string()
}

/// Map an indicator such as `b`, `B`, `optionB` or `Option C` to a key.
///
/// Only bare letters and values mentioning "option" are considered; anything
/// else, including an "option" value naming no letter, yields `None`.
fn parse_indicator(raw: &str) -> Option<OptionKey> {
    let lower = raw.to_lowercase();
    let recognized = matches!(lower.as_str(), "a" | "b" | "c" | "d") || lower.contains("option");
    if !recognized {
        return None;
    }
    [
        ('a', OptionKey::OptionA),
        ('b', OptionKey::OptionB),
        ('c', OptionKey::OptionC),
        ('d', OptionKey::OptionD),
    ]
    .into_iter()
    .find(|(letter, _)| lower.contains(*letter))
    .map(|(_, key)| key)
}
