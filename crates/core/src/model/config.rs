use chrono::Duration;

pub const DEFAULT_APP_NAME: &str = "CBT APP";
pub const DEFAULT_TEST_TITLE: &str = "GENERAL TEST";
pub const DEFAULT_DURATION_MINUTES: u32 = 20;
pub const DEFAULT_MARKS_PER_QUESTION: u32 = 2;

/// Static test configuration, read once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestConfig {
    app_name: String,
    test_title: String,
    duration_minutes: u32,
    marks_per_question: u32,
}

/// Raw configuration values as read from storage, before normalization.
#[derive(Clone, Debug, Default)]
pub struct TestConfigDraft {
    pub app_name: Option<String>,
    pub test_title: Option<String>,
    pub duration_minutes: Option<u32>,
    pub marks_per_question: Option<u32>,
}

impl TestConfigDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize the draft, substituting defaults for blank names and
    /// missing or zero numbers.
    #[must_use]
    pub fn normalize(self) -> TestConfig {
        TestConfig {
            app_name: normalize_optional(self.app_name)
                .unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
            test_title: normalize_optional(self.test_title)
                .unwrap_or_else(|| DEFAULT_TEST_TITLE.to_string()),
            duration_minutes: self
                .duration_minutes
                .filter(|minutes| *minutes > 0)
                .unwrap_or(DEFAULT_DURATION_MINUTES),
            marks_per_question: self
                .marks_per_question
                .filter(|marks| *marks > 0)
                .unwrap_or(DEFAULT_MARKS_PER_QUESTION),
        }
    }
}

impl TestConfig {
    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    #[must_use]
    pub fn test_title(&self) -> &str {
        &self.test_title
    }

    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    #[must_use]
    pub fn marks_per_question(&self) -> u32 {
        self.marks_per_question
    }

    /// Total time allowed for one attempt.
    #[must_use]
    pub fn duration(&self) -> Duration {
        Duration::minutes(i64::from(self.duration_minutes))
    }
}

impl Default for TestConfig {
    fn default() -> Self {
        TestConfigDraft::default().normalize()
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}
