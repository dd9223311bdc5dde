//! Storage keys shared by every backend.
//!
//! Tier P (persistent) keys survive restarts; the Tier S (session) key lives
//! only as long as the hosting session.

// Configuration, read once at startup.
pub const APP_NAME: &str = "cbt_app_name";
pub const TEST_TITLE: &str = "cbt_test_title";
pub const DURATION_MINUTES: &str = "cbt_duration";
pub const MARKS_PER_QUESTION: &str = "cbt_marks";

pub const QUESTIONS: &str = "cbt_questions";
pub const GUEST_ID: &str = "cbt_guest_id";

// Running-attempt keys. `END_TIME` doubles as the "attempt in progress" marker.
pub const END_TIME: &str = "cbt_end_time";
pub const ANSWERS: &str = "cbt_answers";
pub const CURRENT_INDEX: &str = "cbt_current_index";

/// Keys removed when an attempt is submitted or abandoned.
pub const RUNNING_KEYS: [&str; 3] = [END_TIME, ANSWERS, CURRENT_INDEX];

/// Tier S: the frozen result of the last submitted attempt.
pub const CURRENT_RESULT: &str = "cbt_current_result";
