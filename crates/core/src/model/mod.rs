mod config;
mod ids;
mod question;
mod result;

pub use config::{TestConfig, TestConfigDraft};
pub use ids::{ParseIdError, QuestionId};
pub use question::{OptionKey, ParseOptionKeyError, Question, QuestionError};
pub use result::{
    AnswerMap, AnswerOutcome, ExamAnalytics, ExamResult, GradeTier, ReviewItem, Submission,
};
