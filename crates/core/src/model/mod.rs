mod attempt;
mod category_stat;
mod ids;
mod question;
mod running_stats;
mod text;

pub use attempt::{Attempt, NewAttempt};
pub use category_stat::{
    CategoryStat, CategoryStatError, OverallStats, PerformanceLevel, rounded_percentage,
};
pub use ids::{AttemptId, ParseIdError, QuestionId, SessionId};
pub use question::{
    Category, LocalizedQuestion, OPTION_COUNT, OptionIndex, Question, QuestionDraft,
    QuestionError, TextDraft, ValidatedQuestion,
};
pub use running_stats::{CategoryTally, SessionRunningStats};
pub use text::{BilingualText, Language, TextError};
