#![forbid(unsafe_code)]

pub mod config;
mod deadline;
pub mod error;
pub mod quiz;
pub mod seed;
pub mod stats;

pub use quiz_core::Clock;

pub use config::{QuizConfig, SelectionMode};
pub use error::{AnswerRejected, LoadError, PersistenceError, SeedError, StatsError};
pub use quiz::{
    AdaptiveSelector, AnswerOutcome, CategoryBreakdown, QuizAnswer, QuizLoopService, QuizPhase,
    QuizProgress, QuizReport, QuizSession,
};
pub use seed::{SeedService, parse_questions};
pub use stats::{CategorySummary, StatsDashboard, StatsService};
