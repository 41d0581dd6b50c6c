mod progress;
mod report;
mod selector;
mod session;
mod state;
mod workflow;

// Public API of the quiz subsystem.
pub use progress::QuizProgress;
pub use report::{CategoryBreakdown, QuizReport};
pub use selector::AdaptiveSelector;
pub use session::QuizSession;
pub use state::{AnswerOutcome, QuizAnswer, QuizPhase};
pub use workflow::QuizLoopService;
