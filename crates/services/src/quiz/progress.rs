/// Aggregated view of quiz progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizProgress {
    /// 1-based position of the question on screen; the answered count once complete.
    pub position: usize,
    /// Questions the session expects to serve.
    pub planned: usize,
    pub answered: usize,
    pub is_complete: bool,
}

impl QuizProgress {
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.planned.saturating_sub(self.answered)
    }
}
