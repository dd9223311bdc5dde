/// Aggregated view of attempt progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub unanswered: usize,
}

impl SessionProgress {
    #[must_use]
    pub fn new(total: usize, answered: usize) -> Self {
        Self {
            total,
            answered,
            unanswered: total.saturating_sub(answered),
        }
    }
}
