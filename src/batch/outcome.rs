use crate::record::Table;

/// A point whose extraction failed as a whole
#[derive(Debug, Clone, PartialEq)]
pub struct PointFailure {
    /// Position of the point in the input
    pub index: usize,
    pub point_id: String,
    pub cause: String,
}

/// How a batch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Completed,
    /// Stopped by an abort request after `processed` points
    Aborted { processed: usize },
}

/// Everything a batch produced
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub table: Table,
    pub failures: Vec<PointFailure>,
    pub status: BatchStatus,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.status == BatchStatus::Completed
    }
}
