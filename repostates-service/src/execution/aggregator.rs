// Result Aggregator
// Collects finished repositories in completion order and returns them in discovery order

use crate::error::{ServiceError, ServiceResult};
use crate::repo::RepoReport;

/// Slot-per-repository collector.
///
/// Reports arrive in whatever order tasks finish; `finish` hands them back
/// in the order repositories were discovered. Nothing is filtered out.
#[derive(Debug)]
pub struct ResultAggregator {
    slots: Vec<Option<RepoReport>>,
}

impl ResultAggregator {
    pub fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| None).collect(),
        }
    }

    /// Store the report of the repository discovered at `index`
    pub fn insert(&mut self, index: usize, report: RepoReport) {
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        if self.slots[index].is_some() {
            tracing::warn!("Duplicate result for repository #{}, keeping the latest", index);
        }
        self.slots[index] = Some(report);
    }

    pub fn collected(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Consume the aggregator. Fails if any repository has no report.
    pub fn finish(self) -> ServiceResult<Vec<RepoReport>> {
        self.slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| slot.ok_or(ServiceError::MissingResult(index)))
            .collect()
    }
}
