use std::collections::HashMap;

use crate::core::OutcomeRecord;

/// Ordered outcomes of the latest upload of one session.
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    records: Vec<OutcomeRecord>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything recorded so far.
    pub fn reset(&mut self) {
        self.records.clear();
    }

    pub fn extend(&mut self, records: impl IntoIterator<Item = OutcomeRecord>) {
        self.records.extend(records);
    }

    pub fn records(&self) -> &[OutcomeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Outcome of a given sheet row, if that row was processed.
    pub fn get(&self, sheet: &str, row_index: usize) -> Option<&OutcomeRecord> {
        self.records
            .iter()
            .find(|r| r.sheet == sheet && r.row_index == row_index)
    }

    /// Index by `(sheet, row_index)`.
    pub fn by_row(&self) -> HashMap<(&str, usize), &OutcomeRecord> {
        index_by_row(&self.records)
    }
}

pub(crate) fn index_by_row(records: &[OutcomeRecord]) -> HashMap<(&str, usize), &OutcomeRecord> {
    records
        .iter()
        .map(|r| ((r.sheet.as_str(), r.row_index), r))
        .collect()
}
