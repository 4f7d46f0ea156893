//! Ordered sequence of action records

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::ActionRecord;

/// Ordered list of records. Insertion order is playback order; timestamps
/// are never used to re-sort it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline {
    records: Vec<ActionRecord>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ActionRecord) {
        self.records.push(record);
    }

    /// Insert a record at `index`, shifting later records back.
    ///
    /// # Panics
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, record: ActionRecord) {
        self.records.insert(index, record);
    }

    pub fn remove(&mut self, index: usize) -> Option<ActionRecord> {
        (index < self.records.len()).then(|| self.records.remove(index))
    }

    pub fn get(&self, index: usize) -> Option<&ActionRecord> {
        self.records.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ActionRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Timestamp of the last record, 0 when empty
    pub fn duration_ms(&self) -> u64 {
        self.records.last().map(|r| r.timestamp_ms).unwrap_or(0)
    }

    /// Wait to apply before each record, relative to the previous one.
    ///
    /// Backwards steps (hand-edited timestamps) clamp to zero.
    pub fn waits(&self) -> impl Iterator<Item = Duration> + '_ {
        let mut last = 0u64;
        self.records.iter().map(move |record| {
            let wait = record.timestamp_ms.saturating_sub(last);
            last = record.timestamp_ms;
            Duration::from_millis(wait)
        })
    }
}

impl FromIterator<ActionRecord> for Timeline {
    fn from_iter<I: IntoIterator<Item = ActionRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<ActionRecord>> for Timeline {
    fn from(records: Vec<ActionRecord>) -> Self {
        Self { records }
    }
}

impl IntoIterator for Timeline {
    type Item = ActionRecord;
    type IntoIter = std::vec::IntoIter<ActionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a ActionRecord;
    type IntoIter = std::slice::Iter<'a, ActionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
