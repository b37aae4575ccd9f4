use gradrun_core::GradrunError;
use serde::{Deserialize, Serialize};

/// Pull-based producer of minibatches with epoch bookkeeping.
///
/// Each [`next_batch`](DatasetIterator::next_batch) advances
/// `current_position` by `batch_size`. Reaching the end of the dataset wraps
/// the position, increments `epoch` and sets `is_new_epoch` for that call
/// only. A non-repeating iterator reports [`GradrunError::DataExhausted`]
/// once its sweeps are complete.
pub trait DatasetIterator {
    type Item: Send + 'static;

    /// Produces the next minibatch.
    ///
    /// # Errors
    /// `DataExhausted` when no sweep is left, or the dataset's own error.
    fn next_batch(&mut self) -> Result<Vec<Self::Item>, GradrunError>;

    fn batch_size(&self) -> usize;

    fn current_position(&self) -> usize;

    /// Number of completed sweeps.
    fn epoch(&self) -> usize;

    /// True iff the batch returned by the last `next_batch` completed a sweep.
    fn is_new_epoch(&self) -> bool;

    /// `epoch + current_position / len`: fractional progress in epochs.
    fn epoch_detail(&self) -> f64;

    /// Releases background resources. Calling it more than once is harmless.
    fn finalize(&mut self) {}

    /// Snapshot of the state needed to resume iteration.
    fn state(&self) -> IteratorState;

    /// Restores a snapshot taken with [`state`](DatasetIterator::state).
    ///
    /// # Errors
    /// `ConfigurationError` if the snapshot does not fit this iterator's
    /// dataset or options.
    fn load_state(&mut self, state: IteratorState) -> Result<(), GradrunError>;
}

/// The persisted part of an iterator: `is_new_epoch` and `batch_size` are
/// not included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IteratorState {
    pub current_position: usize,
    pub epoch: usize,
    /// Permutation used for the current sweep; `None` without shuffling.
    pub order: Option<Vec<usize>>,
}

impl IteratorState {
    pub fn to_json(&self) -> Result<String, GradrunError> {
        serde_json::to_string(self).map_err(|e| GradrunError::StateSerialization(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, GradrunError> {
        serde_json::from_str(json).map_err(|e| GradrunError::StateSerialization(e.to_string()))
    }
}

/// Adapts a [`DatasetIterator`] to `std::iter::Iterator`: `DataExhausted`
/// ends the iteration, other errors are yielded.
pub(crate) fn next_as_iterator<I: DatasetIterator + ?Sized>(
    iterator: &mut I,
) -> Option<Result<Vec<I::Item>, GradrunError>> {
    match iterator.next_batch() {
        Err(e) if e.is_data_exhausted() => None,
        other => Some(other),
    }
}
