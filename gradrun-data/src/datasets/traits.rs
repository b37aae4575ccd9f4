// gradrun-data/src/datasets/traits.rs

use gradrun_core::GradrunError;

/// Represents a dataset that can be accessed by index.
///
/// A dataset is a collection of items, where each item can be a single tensor,
/// a list of tensors (e.g. features and label), or any other custom type
/// that implements `Send + 'static`.
pub trait Dataset {
    /// The type of a single item returned by the dataset.
    ///
    /// This type must be `Send` and `'static` so that batches can be
    /// produced on a prefetching thread.
    type Item: Send + 'static;

    /// Returns the item at the given index.
    ///
    /// # Errors
    ///
    /// Returns `GradrunError::IndexOutOfBounds` if the index is out of bounds,
    /// or any error raised while materialising the item.
    fn get(&self, index: usize) -> Result<Self::Item, GradrunError>;

    /// Returns the total number of items in the dataset.
    fn len(&self) -> usize;

    /// Checks if the dataset is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
