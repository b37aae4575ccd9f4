//! Datasets and minibatch iterators for gradrun.
//!
//! A [`Dataset`] hands out items by index. A [`DatasetIterator`] turns it into
//! a stream of minibatches with epoch bookkeeping whose state can be saved
//! and restored as JSON.

pub mod datasets;
pub mod iterators;

pub use datasets::{Dataset, TensorDataset, VecDataset};
pub use iterators::{
    DatasetIterator, IteratorState, PrefetchIterator, RepeatMode, SerialIterator,
    SerialIteratorOptions,
};
