//! Minibatch iterators over a [`Dataset`](crate::datasets::Dataset).

pub mod prefetch_iterator;
pub mod serial_iterator;
pub mod traits;

#[cfg(test)]
mod prefetch_iterator_test;
#[cfg(test)]
mod serial_iterator_test;

pub use prefetch_iterator::PrefetchIterator;
pub use serial_iterator::{RepeatMode, SerialIterator, SerialIteratorOptions};
pub use traits::{DatasetIterator, IteratorState};
