// gradrun-data/src/iterators/serial_iterator.rs

use super::traits::{next_as_iterator, DatasetIterator, IteratorState};
use crate::datasets::Dataset;
use gradrun_core::GradrunError;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// How many sweeps over the dataset an iterator performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatMode {
    /// Never exhausts; every batch is full.
    #[default]
    Forever,
    /// Stops after `n` sweeps. The final batch of the last sweep is not padded.
    Epochs(usize),
}

/// Construction options of a [`SerialIterator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialIteratorOptions {
    pub repeat: RepeatMode,
    /// Visit the items in a fresh random order each sweep.
    pub shuffle: bool,
    /// Seed of the shuffling generator; entropy when `None`.
    pub seed: Option<u64>,
}

impl Default for SerialIteratorOptions {
    fn default() -> Self {
        SerialIteratorOptions {
            repeat: RepeatMode::Forever,
            shuffle: true,
            seed: None,
        }
    }
}

/// Iterates over a dataset in order (or in a shuffled order), one batch per call.
///
/// A batch that runs past the end of the dataset is completed with items
/// from the start of the next sweep, unless that sweep would exceed the
/// configured repeat count.
///
/// ```
/// use gradrun_data::datasets::VecDataset;
/// use gradrun_data::iterators::{DatasetIterator, RepeatMode, SerialIterator, SerialIteratorOptions};
///
/// let options = SerialIteratorOptions { repeat: RepeatMode::Epochs(1), shuffle: false, seed: None };
/// let mut it = SerialIterator::new(VecDataset::new(vec![1, 2, 3, 4, 5]), 2, options).unwrap();
/// assert_eq!(it.next_batch().unwrap(), vec![1, 2]);
/// assert_eq!(it.next_batch().unwrap(), vec![3, 4]);
/// assert_eq!(it.next_batch().unwrap(), vec![5]);
/// assert!(it.is_new_epoch());
/// assert!(it.next_batch().unwrap_err().is_data_exhausted());
/// ```
#[derive(Debug)]
pub struct SerialIterator<D: Dataset> {
    dataset: D,
    batch_size: usize,
    repeat: RepeatMode,
    current_position: usize,
    epoch: usize,
    is_new_epoch: bool,
    order: Option<Vec<usize>>,
    rng: StdRng,
}

impl<D: Dataset> SerialIterator<D> {
    /// # Errors
    /// `ConfigurationError` for an empty dataset, a `batch_size` of zero or
    /// larger than the dataset, or `RepeatMode::Epochs(0)`.
    pub fn new(dataset: D, batch_size: usize, options: SerialIteratorOptions) -> Result<Self, GradrunError> {
        let len = dataset.len();
        if len == 0 {
            return Err(GradrunError::ConfigurationError(
                "SerialIterator needs a non-empty dataset".to_string(),
            ));
        }
        if batch_size == 0 || batch_size > len {
            return Err(GradrunError::ConfigurationError(format!(
                "batch_size must be in 1..={}, got {}",
                len, batch_size
            )));
        }
        if options.repeat == RepeatMode::Epochs(0) {
            return Err(GradrunError::ConfigurationError(
                "RepeatMode::Epochs needs at least one sweep".to_string(),
            ));
        }
        let mut rng = match options.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let order = options.shuffle.then(|| {
            let mut order: Vec<usize> = (0..len).collect();
            order.shuffle(&mut rng);
            order
        });
        debug!(
            "SerialIterator over {} items: batch_size={} repeat={:?} shuffle={}",
            len, batch_size, options.repeat, options.shuffle
        );
        Ok(SerialIterator {
            dataset,
            batch_size,
            repeat: options.repeat,
            current_position: 0,
            epoch: 0,
            is_new_epoch: false,
            order,
            rng,
        })
    }

    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    pub fn repeat(&self) -> RepeatMode {
        self.repeat
    }

    fn fetch(
        &self,
        order: Option<&[usize]>,
        range: std::ops::Range<usize>,
        batch: &mut Vec<D::Item>,
    ) -> Result<(), GradrunError> {
        for i in range {
            let index = match order {
                Some(order) => order[i],
                None => i,
            };
            batch.push(self.dataset.get(index)?);
        }
        Ok(())
    }

    fn is_last_sweep(&self) -> bool {
        match self.repeat {
            RepeatMode::Forever => false,
            RepeatMode::Epochs(n) => self.epoch + 1 >= n,
        }
    }
}

impl<D: Dataset> DatasetIterator for SerialIterator<D> {
    type Item = D::Item;

    fn next_batch(&mut self) -> Result<Vec<D::Item>, GradrunError> {
        if let RepeatMode::Epochs(n) = self.repeat {
            if self.epoch >= n {
                return Err(GradrunError::DataExhausted);
            }
        }
        let len = self.dataset.len();
        let start = self.current_position;
        let end = start + self.batch_size;

        let mut batch = Vec::with_capacity(self.batch_size);
        self.fetch(self.order.as_deref(), start..end.min(len), &mut batch)?;

        if end >= len {
            if self.is_last_sweep() {
                self.current_position = 0;
            } else {
                let rest = end - len;
                // The next sweep's order is committed only once its head is fetched.
                let mut rng = self.rng.clone();
                let next_order = self.order.as_ref().map(|order| {
                    let mut order = order.clone();
                    order.shuffle(&mut rng);
                    order
                });
                self.fetch(next_order.as_deref(), 0..rest, &mut batch)?;
                if next_order.is_some() {
                    self.order = next_order;
                    self.rng = rng;
                }
                self.current_position = rest;
            }
            self.epoch += 1;
            self.is_new_epoch = true;
            info!("epoch {} completed", self.epoch);
        } else {
            self.current_position = end;
            self.is_new_epoch = false;
        }
        Ok(batch)
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn current_position(&self) -> usize {
        self.current_position
    }

    fn epoch(&self) -> usize {
        self.epoch
    }

    fn is_new_epoch(&self) -> bool {
        self.is_new_epoch
    }

    fn epoch_detail(&self) -> f64 {
        self.epoch as f64 + self.current_position as f64 / self.dataset.len() as f64
    }

    fn state(&self) -> IteratorState {
        IteratorState {
            current_position: self.current_position,
            epoch: self.epoch,
            order: self.order.clone(),
        }
    }

    fn load_state(&mut self, state: IteratorState) -> Result<(), GradrunError> {
        let len = self.dataset.len();
        if state.current_position >= len {
            return Err(GradrunError::ConfigurationError(format!(
                "current_position {} is outside a dataset of {} items",
                state.current_position, len
            )));
        }
        if let RepeatMode::Epochs(n) = self.repeat {
            if state.epoch > n {
                return Err(GradrunError::ConfigurationError(format!(
                    "epoch {} is past the configured {} sweeps",
                    state.epoch, n
                )));
            }
        }
        match (&self.order, &state.order) {
            (Some(_), Some(order)) => {
                let mut seen = vec![false; len];
                let valid = order.len() == len
                    && order
                        .iter()
                        .all(|&i| i < len && !std::mem::replace(&mut seen[i], true));
                if !valid {
                    return Err(GradrunError::ConfigurationError(format!(
                        "order is not a permutation of 0..{}",
                        len
                    )));
                }
            }
            (None, None) => {}
            (Some(_), None) | (None, Some(_)) => {
                return Err(GradrunError::ConfigurationError(
                    "state and iterator disagree on shuffling".to_string(),
                ));
            }
        }
        debug!(
            "SerialIterator resumed at epoch {} position {}",
            state.epoch, state.current_position
        );
        self.current_position = state.current_position;
        self.epoch = state.epoch;
        self.order = state.order;
        self.is_new_epoch = false;
        Ok(())
    }
}

impl<D: Dataset> Iterator for SerialIterator<D> {
    type Item = Result<Vec<D::Item>, GradrunError>;

    fn next(&mut self) -> Option<Self::Item> {
        next_as_iterator(self)
    }
}
