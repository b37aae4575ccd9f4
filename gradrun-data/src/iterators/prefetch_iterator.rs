// gradrun-data/src/iterators/prefetch_iterator.rs

use super::traits::{next_as_iterator, DatasetIterator, IteratorState};
use gradrun_core::GradrunError;
use log::{debug, warn};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::{self, Receiver, SyncSender},
    Arc,
};
use std::thread::{self, JoinHandle};

/// One produced batch together with the producer's state right after it.
struct Prefetched<T> {
    batch: Result<Vec<T>, GradrunError>,
    state: IteratorState,
    is_new_epoch: bool,
    epoch_detail: f64,
}

/// Runs an inner iterator on a background thread, keeping up to `capacity`
/// batches ready.
///
/// The bookkeeping it reports (`current_position`, `epoch`, `state`...) is
/// that of the last batch handed to the caller, not of the batches waiting
/// in the channel. The inner iterator's own error ends the prefetching and
/// is returned from the `next_batch` call that reaches it.
pub struct PrefetchIterator<I: DatasetIterator> {
    batch_size: usize,
    capacity: usize,
    receiver: Option<Receiver<Prefetched<I::Item>>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<I>>,
    parked: Option<I>,
    state: IteratorState,
    is_new_epoch: bool,
    epoch_detail: f64,
    exhausted: bool,
}

impl<I> PrefetchIterator<I>
where
    I: DatasetIterator + Send + 'static,
{
    /// Starts prefetching from `inner` right away.
    ///
    /// # Errors
    /// `ConfigurationError` when `capacity` is zero, `InternalError` if the
    /// worker thread cannot be spawned.
    pub fn new(inner: I, capacity: usize) -> Result<Self, GradrunError> {
        if capacity == 0 {
            return Err(GradrunError::ConfigurationError(
                "PrefetchIterator capacity must be at least 1".to_string(),
            ));
        }
        let mut iterator = PrefetchIterator {
            batch_size: inner.batch_size(),
            capacity,
            receiver: None,
            stop: Arc::new(AtomicBool::new(false)),
            worker: None,
            parked: None,
            state: inner.state(),
            is_new_epoch: inner.is_new_epoch(),
            epoch_detail: inner.epoch_detail(),
            exhausted: false,
        };
        iterator.spawn(inner)?;
        Ok(iterator)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn spawn(&mut self, inner: I) -> Result<(), GradrunError> {
        let (sender, receiver) = mpsc::sync_channel(self.capacity);
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("gradrun-prefetch".to_string())
            .spawn(move || Self::produce(inner, sender, worker_stop))
            .map_err(|e| GradrunError::InternalError(format!("failed to spawn prefetch worker: {e}")))?;
        debug!("prefetch worker started (capacity {})", self.capacity);
        self.stop = stop;
        self.receiver = Some(receiver);
        self.worker = Some(handle);
        self.exhausted = false;
        Ok(())
    }

    /// Worker loop: fills the channel until told to stop, the consumer goes
    /// away, or the inner iterator fails. Hands the inner iterator back.
    fn produce(mut inner: I, sink: SyncSender<Prefetched<I::Item>>, stop: Arc<AtomicBool>) -> I {
        while !stop.load(Ordering::Acquire) {
            let batch = inner.next_batch();
            let failed = batch.is_err();
            let message = Prefetched {
                batch,
                state: inner.state(),
                is_new_epoch: inner.is_new_epoch(),
                epoch_detail: inner.epoch_detail(),
            };
            if sink.send(message).is_err() || failed {
                break;
            }
        }
        inner
    }
}

impl<I: DatasetIterator> PrefetchIterator<I> {
    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        // Unblocks a worker waiting on a full channel.
        self.receiver = None;
        if let Some(handle) = self.worker.take() {
            match handle.join() {
                Ok(inner) => {
                    self.parked = Some(inner);
                    debug!("prefetch worker stopped");
                }
                Err(e) => warn!("prefetch worker panicked: {e:?}"),
            }
        }
    }
}

impl<I> DatasetIterator for PrefetchIterator<I>
where
    I: DatasetIterator + Send + 'static,
{
    type Item = I::Item;

    fn next_batch(&mut self) -> Result<Vec<I::Item>, GradrunError> {
        if self.exhausted {
            return Err(GradrunError::DataExhausted);
        }
        let receiver = self.receiver.as_ref().ok_or_else(|| {
            GradrunError::ConfigurationError("PrefetchIterator used after finalize".to_string())
        })?;
        let message = receiver
            .recv()
            .map_err(|_| GradrunError::InternalError("prefetch worker stopped unexpectedly".to_string()))?;
        match message.batch {
            Ok(batch) => {
                self.state = message.state;
                self.is_new_epoch = message.is_new_epoch;
                self.epoch_detail = message.epoch_detail;
                Ok(batch)
            }
            Err(e) => {
                if e.is_data_exhausted() {
                    self.exhausted = true;
                }
                Err(e)
            }
        }
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn current_position(&self) -> usize {
        self.state.current_position
    }

    fn epoch(&self) -> usize {
        self.state.epoch
    }

    fn is_new_epoch(&self) -> bool {
        self.is_new_epoch
    }

    fn epoch_detail(&self) -> f64 {
        self.epoch_detail
    }

    fn finalize(&mut self) {
        self.shutdown();
    }

    fn state(&self) -> IteratorState {
        self.state.clone()
    }

    /// Stops the worker, rewinds the inner iterator and prefetches again
    /// from the restored state. Also revives a finalized iterator.
    fn load_state(&mut self, state: IteratorState) -> Result<(), GradrunError> {
        self.shutdown();
        let mut inner = self.parked.take().ok_or_else(|| {
            GradrunError::InternalError("prefetch worker did not return its iterator".to_string())
        })?;
        // The worker ran ahead of the caller; rewind it either way.
        let restored = match inner.load_state(state) {
            Ok(()) => {
                self.state = inner.state();
                self.is_new_epoch = false;
                self.epoch_detail = inner.epoch_detail();
                Ok(())
            }
            Err(e) => {
                if let Err(rewind) = inner.load_state(self.state.clone()) {
                    warn!("could not rewind the prefetch worker: {}", rewind);
                }
                Err(e)
            }
        };
        self.spawn(inner)?;
        restored
    }
}

impl<I> Iterator for PrefetchIterator<I>
where
    I: DatasetIterator + Send + 'static,
{
    type Item = Result<Vec<I::Item>, GradrunError>;

    fn next(&mut self) -> Option<Self::Item> {
        next_as_iterator(self)
    }
}

impl<I: DatasetIterator> Drop for PrefetchIterator<I> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
