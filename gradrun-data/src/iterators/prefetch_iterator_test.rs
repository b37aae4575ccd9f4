use super::prefetch_iterator::PrefetchIterator;
use super::serial_iterator::{RepeatMode, SerialIterator, SerialIteratorOptions};
use super::traits::{DatasetIterator, IteratorState};
use crate::datasets::VecDataset;
use gradrun_core::GradrunError;

fn serial(len: i32, batch_size: usize, repeat: RepeatMode) -> SerialIterator<VecDataset<i32>> {
    let options = SerialIteratorOptions {
        repeat,
        shuffle: false,
        seed: None,
    };
    SerialIterator::new(VecDataset::new((0..len).collect()), batch_size, options).unwrap()
}

#[test]
fn test_prefetch_matches_serial_sequence() {
    let mut reference = serial(5, 2, RepeatMode::Forever);
    let mut prefetch = PrefetchIterator::new(serial(5, 2, RepeatMode::Forever), 3).unwrap();
    assert_eq!(prefetch.batch_size(), 2);
    assert_eq!(prefetch.capacity(), 3);

    for _ in 0..8 {
        assert_eq!(prefetch.next_batch().unwrap(), reference.next_batch().unwrap());
        assert_eq!(prefetch.epoch(), reference.epoch());
        assert_eq!(prefetch.current_position(), reference.current_position());
        assert_eq!(prefetch.is_new_epoch(), reference.is_new_epoch());
        assert_eq!(prefetch.epoch_detail(), reference.epoch_detail());
    }
    prefetch.finalize();
}

#[test]
fn test_prefetch_reports_exhaustion() {
    let prefetch = PrefetchIterator::new(serial(5, 2, RepeatMode::Epochs(1)), 1).unwrap();
    let batches = prefetch.collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(batches, vec![vec![0, 1], vec![2, 3], vec![4]]);

    let mut prefetch = PrefetchIterator::new(serial(2, 2, RepeatMode::Epochs(1)), 4).unwrap();
    assert_eq!(prefetch.next_batch().unwrap(), vec![0, 1]);
    assert_eq!(prefetch.next_batch(), Err(GradrunError::DataExhausted));
    assert_eq!(prefetch.next_batch(), Err(GradrunError::DataExhausted));
}

#[test]
fn test_prefetch_state_tracks_delivered_batches() {
    let mut prefetch = PrefetchIterator::new(serial(10, 2, RepeatMode::Forever), 4).unwrap();
    prefetch.next_batch().unwrap();
    // Give the worker time to run ahead.
    std::thread::sleep(std::time::Duration::from_millis(20));
    let state = prefetch.state();
    assert_eq!(state.current_position, 2);
    assert_eq!(state.epoch, 0);
}

#[test]
fn test_prefetch_load_state_rewinds_worker() {
    let mut prefetch = PrefetchIterator::new(serial(6, 2, RepeatMode::Forever), 2).unwrap();
    prefetch.next_batch().unwrap();
    let state = prefetch.state();
    assert_eq!(prefetch.next_batch().unwrap(), vec![2, 3]);
    assert_eq!(prefetch.next_batch().unwrap(), vec![4, 5]);

    prefetch.load_state(state).unwrap();
    assert_eq!(prefetch.current_position(), 2);
    assert!(!prefetch.is_new_epoch());
    assert_eq!(prefetch.next_batch().unwrap(), vec![2, 3]);
}

#[test]
fn test_prefetch_rejected_state_keeps_position() {
    let mut prefetch = PrefetchIterator::new(serial(6, 2, RepeatMode::Forever), 2).unwrap();
    prefetch.next_batch().unwrap();
    let mut bad = prefetch.state();
    bad.current_position = 6;
    assert!(matches!(
        prefetch.load_state(bad),
        Err(GradrunError::ConfigurationError(_))
    ));
    assert_eq!(prefetch.current_position(), 2);
    assert_eq!(prefetch.next_batch().unwrap(), vec![2, 3]);
}

/// Counts upward forever and refuses every snapshot.
struct Counter {
    next: usize,
}

impl DatasetIterator for Counter {
    type Item = usize;

    fn next_batch(&mut self) -> Result<Vec<usize>, GradrunError> {
        self.next += 1;
        Ok(vec![self.next])
    }

    fn batch_size(&self) -> usize {
        1
    }

    fn current_position(&self) -> usize {
        0
    }

    fn epoch(&self) -> usize {
        0
    }

    fn is_new_epoch(&self) -> bool {
        false
    }

    fn epoch_detail(&self) -> f64 {
        0.0
    }

    fn state(&self) -> IteratorState {
        IteratorState {
            current_position: 0,
            epoch: 0,
            order: None,
        }
    }

    fn load_state(&mut self, _state: IteratorState) -> Result<(), GradrunError> {
        Err(GradrunError::ConfigurationError("snapshots are not supported".to_string()))
    }
}

#[test]
fn test_prefetch_keeps_running_when_rewind_fails() {
    let mut prefetch = PrefetchIterator::new(Counter { next: 0 }, 2).unwrap();
    let first = prefetch.next_batch().unwrap();
    assert_eq!(first, vec![1]);

    let snapshot = prefetch.state();
    assert!(matches!(
        prefetch.load_state(snapshot),
        Err(GradrunError::ConfigurationError(_))
    ));
    let next = prefetch.next_batch().unwrap();
    assert!(next[0] > first[0]);
    prefetch.finalize();
}

#[test]
fn test_finalize_is_idempotent_and_stops_delivery() {
    let mut prefetch = PrefetchIterator::new(serial(4, 2, RepeatMode::Forever), 1).unwrap();
    prefetch.next_batch().unwrap();
    prefetch.finalize();
    prefetch.finalize();
    assert!(matches!(
        prefetch.next_batch(),
        Err(GradrunError::ConfigurationError(_))
    ));

    let state = prefetch.state();
    prefetch.load_state(state).unwrap();
    assert_eq!(prefetch.next_batch().unwrap(), vec![2, 3]);
}

#[test]
fn test_zero_capacity_is_rejected() {
    assert!(matches!(
        PrefetchIterator::new(serial(4, 2, RepeatMode::Forever), 0),
        Err(GradrunError::ConfigurationError(_))
    ));
}
