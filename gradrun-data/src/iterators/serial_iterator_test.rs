use super::serial_iterator::{RepeatMode, SerialIterator, SerialIteratorOptions};
use super::traits::{DatasetIterator, IteratorState};
use crate::datasets::{Dataset, VecDataset};
use gradrun_core::GradrunError;

fn ordered(repeat: RepeatMode) -> SerialIteratorOptions {
    SerialIteratorOptions {
        repeat,
        shuffle: false,
        seed: None,
    }
}

fn shuffled(repeat: RepeatMode, seed: u64) -> SerialIteratorOptions {
    SerialIteratorOptions {
        repeat,
        shuffle: true,
        seed: Some(seed),
    }
}

fn range_dataset(n: i32) -> VecDataset<i32> {
    VecDataset::new((0..n).collect())
}

#[test]
fn test_repeat_forever_pads_from_next_sweep() {
    let mut it = SerialIterator::new(range_dataset(5), 2, ordered(RepeatMode::Forever)).unwrap();

    assert_eq!(it.next_batch().unwrap(), vec![0, 1]);
    assert_eq!(it.current_position(), 2);
    assert!(!it.is_new_epoch());
    assert!((it.epoch_detail() - 0.4).abs() < 1e-12);

    assert_eq!(it.next_batch().unwrap(), vec![2, 3]);
    assert_eq!(it.next_batch().unwrap(), vec![4, 0]);
    assert_eq!(it.epoch(), 1);
    assert_eq!(it.current_position(), 1);
    assert!(it.is_new_epoch());

    assert_eq!(it.next_batch().unwrap(), vec![1, 2]);
    assert!(!it.is_new_epoch());
    assert_eq!(it.next_batch().unwrap(), vec![3, 4]);
    assert_eq!(it.epoch(), 2);
    assert_eq!(it.current_position(), 0);
    assert!(it.is_new_epoch());
}

#[test]
fn test_epoch_increments_after_ceil_len_over_batch_calls() {
    for (len, batch_size) in [(5, 2), (6, 3), (7, 7), (10, 3)] {
        let mut it =
            SerialIterator::new(range_dataset(len), batch_size, ordered(RepeatMode::Forever)).unwrap();
        let calls = (len as usize).div_ceil(batch_size);
        for call in 0..calls {
            assert_eq!(it.epoch(), 0, "len {len} batch {batch_size} call {call}");
            it.next_batch().unwrap();
        }
        assert_eq!(it.epoch(), 1);
        assert!(it.is_new_epoch());
    }
}

#[test]
fn test_finite_repeat_truncates_last_batch() {
    let mut it = SerialIterator::new(range_dataset(5), 2, ordered(RepeatMode::Epochs(2))).unwrap();
    let batches: Vec<Vec<i32>> = (0..5).map(|_| it.next_batch().unwrap()).collect();
    assert_eq!(
        batches,
        vec![vec![0, 1], vec![2, 3], vec![4, 0], vec![1, 2], vec![3, 4]]
    );
    assert_eq!(it.epoch(), 2);
    assert_eq!(it.current_position(), 0);
    assert_eq!(it.next_batch(), Err(GradrunError::DataExhausted));
    assert_eq!(it.next_batch(), Err(GradrunError::DataExhausted));

    let mut single = SerialIterator::new(range_dataset(5), 2, ordered(RepeatMode::Epochs(1))).unwrap();
    single.next_batch().unwrap();
    single.next_batch().unwrap();
    assert_eq!(single.next_batch().unwrap(), vec![4]);
    assert!(single.is_new_epoch());
}

#[test]
fn test_std_iterator_ends_on_exhaustion() {
    let it = SerialIterator::new(range_dataset(5), 2, ordered(RepeatMode::Epochs(1))).unwrap();
    let batches = it.collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(batches, vec![vec![0, 1], vec![2, 3], vec![4]]);
}

#[test]
fn test_shuffle_visits_every_item_once_per_sweep() {
    let mut it = SerialIterator::new(range_dataset(6), 3, shuffled(RepeatMode::Forever, 7)).unwrap();
    for _ in 0..3 {
        let mut sweep = it.next_batch().unwrap();
        sweep.extend(it.next_batch().unwrap());
        assert!(it.is_new_epoch());
        sweep.sort_unstable();
        assert_eq!(sweep, vec![0, 1, 2, 3, 4, 5]);
    }
}

#[test]
fn test_seeded_shuffle_is_reproducible() {
    let mut a = SerialIterator::new(range_dataset(8), 3, shuffled(RepeatMode::Forever, 42)).unwrap();
    let mut b = SerialIterator::new(range_dataset(8), 3, shuffled(RepeatMode::Forever, 42)).unwrap();
    for _ in 0..10 {
        assert_eq!(a.next_batch().unwrap(), b.next_batch().unwrap());
    }
}

#[test]
fn test_construction_is_validated() {
    let cases = [
        (range_dataset(4), 0, RepeatMode::Forever),
        (range_dataset(4), 5, RepeatMode::Forever),
        (range_dataset(0), 1, RepeatMode::Forever),
        (range_dataset(4), 2, RepeatMode::Epochs(0)),
    ];
    for (dataset, batch_size, repeat) in cases {
        assert!(matches!(
            SerialIterator::new(dataset, batch_size, ordered(repeat)),
            Err(GradrunError::ConfigurationError(_))
        ));
    }
}

#[test]
fn test_dataset_errors_are_propagated() {
    #[derive(Debug)]
    struct Holey;

    impl Dataset for Holey {
        type Item = u8;

        fn get(&self, index: usize) -> Result<u8, GradrunError> {
            if index == 3 {
                Err(GradrunError::InternalError("missing record".to_string()))
            } else {
                Ok(index as u8)
            }
        }

        fn len(&self) -> usize {
            4
        }
    }

    let mut it = SerialIterator::new(Holey, 2, ordered(RepeatMode::Forever)).unwrap();
    assert_eq!(it.next_batch().unwrap(), vec![0, 1]);
    assert!(matches!(it.next_batch(), Err(GradrunError::InternalError(_))));
}

#[test]
fn test_failed_wrap_keeps_the_current_sweep() {
    use std::cell::Cell;

    // Fails the sixth read: the first item of the padded next sweep.
    struct Flaky {
        calls: Cell<usize>,
    }

    impl Dataset for Flaky {
        type Item = usize;

        fn get(&self, index: usize) -> Result<usize, GradrunError> {
            let call = self.calls.get() + 1;
            self.calls.set(call);
            if call == 6 {
                Err(GradrunError::InternalError("transient read failure".to_string()))
            } else {
                Ok(index)
            }
        }

        fn len(&self) -> usize {
            5
        }
    }

    let dataset = Flaky { calls: Cell::new(0) };
    let mut it = SerialIterator::new(dataset, 2, shuffled(RepeatMode::Forever, 11)).unwrap();
    let mut sweep = it.next_batch().unwrap();
    sweep.extend(it.next_batch().unwrap());
    let order_before = it.state().order;

    assert!(matches!(it.next_batch(), Err(GradrunError::InternalError(_))));
    let after_error = it.state();
    assert_eq!(after_error.current_position, 4);
    assert_eq!(after_error.epoch, 0);
    assert_eq!(after_error.order, order_before);

    let padded = it.next_batch().unwrap();
    sweep.push(padded[0]);
    sweep.sort_unstable();
    assert_eq!(sweep, vec![0, 1, 2, 3, 4]);

    let state = it.state();
    assert_eq!(state.epoch, 1);
    assert_eq!(state.current_position, 1);
    assert_eq!(state.order.unwrap()[0], padded[1]);
}

#[test]
fn test_state_resume_continues_the_sequence() {
    let mut original = SerialIterator::new(range_dataset(6), 2, shuffled(RepeatMode::Forever, 3)).unwrap();
    original.next_batch().unwrap();
    let state = original.state();
    assert_eq!(state.current_position, 2);
    assert_eq!(state.order.as_ref().map(Vec::len), Some(6));

    let mut resumed = SerialIterator::new(range_dataset(6), 2, shuffled(RepeatMode::Forever, 99)).unwrap();
    resumed.load_state(state).unwrap();
    assert!(!resumed.is_new_epoch());
    for _ in 0..2 {
        assert_eq!(resumed.next_batch().unwrap(), original.next_batch().unwrap());
    }
    assert_eq!(resumed.epoch(), 1);
}

#[test]
fn test_load_state_clears_new_epoch_flag() {
    let mut it = SerialIterator::new(range_dataset(4), 2, ordered(RepeatMode::Forever)).unwrap();
    it.next_batch().unwrap();
    it.next_batch().unwrap();
    assert!(it.is_new_epoch());
    let state = it.state();
    it.load_state(state).unwrap();
    assert!(!it.is_new_epoch());
    assert_eq!(it.epoch(), 1);
}

#[test]
fn test_load_state_rejects_foreign_state() {
    let mut plain = SerialIterator::new(range_dataset(4), 2, ordered(RepeatMode::Forever)).unwrap();
    let mut mixed = SerialIterator::new(range_dataset(4), 2, shuffled(RepeatMode::Forever, 1)).unwrap();

    let out_of_range = IteratorState {
        current_position: 4,
        epoch: 0,
        order: None,
    };
    let not_a_permutation = IteratorState {
        current_position: 0,
        epoch: 0,
        order: Some(vec![0, 0, 1, 2]),
    };
    let too_short = IteratorState {
        current_position: 0,
        epoch: 0,
        order: Some(vec![0, 1, 2]),
    };
    let unshuffled = IteratorState {
        current_position: 0,
        epoch: 0,
        order: None,
    };

    assert!(plain.load_state(out_of_range).is_err());
    assert!(plain.load_state(too_short.clone()).is_err());
    assert!(mixed.load_state(not_a_permutation).is_err());
    assert!(mixed.load_state(too_short).is_err());
    assert!(mixed.load_state(unshuffled).is_err());

    // Rejected states leave the iterator untouched.
    assert_eq!(plain.next_batch().unwrap(), vec![0, 1]);
}
