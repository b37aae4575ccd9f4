use super::exponential_shift::ExponentialShift;
use crate::extension::{Extension, ExtensionContext};
use crate::optimizer::Hyperparameters;
use crate::sgd::Sgd;
use crate::trigger::Progress;
use approx::assert_relative_eq;

fn context(optimizer: &mut Sgd) -> ExtensionContext<'_> {
    ExtensionContext {
        progress: Progress::default(),
        optimizer,
        loss: None,
    }
}

#[test]
fn test_exponential_decay() {
    let mut sgd = Sgd::new(1.0).unwrap();
    let mut shift = ExponentialShift::new("lr", 0.5, None, None).unwrap();
    shift.initialize(&mut context(&mut sgd)).unwrap();
    assert_eq!(sgd.lr(), 1.0);

    for expected in [0.5, 0.25, 0.125] {
        shift.call(&mut context(&mut sgd)).unwrap();
        assert_relative_eq!(sgd.lr(), expected);
    }
    assert_eq!(shift.t(), 3);
}

#[test]
fn test_target_bounds_the_value() {
    let mut sgd = Sgd::default();
    let mut shift = ExponentialShift::new("lr", 0.1, Some(1.0), Some(0.05)).unwrap();
    shift.initialize(&mut context(&mut sgd)).unwrap();
    assert_eq!(sgd.hyperparam("lr"), Some(1.0));

    shift.call(&mut context(&mut sgd)).unwrap();
    assert_relative_eq!(sgd.lr(), 0.1);
    shift.call(&mut context(&mut sgd)).unwrap();
    assert_relative_eq!(sgd.lr(), 0.05);
    shift.call(&mut context(&mut sgd)).unwrap();
    assert_relative_eq!(sgd.lr(), 0.05);

    let mut growing = ExponentialShift::new("lr", 3.0, Some(1.0), Some(5.0)).unwrap();
    growing.initialize(&mut context(&mut sgd)).unwrap();
    growing.call(&mut context(&mut sgd)).unwrap();
    growing.call(&mut context(&mut sgd)).unwrap();
    assert_relative_eq!(sgd.lr(), 5.0);
}

#[test]
fn test_rate_is_validated() {
    assert!(ExponentialShift::new("lr", 0.0, None, None).is_err());
    assert!(ExponentialShift::new("lr", f64::INFINITY, None, None).is_err());
}

#[test]
fn test_state_round_trip_keeps_position() {
    let mut sgd = Sgd::new(2.0).unwrap();
    let mut shift = ExponentialShift::new("lr", 0.5, None, None).unwrap();
    shift.initialize(&mut context(&mut sgd)).unwrap();
    shift.call(&mut context(&mut sgd)).unwrap();

    let mut resumed = ExponentialShift::new("lr", 0.5, None, None).unwrap();
    resumed.load_state(shift.state().unwrap()).unwrap();
    let mut other = Sgd::new(100.0).unwrap();
    resumed.initialize(&mut context(&mut other)).unwrap();
    assert_relative_eq!(other.lr(), 1.0);
}

#[test]
#[cfg(target_pointer_width = "64")]
fn test_large_call_counts_are_not_truncated() {
    let mut shift = ExponentialShift::new("lr", 0.5, Some(1.0), None).unwrap();
    let state = super::ScheduleState {
        t: (1usize << 32) + 1,
        base: Some(1.0),
        last_value: None,
    };
    shift.load_state(state.to_value().unwrap()).unwrap();
    assert_eq!(shift.current_value(), Some(0.0));
}
