use super::*;

fn at_iteration(iteration: usize) -> Progress {
    Progress {
        iteration,
        ..Progress::default()
    }
}

fn epoch_end(iteration: usize, epoch: usize) -> Progress {
    Progress {
        iteration,
        epoch,
        epoch_detail: epoch as f64,
        is_new_epoch: true,
    }
}

#[test]
fn test_iteration_interval() {
    let trigger = IntervalTrigger::try_from((3, "iteration")).unwrap();
    let fired: Vec<usize> = (1..=10).filter(|&i| trigger.fires(&at_iteration(i))).collect();
    assert_eq!(fired, vec![3, 6, 9]);
    assert!(!trigger.fires(&at_iteration(0)));
}

#[test]
fn test_epoch_interval_fires_on_epoch_boundaries_only() {
    let trigger = IntervalTrigger::try_from((2, "epoch")).unwrap();
    assert_eq!(trigger.unit(), TriggerUnit::Epoch);

    assert!(!trigger.fires(&epoch_end(4, 1)));
    assert!(trigger.fires(&epoch_end(8, 2)));

    let mid_epoch = Progress {
        iteration: 9,
        epoch: 2,
        epoch_detail: 2.25,
        is_new_epoch: false,
    };
    assert!(!trigger.fires(&mid_epoch));
}

#[test]
fn test_invalid_trigger_configuration() {
    assert!(matches!(
        IntervalTrigger::try_from((1, "minute")),
        Err(GradrunError::ConfigurationError(_))
    ));
    assert!(IntervalTrigger::try_from((0, "epoch")).is_err());
    assert!(ManualScheduleTrigger::try_from((vec![1], "step")).is_err());
}

#[test]
fn test_manual_schedule() {
    let trigger = ManualScheduleTrigger::try_from((vec![5, 2, 2], "iteration")).unwrap();
    assert_eq!(trigger.points(), &[2, 5]);
    let fired: Vec<usize> = (1..=6).filter(|&i| trigger.fires(&at_iteration(i))).collect();
    assert_eq!(fired, vec![2, 5]);

    let by_epoch = ManualScheduleTrigger::new(vec![1, 3], TriggerUnit::Epoch);
    assert!(by_epoch.fires(&epoch_end(10, 3)));
    assert!(!by_epoch.fires(&epoch_end(7, 2)));
}

#[test]
fn test_every_iteration() {
    let trigger = IntervalTrigger::every_iteration();
    assert!((1..5).all(|i| trigger.fires(&at_iteration(i))));
    assert_eq!(trigger, IntervalTrigger::new(1, TriggerUnit::Iteration).unwrap());
}
