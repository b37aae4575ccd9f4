use super::*;
use crate::extensions::MultistepShift;
use crate::optimizer::Optimizer;
use crate::parameter::Parameter;
use crate::sgd::Sgd;
use crate::trigger::IntervalTrigger;
use crate::updater::StandardUpdater;
use gradrun_core::ops::arithmetic::{add_op, mul_constant_op, mul_op};
use gradrun_core::ops::reduction::sum_op;
use gradrun_core::{Graph, Tensor, VarId};
use gradrun_data::{RepeatMode, SerialIterator, SerialIteratorOptions, VecDataset};
use std::sync::{Arc, Mutex};

fn squared_error(graph: &mut Graph, params: &[VarId], batch: Vec<(f64, f64)>) -> Result<VarId, GradrunError> {
    let (x, y) = batch[0];
    let x = graph.constant(Tensor::from_vec(vec![x], vec![1])?);
    let y = graph.constant(Tensor::from_vec(vec![y], vec![1])?);
    let prediction = mul_op(graph, params[0], x)?;
    let negated = mul_constant_op(graph, y, -1.0)?;
    let diff = add_op(graph, prediction, negated)?;
    let squared = mul_op(graph, diff, diff)?;
    sum_op(graph, squared)
}

type LossFn = fn(&mut Graph, &[VarId], Vec<(f64, f64)>) -> Result<VarId, GradrunError>;

fn updater(repeat: RepeatMode) -> StandardUpdater<SerialIterator<VecDataset<(f64, f64)>>, Sgd, LossFn> {
    let dataset = VecDataset::new(vec![(1.0, 2.0), (2.0, 4.0), (3.0, 6.0)]);
    let options = SerialIteratorOptions {
        repeat,
        shuffle: false,
        seed: None,
    };
    let iterator = SerialIterator::new(dataset, 1, options).unwrap();
    let params = vec![Parameter::new("w", Tensor::from_vec(vec![0.0f64], vec![1]).unwrap())];
    StandardUpdater::new(iterator, Sgd::new(0.01).unwrap(), params, squared_error as LossFn)
}

/// Writes down every hook invocation as `(event, iteration, lr)`.
#[derive(Debug, Clone, Default)]
struct Recorder {
    log: Arc<Mutex<Vec<(&'static str, usize, f64)>>>,
}

impl Recorder {
    fn record(&self, event: &'static str, ctx: &ExtensionContext<'_>) {
        let lr = ctx.optimizer.hyperparam("lr").unwrap_or(f64::NAN);
        self.log.lock().unwrap().push((event, ctx.progress.iteration, lr));
    }

    fn events(&self) -> Vec<(&'static str, usize, f64)> {
        self.log.lock().unwrap().clone()
    }
}

impl Extension for Recorder {
    fn name(&self) -> &str {
        "Recorder"
    }

    fn initialize(&mut self, ctx: &mut ExtensionContext<'_>) -> Result<(), GradrunError> {
        self.record("initialize", ctx);
        Ok(())
    }

    fn call(&mut self, ctx: &mut ExtensionContext<'_>) -> Result<(), GradrunError> {
        assert!(ctx.loss.is_some());
        self.record("call", ctx);
        Ok(())
    }

    fn finalize(&mut self) {
        self.log.lock().unwrap().push(("finalize", 0, 0.0));
    }
}

fn every(period: usize) -> Option<Box<dyn Trigger>> {
    Some(Box::new(IntervalTrigger::try_from((period, "iteration")).unwrap()))
}

#[test]
fn test_stop_trigger_ends_the_loop() {
    let mut trainer = Trainer::new(updater(RepeatMode::Forever))
        .with_stop_trigger(IntervalTrigger::try_from((5, "iteration")).unwrap());
    let progress = trainer.run().unwrap();
    assert_eq!(progress.iteration, 5);
    assert_eq!(progress.epoch, 1);
    assert!(trainer.last_loss().is_some());
    assert_eq!(trainer.updater().optimizer().t(), 5);
}

#[test]
fn test_exhausted_iterator_ends_the_loop() {
    let mut trainer = Trainer::new(updater(RepeatMode::Epochs(2)));
    let progress = trainer.run().unwrap();
    assert_eq!(progress.iteration, 6);
    assert_eq!(progress.epoch, 2);

    let w = trainer.into_updater().params()[0].value().to_vec::<f64>().unwrap()[0];
    assert!(w > 0.0 && w < 2.0, "w moved towards 2: {w}");
}

#[test]
fn test_extensions_follow_their_triggers() {
    let recorder = Recorder::default();
    let mut trainer = Trainer::new(updater(RepeatMode::Forever))
        .with_stop_trigger(IntervalTrigger::try_from((6, "iteration")).unwrap());
    trainer.extend(recorder.clone(), every(2));
    trainer.run().unwrap();

    let events: Vec<(&str, usize)> = recorder.events().iter().map(|&(e, i, _)| (e, i)).collect();
    assert_eq!(
        events,
        vec![
            ("initialize", 0),
            ("call", 2),
            ("call", 4),
            ("call", 6),
            ("finalize", 0)
        ]
    );
}

#[test]
fn test_duplicate_names_get_suffixes() {
    let mut trainer = Trainer::new(updater(RepeatMode::Forever));
    assert_eq!(trainer.extend(Recorder::default(), None), "Recorder");
    assert_eq!(trainer.extend(Recorder::default(), None), "Recorder_1");
    assert_eq!(trainer.extension_names(), vec!["Recorder", "Recorder_1"]);
}

#[test]
fn test_multistep_shift_drives_the_learning_rate() {
    let recorder = Recorder::default();
    let mut trainer = Trainer::new(updater(RepeatMode::Forever))
        .with_stop_trigger(IntervalTrigger::try_from((4, "iteration")).unwrap());
    trainer.extend(MultistepShift::new("lr", 0.5, vec![2], Some(0.04)).unwrap(), None);
    trainer.extend(recorder.clone(), None);
    trainer.run().unwrap();

    let lrs: Vec<f64> = recorder
        .events()
        .iter()
        .filter(|(e, _, _)| *e == "call")
        .map(|&(_, _, lr)| lr)
        .collect();
    assert_eq!(lrs, vec![0.04, 0.02, 0.02, 0.02]);
    assert_eq!(trainer.updater().optimizer().lr(), 0.02);
}

#[test]
fn test_errors_still_finalize() {
    let recorder = Recorder::default();
    let dataset = VecDataset::new(vec![(1.0, 2.0)]);
    let iterator = SerialIterator::new(dataset, 1, SerialIteratorOptions::default()).unwrap();
    let params = vec![Parameter::new("w", Tensor::from_vec(vec![0.0f32], vec![1]).unwrap())];
    // An f32 parameter against f64 data violates the multiplication contract.
    let mut trainer = Trainer::new(StandardUpdater::new(iterator, Sgd::default(), params, squared_error));
    trainer.extend(recorder.clone(), None);

    assert!(matches!(
        trainer.run(),
        Err(GradrunError::TypeContractViolation { .. })
    ));
    let events = recorder.events();
    assert_eq!(events.last().map(|e| e.0), Some("finalize"));
}

#[test]
fn test_state_snapshot_restores_schedule_and_position() {
    let mut trainer = Trainer::new(updater(RepeatMode::Forever))
        .with_stop_trigger(IntervalTrigger::try_from((3, "iteration")).unwrap());
    trainer.extend(MultistepShift::new("lr", 0.1, vec![2], Some(0.01)).unwrap(), None);
    trainer.run().unwrap();

    let json = trainer.state().unwrap().to_json().unwrap();
    let state = TrainerState::from_json(&json).unwrap();
    assert_eq!(state.updater.iteration, 3);
    assert!(state.extensions.contains_key("MultistepShift"));

    let mut resumed = Trainer::new(updater(RepeatMode::Forever))
        .with_stop_trigger(IntervalTrigger::try_from((4, "iteration")).unwrap());
    resumed.extend(MultistepShift::new("lr", 0.1, vec![2], Some(0.01)).unwrap(), None);
    resumed.load_state(state).unwrap();
    let progress = resumed.run().unwrap();
    assert_eq!(progress.iteration, 4);
    approx::assert_relative_eq!(resumed.updater().optimizer().lr(), 0.001, max_relative = 1e-12);
}
