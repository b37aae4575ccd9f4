// gradrun-train/src/updater.rs

use crate::optimizer::{Hyperparameters, Optimizer};
use crate::parameter::Parameter;
use crate::trigger::Progress;
use gradrun_core::{Graph, GradrunError, Tensor, VarId};
use gradrun_data::{DatasetIterator, IteratorState};
use log::debug;
use serde::{Deserialize, Serialize};

/// Persisted progress of an updater.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdaterState {
    pub iteration: usize,
    pub iterator: IteratorState,
}

/// Performs one training step per call and reports where training stands.
pub trait Updater {
    /// Runs one step and returns its loss.
    ///
    /// # Errors
    /// `DataExhausted` once the iterator has no batch left, or any error of
    /// the forward pass, the backward pass or the optimizer.
    fn update(&mut self) -> Result<f64, GradrunError>;

    fn progress(&self) -> Progress;

    /// The optimizer's hyperparameters, for schedule extensions.
    fn optimizer_mut(&mut self) -> &mut dyn Hyperparameters;

    /// Stops the iterator's background work, if any.
    fn finalize(&mut self);

    fn state(&self) -> UpdaterState;

    fn load_state(&mut self, state: UpdaterState) -> Result<(), GradrunError>;
}

/// Fetches a batch, records the loss on a fresh [`Graph`], backpropagates and
/// lets the optimizer update the parameters.
///
/// `loss_fn` receives the graph, the leaf ids of the parameters (in the
/// order they were given) and the batch. It returns the id of a scalar loss.
pub struct StandardUpdater<I, O, F>
where
    I: DatasetIterator,
{
    iterator: I,
    optimizer: O,
    params: Vec<Parameter>,
    loss_fn: F,
    iteration: usize,
}

impl<I, O, F> StandardUpdater<I, O, F>
where
    I: DatasetIterator,
    O: Optimizer,
    F: FnMut(&mut Graph, &[VarId], Vec<I::Item>) -> Result<VarId, GradrunError>,
{
    pub fn new(iterator: I, optimizer: O, params: Vec<Parameter>, loss_fn: F) -> Self {
        StandardUpdater {
            iterator,
            optimizer,
            params,
            loss_fn,
            iteration: 0,
        }
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn optimizer(&self) -> &O {
        &self.optimizer
    }

    pub fn iterator(&self) -> &I {
        &self.iterator
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }
}

impl<I, O, F> Updater for StandardUpdater<I, O, F>
where
    I: DatasetIterator,
    O: Optimizer,
    F: FnMut(&mut Graph, &[VarId], Vec<I::Item>) -> Result<VarId, GradrunError>,
{
    fn update(&mut self) -> Result<f64, GradrunError> {
        let batch = self.iterator.next_batch()?;

        let mut graph = Graph::new();
        let leaves: Vec<VarId> = self
            .params
            .iter()
            .map(|p| graph.named_variable(p.value().clone(), p.name()))
            .collect();
        let loss = (self.loss_fn)(&mut graph, &leaves, batch)?;
        let loss_value = graph.data(loss)?.item()?;
        graph.backward(loss)?;

        let grads = leaves
            .iter()
            .map(|&id| graph.grad(id).map(|g| g.cloned()))
            .collect::<Result<Vec<Option<Tensor>>, _>>()?;
        self.optimizer.update(&mut self.params, &grads)?;

        self.iteration += 1;
        debug!(
            "iteration {} (epoch {:.3}): loss = {}",
            self.iteration,
            self.iterator.epoch_detail(),
            loss_value
        );
        Ok(loss_value)
    }

    fn progress(&self) -> Progress {
        Progress {
            iteration: self.iteration,
            epoch: self.iterator.epoch(),
            epoch_detail: self.iterator.epoch_detail(),
            is_new_epoch: self.iterator.is_new_epoch(),
        }
    }

    fn optimizer_mut(&mut self) -> &mut dyn Hyperparameters {
        &mut self.optimizer
    }

    fn finalize(&mut self) {
        self.iterator.finalize();
    }

    fn state(&self) -> UpdaterState {
        UpdaterState {
            iteration: self.iteration,
            iterator: self.iterator.state(),
        }
    }

    fn load_state(&mut self, state: UpdaterState) -> Result<(), GradrunError> {
        self.iterator.load_state(state.iterator)?;
        self.iteration = state.iteration;
        Ok(())
    }
}

#[cfg(test)]
#[path = "updater_test.rs"]
mod tests;
